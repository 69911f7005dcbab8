use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::store::User;

use super::Error;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
	/// The user id.
	sub: String,
	iss: String,
	iat: i64,
	exp: i64,
}

/// Issues and validates HS256-signed bearer tokens carrying a user id.
#[derive(Clone)]
pub struct TokenProvider {
	encoding: EncodingKey,
	decoding: DecodingKey,
	issuer: String,
	ttl: Duration,
}

impl TokenProvider {
	pub fn new(secret: &str, issuer: impl Into<String>, ttl: Duration) -> Self {
		Self {
			encoding: EncodingKey::from_secret(secret.as_bytes()),
			decoding: DecodingKey::from_secret(secret.as_bytes()),
			issuer: issuer.into(),
			ttl,
		}
	}

	pub fn create(&self, user: &User) -> Result<String, Error> {
		let now = Utc::now();
		let claims = Claims {
			sub: user.id.to_string(),
			iss: self.issuer.clone(),
			iat: now.timestamp(),
			exp: (now + self.ttl).timestamp(),
		};

		encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(Error::Jwt)
	}

	/// Returns the user id carried by `token`.
	///
	/// Fails with [`Error::InvalidToken`] if the token is malformed, expired,
	/// issued by someone else or signed with another secret.
	pub fn validate(&self, token: &str) -> Result<String, Error> {
		let mut validation = Validation::new(Algorithm::HS256);
		validation.set_issuer(&[&self.issuer]);
		validation.leeway = 0;

		decode::<Claims>(token, &self.decoding, &validation)
			.map(|data| data.claims.sub)
			.map_err(|error| {
				tracing::debug!(%error, "rejected token");
				Error::InvalidToken
			})
	}
}
