use axum::{
	extract::{Request, State},
	http::{header, HeaderMap},
	middleware::Next,
	response::Response,
};

use crate::extract::Principal;

use super::TokenProvider;

pub const BEARER_PREFIX: &str = "Bearer ";

/// Binds a [`Principal`] to the request when it carries a valid bearer token.
///
/// Invalid tokens are logged and the request continues unauthenticated;
/// handlers that need a user reject it through the [`Principal`] extractor.
pub async fn filter(State(tokens): State<TokenProvider>, mut request: Request, next: Next) -> Response {
	if let Some(token) = bearer_token(request.headers()) {
		let user_id = tokens.validate(token).and_then(|sub| {
			sub.parse::<i64>()
				.map_err(|_| super::Error::InvalidToken)
		});

		match user_id {
			Ok(user_id) => {
				tracing::debug!(user_id, "authenticated request");
				request.extensions_mut().insert(Principal { user_id });
			}
			Err(error) => tracing::warn!(%error, "could not authenticate request"),
		}
	}

	next.run(request).await
}

/// The token of an `Authorization: Bearer <token>` header, unless it is empty
/// or the literal `null` some clients send when logged out.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
	let token = headers
		.get(header::AUTHORIZATION)?
		.to_str()
		.ok()?
		.strip_prefix(BEARER_PREFIX)?
		.trim();

	(!token.is_empty() && !token.eq_ignore_ascii_case("null")).then_some(token)
}

#[cfg(test)]
mod test {
	use axum::http::HeaderValue;

	use super::*;

	fn headers(value: &'static str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
		headers
	}

	#[test]
	fn test_bearer_token() {
		assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
		assert_eq!(bearer_token(&headers("Bearer ")), None);
		assert_eq!(bearer_token(&headers("Bearer null")), None);
		assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
		assert_eq!(bearer_token(&HeaderMap::new()), None);
	}
}
