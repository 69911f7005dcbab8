//! Bearer-token authentication.

mod filter;
pub mod password;
mod token;

pub use filter::filter;
pub use password::Encryptor;
pub use token::TokenProvider;

use axum::http::StatusCode;

use crate::error;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid token")]
	InvalidToken,
	#[error("not logged in")]
	NotLoggedIn,
	#[error("token encoding error: {0}")]
	Jwt(#[source] jsonwebtoken::errors::Error),
	#[error("password hash error: {0}")]
	Hash(#[from] argon2::password_hash::Error),
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::InvalidToken | Self::NotLoggedIn => StatusCode::UNAUTHORIZED,
			Self::Jwt(..) | Self::Hash(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		let content = match self {
			Self::InvalidToken => "유효하지 않은 토큰입니다.",
			Self::NotLoggedIn => "로그인이 필요합니다.",
			Self::Jwt(..) | Self::Hash(..) => return error::internal(),
		};

		error::Message::new(self.to_string().replace(' ', "_"))
			.content(content)
			.into_vec()
	}
}
