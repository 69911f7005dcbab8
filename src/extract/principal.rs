use aide::OperationInput;
use axum::{extract::FromRequestParts, http::request};

use crate::{auth, error::RouteError, openapi::SECURITY_SCHEME_BEARER};

/// The authenticated user of a request, bound by [`auth::filter`].
///
/// Extracting it from an unauthenticated request fails with
/// [`auth::Error::NotLoggedIn`].
///
/// ```rust
/// async fn route(principal: Principal) {
///   println!("{}", principal.user_id);
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
	pub user_id: i64,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Principal
where
	S: Send + Sync,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(parts: &mut request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
		parts
			.extensions
			.get::<Principal>()
			.copied()
			.ok_or_else(|| auth::Error::NotLoggedIn.into())
	}
}

/// The authenticated user of a request, if there is one.
#[derive(Debug, Clone, Copy)]
pub struct MaybePrincipal(pub Option<Principal>);

impl MaybePrincipal {
	pub fn user_id(&self) -> Option<i64> {
		self.0.map(|principal| principal.user_id)
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybePrincipal
where
	S: Send + Sync,
{
	type Rejection = std::convert::Infallible;

	async fn from_request_parts(parts: &mut request::Parts, _state: &S) -> Result<Self, Self::Rejection> {
		Ok(Self(parts.extensions.get::<Principal>().copied()))
	}
}

fn require_bearer(operation: &mut aide::openapi::Operation) {
	operation.security.push(
		[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
			.into_iter()
			.collect(),
	);
}

impl OperationInput for Principal {
	/// Adds a bearer token requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		require_bearer(operation);
	}
}

impl OperationInput for MaybePrincipal {
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		require_bearer(operation);
		// anonymous access is allowed too
		operation.security.push(Default::default());
	}
}
