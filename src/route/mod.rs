use std::sync::Arc;

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{middleware, Extension, Router};
use tower_governor::GovernorLayer;

use crate::{auth, openapi, ratelimit::Limits, AppState};

pub mod docs;
pub mod post;
pub mod uploads;
pub mod user;

/// Builds the application router without rate limiting.
pub fn router(state: AppState) -> Router {
	build(state, None)
}

/// Builds the application router, limiting requests per peer address.
///
/// The limiter keys on the peer IP, so the router must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn rate_limited(state: AppState, limits: &Limits) -> Router {
	build(state, Some(limits))
}

fn build(state: AppState, limits: Option<&Limits>) -> Router {
	let mut api = OpenApi::default();

	let router = ApiRouter::new()
		.nest("/user", user::routes(limits))
		.nest("/posts", post::routes())
		.nest("/docs", docs::routes())
		.merge(uploads::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(middleware::from_fn_with_state(state.tokens.clone(), auth::filter));

	let router = match limits {
		Some(limits) => router.layer(GovernorLayer {
			config: limits.default.clone(),
		}),
		None => router,
	};

	router.with_state(state)
}
