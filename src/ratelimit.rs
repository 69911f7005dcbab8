use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{clock::QuantaInstant, middleware::RateLimitingMiddleware};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::error::AppError;

pub type Config = GovernorConfig<PeerIpKeyExtractor, governor::middleware::StateInformationMiddleware>;

/// The rate limits applied to the router.
#[derive(Clone)]
pub struct Limits {
	pub default: Arc<Config>,
	pub login: Arc<Config>,
}

impl Limits {
	pub fn new() -> Self {
		Self {
			default: default(),
			login: login(),
		}
	}

	pub fn spawn_cleanup(&self) {
		spawn_cleanup(&[&self.default, &self.login]);
	}
}

impl Default for Limits {
	fn default() -> Self {
		Self::new()
	}
}

/// Per-IP limit for ordinary endpoints.
pub fn default() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(10)
			.burst_size(50)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("burst size and period are non-zero"),
	)
}

/// Per-IP limit for credential checks.
pub fn login() -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_second(1)
			.burst_size(5)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("burst size and period are non-zero"),
	)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

/// Periodically drops rate limiting state of clients that went quiet.
pub fn spawn_cleanup<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();

	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(60));

		loop {
			interval.tick().await;

			for limiter in &limiters {
				tracing::debug!(size = limiter.len(), "rate limiting storage");
				limiter.retain_recent();
			}
		}
	});
}
