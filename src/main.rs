#![warn(clippy::pedantic)]

mod auth;
mod blob;
mod config;
mod error;
mod extract;
mod mail;
mod model;
mod openapi;
mod ratelimit;
mod route;
mod service;
mod store;
mod telemetry;
#[cfg(test)]
mod test;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
	extract::{DefaultBodyLimit, FromRef},
	http::{header, Method},
};
use tower::ServiceBuilder;
use tower_http::{
	compression::CompressionLayer,
	cors::{AllowOrigin, CorsLayer},
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{
	auth::{Encryptor, TokenProvider},
	blob::{BlobStore, ObjectBlobStore},
	config::Config,
	mail::LogMailer,
	ratelimit::Limits,
	service::{ImageService, PostService, UserService},
	store::{MemoryStore, PgStore, Store},
};

/// The shared application state.
///
/// Handlers extract the part they need, e.g. `State(users): State<UserService>`.
#[derive(Clone, FromRef)]
pub struct AppState {
	pub users: UserService,
	pub posts: PostService,
	pub tokens: TokenProvider,
	pub blobs: Arc<dyn BlobStore>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
	#[error(transparent)]
	Config(#[from] config::ConfigError),
	#[error("telemetry error: {0}")]
	Telemetry(#[from] telemetry::Error),
	#[error(transparent)]
	Store(#[from] store::Error),
	#[error("blob store error: {0}")]
	Blob(#[from] blob::Error),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), Error> {
	dotenvy::dotenv().ok();

	let config = Config::from_env()?;
	let _otel = telemetry::init(&config)?;

	let store: Arc<dyn Store> = match &config.database_url {
		Some(url) => Arc::new(PgStore::connect(url).await?),
		None => {
			tracing::warn!("DATABASE_URL is not set, data is kept in memory and lost on exit");
			Arc::new(MemoryStore::new())
		}
	};

	let blobs: Arc<dyn BlobStore> = Arc::new(ObjectBlobStore::from_backend(
		&config.blob_backend,
		&config.blob_public_url,
	)?);

	let tokens = TokenProvider::new(
		&config.jwt_secret,
		config.jwt_issuer.clone(),
		chrono::Duration::hours(config.token_ttl_hours),
	);

	let images = ImageService::new(store.clone(), blobs.clone());
	let state = AppState {
		users: UserService::new(
			store.clone(),
			images.clone(),
			Encryptor::default(),
			tokens.clone(),
			Arc::new(LogMailer),
		),
		posts: PostService::new(store, images),
		tokens,
		blobs,
	};

	let router = if config.rate_limit {
		let limits = Limits::new();
		limits.spawn_cleanup();

		route::rate_limited(state, &limits)
	} else {
		route::router(state)
	};

	let cors = CorsLayer::new()
		.allow_origin(AllowOrigin::list(config.cors_origins.clone()))
		.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
		.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
		.max_age(Duration::from_secs(3600));

	let app = router.layer(
		ServiceBuilder::new()
			.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
			.layer(TraceLayer::new_for_http())
			.layer(PropagateRequestIdLayer::x_request_id())
			.layer(cors)
			.layer(CompressionLayer::new())
			.layer(DefaultBodyLimit::max(config.max_upload_bytes)),
	);

	let listener = tokio::net::TcpListener::bind((config.host.as_str(), config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		app.into_make_service_with_connect_info::<SocketAddr>(),
	)
	.with_graceful_shutdown(shutdown_signal())
	.await?;

	Ok(())
}

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}

	tracing::info!("shutting down");
}
