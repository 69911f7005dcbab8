use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use axum::http::HeaderValue;
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("invalid value for {key}: {message}")]
	Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone)]
pub enum BlobBackend {
	Memory,
	Local {
		path: PathBuf,
	},
	S3 {
		bucket: String,
		region: String,
		endpoint: Option<String>,
	},
}

/// Process configuration, read once at startup from the environment.
#[derive(Debug, Clone)]
pub struct Config {
	pub host: String,
	pub port: u16,
	pub database_url: Option<String>,
	pub jwt_secret: String,
	pub jwt_issuer: String,
	pub token_ttl_hours: i64,
	pub cors_origins: Vec<HeaderValue>,
	pub blob_backend: BlobBackend,
	pub blob_public_url: String,
	pub max_upload_bytes: usize,
	pub rate_limit: bool,
	pub otlp_endpoint: Option<String>,
	pub log_level: Level,
}

impl Config {
	pub fn from_env() -> Result<Self, ConfigError> {
		let blob_backend = match var("BLOB_BACKEND").as_deref() {
			None | Some("memory") => BlobBackend::Memory,
			Some("local") => BlobBackend::Local {
				path: var("BLOB_LOCAL_PATH")
					.unwrap_or_else(|| "./uploads".into())
					.into(),
			},
			Some("s3") => BlobBackend::S3 {
				bucket: var("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
				region: var("S3_REGION").unwrap_or_else(|| "ap-northeast-2".into()),
				endpoint: var("S3_ENDPOINT"),
			},
			Some(other) => {
				return Err(ConfigError::Invalid {
					key: "BLOB_BACKEND",
					message: format!("unknown backend {other}, expected memory, local or s3"),
				})
			}
		};

		let cors_origins = var("CORS_ORIGINS")
			.unwrap_or_default()
			.split(',')
			.map(str::trim)
			.filter(|origin| !origin.is_empty())
			.map(|origin| {
				HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
					key: "CORS_ORIGINS",
					message: e.to_string(),
				})
			})
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self {
			host: var("HOST").unwrap_or_else(|| "127.0.0.1".into()),
			port: parse("PORT", 3000)?,
			database_url: var("DATABASE_URL"),
			jwt_secret: var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?,
			jwt_issuer: var("JWT_ISSUER").unwrap_or_else(|| "community-api".into()),
			token_ttl_hours: parse("TOKEN_TTL_HOURS", 24)?,
			cors_origins,
			blob_backend,
			blob_public_url: var("BLOB_PUBLIC_URL")
				.unwrap_or_else(|| "http://localhost:3000/uploads".into()),
			max_upload_bytes: parse("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
			rate_limit: parse("RATE_LIMIT", true)?,
			otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
			log_level: parse("LOG_LEVEL", Level::INFO)?,
		})
	}
}

/// Reads a variable, treating an empty value as unset.
fn var(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
	T: FromStr,
	T::Err: Display,
{
	match var(key) {
		Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
			key,
			message: e.to_string(),
		}),
		None => Ok(default),
	}
}
