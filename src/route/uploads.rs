//! Serves uploaded images when blobs are not fronted by a CDN.

use std::sync::Arc;

use aide::axum::ApiRouter;
use axum::{
	extract::{Path, State},
	http::{header, StatusCode},
	response::IntoResponse,
	routing::get,
};

use crate::{blob, blob::BlobStore, error, AppState};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no blob under {0}")]
	NotFound(String),
	#[error("blob store error: {0}")]
	Blob(#[from] blob::Error),
}

pub type RouteError = error::RouteError<Error>;

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::NotFound(..) => StatusCode::NOT_FOUND,
			Self::Blob(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		match self {
			Self::NotFound(..) => error::Message::new("image_not_found")
				.content("이미지를 찾을 수 없습니다.")
				.into_vec(),
			Self::Blob(..) => error::internal(),
		}
	}
}

pub fn routes() -> ApiRouter<AppState> {
	ApiRouter::new().route("/uploads/*key", get(serve))
}

async fn serve(
	State(blobs): State<Arc<dyn BlobStore>>,
	Path(key): Path<String>,
) -> Result<impl IntoResponse, RouteError> {
	let bytes = blobs
		.fetch(&key)
		.await
		.map_err(Error::from)?
		.ok_or_else(|| Error::NotFound(key.clone()))?;

	Ok((
		[
			(header::CONTENT_TYPE, content_type(&key)),
			(header::CACHE_CONTROL, "public, max-age=31536000, immutable"),
			(header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
			(header::CONTENT_SECURITY_POLICY, "default-src 'none'; sandbox"),
		],
		bytes,
	))
}

fn content_type(key: &str) -> &'static str {
	let extension = key
		.rsplit_once('.')
		.map(|(_, extension)| extension.to_ascii_lowercase());

	match extension.as_deref() {
		Some("png") => "image/png",
		Some("jpg" | "jpeg") => "image/jpeg",
		Some("gif") => "image/gif",
		Some("webp") => "image/webp",
		Some("heic") => "image/heic",
		Some("heif") => "image/heif",
		_ => "application/octet-stream",
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::test;

	#[test]
	fn test_content_type() {
		assert_eq!(content_type("images/a.png"), "image/png");
		assert_eq!(content_type("images/a.JPG"), "image/jpeg");
		assert_eq!(content_type("images/a"), "application/octet-stream");
		assert_eq!(content_type("images/a.svg"), "application/octet-stream");
	}

	#[tokio::test]
	async fn test_serve_uploaded_image() {
		let ctx = test::context();
		let server = test::server(&ctx);
		let image = ctx.images.save_image(&test::png()).await.unwrap();
		let key = ctx.blobs.key_from_url(&image.image_url).unwrap();

		let response = server.get(&format!("/uploads/{key}")).await;

		response.assert_status_ok();
		assert_eq!(response.header(header::CONTENT_TYPE), "image/png");
		assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");
		assert!(response
			.header(header::CONTENT_SECURITY_POLICY)
			.to_str()
			.unwrap()
			.starts_with("default-src 'none'"));
		assert_eq!(response.as_bytes().as_ref(), b"\x89PNG\r\n\x1a\n");

		server
			.get("/uploads/images/missing.png")
			.expect_failure()
			.await
			.assert_status(StatusCode::NOT_FOUND);
	}
}
