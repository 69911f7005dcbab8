//! Object storage for uploaded images.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use object_store::{
	aws::AmazonS3Builder, local::LocalFileSystem, memory::InMemory, path::Path, ObjectStore,
	PutPayload,
};
use uuid::Uuid;

use crate::config::BlobBackend;

const KEY_PREFIX: &str = "images";

/// Accepted image content types and the extension their blobs are stored with.
const IMAGE_TYPES: [(&str, &str); 6] = [
	("image/png", "png"),
	("image/jpeg", "jpg"),
	("image/gif", "gif"),
	("image/webp", "webp"),
	("image/heic", "heic"),
	("image/heif", "heif"),
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("object store error: {0}")]
	Store(#[from] object_store::Error),
	#[error("io error: {0}")]
	Io(#[from] std::io::Error),
}

/// A file received from a multipart request.
#[derive(Debug, Clone)]
pub struct Upload {
	pub file_name: Option<String>,
	pub content_type: Option<String>,
	pub bytes: Bytes,
}

impl Upload {
	pub fn is_empty(&self) -> bool {
		self.bytes.is_empty()
	}

	/// Whether the upload declares a raster image type. Markup based formats
	/// such as SVG are refused since they can carry scripts.
	pub fn is_image(&self) -> bool {
		self.image_extension().is_some()
	}

	fn image_extension(&self) -> Option<&'static str> {
		let content_type = self.content_type.as_deref()?;
		let essence = content_type
			.split(';')
			.next()
			.unwrap_or_default()
			.trim()
			.to_ascii_lowercase();

		IMAGE_TYPES
			.iter()
			.find(|(mime, _)| *mime == essence)
			.map(|(_, extension)| *extension)
	}

	/// File extension for the stored object, taken from the content type.
	fn extension(&self) -> &'static str {
		self.image_extension().unwrap_or("bin")
	}
}

/// Where an uploaded blob ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
	pub url: String,
	pub key: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
	async fn upload(&self, file: &Upload) -> Result<StoredBlob, Error>;
	/// Deletes the blob. Deleting a missing blob succeeds.
	async fn delete(&self, key: &str) -> Result<(), Error>;
	async fn fetch(&self, key: &str) -> Result<Option<Bytes>, Error>;
	/// Recovers the key of a blob from its public URL.
	fn key_from_url(&self, url: &str) -> Option<String>;
}

/// A [`BlobStore`] on top of any [`ObjectStore`] back-end.
pub struct ObjectBlobStore {
	store: Arc<dyn ObjectStore>,
	public_url: String,
}

impl ObjectBlobStore {
	pub fn new(store: Arc<dyn ObjectStore>, public_url: impl Into<String>) -> Self {
		Self {
			store,
			public_url: public_url.into().trim_end_matches('/').to_owned(),
		}
	}

	pub fn from_backend(backend: &BlobBackend, public_url: &str) -> Result<Self, Error> {
		let store: Arc<dyn ObjectStore> = match backend {
			BlobBackend::Memory => Arc::new(InMemory::new()),
			BlobBackend::Local { path } => {
				std::fs::create_dir_all(path)?;
				Arc::new(LocalFileSystem::new_with_prefix(path)?)
			}
			BlobBackend::S3 {
				bucket,
				region,
				endpoint,
			} => {
				let mut builder = AmazonS3Builder::from_env()
					.with_bucket_name(bucket)
					.with_region(region);

				if let Some(endpoint) = endpoint {
					builder = builder.with_endpoint(endpoint);
				}

				Arc::new(builder.build()?)
			}
		};

		Ok(Self::new(store, public_url))
	}

	fn url(&self, key: &str) -> String {
		format!("{}/{key}", self.public_url)
	}
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
	async fn upload(&self, file: &Upload) -> Result<StoredBlob, Error> {
		let key = format!("{KEY_PREFIX}/{}.{}", Uuid::new_v4(), file.extension());

		self.store
			.put(&Path::from(key.as_str()), PutPayload::from(file.bytes.clone()))
			.await?;

		tracing::debug!(key, file_name = ?file.file_name, size = file.bytes.len(), "uploaded blob");

		Ok(StoredBlob {
			url: self.url(&key),
			key,
		})
	}

	async fn delete(&self, key: &str) -> Result<(), Error> {
		match self.store.delete(&Path::from(key)).await {
			Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
			Err(error) => Err(error.into()),
		}
	}

	async fn fetch(&self, key: &str) -> Result<Option<Bytes>, Error> {
		match self.store.get(&Path::from(key)).await {
			Ok(result) => Ok(Some(result.bytes().await?)),
			Err(object_store::Error::NotFound { .. }) => Ok(None),
			Err(error) => Err(error.into()),
		}
	}

	fn key_from_url(&self, url: &str) -> Option<String> {
		url.strip_prefix(&self.public_url)?
			.strip_prefix('/')
			.filter(|key| !key.is_empty())
			.map(str::to_owned)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn store() -> ObjectBlobStore {
		ObjectBlobStore::new(Arc::new(InMemory::new()), "https://cdn.example.com/uploads/")
	}

	fn png(bytes: &'static [u8]) -> Upload {
		Upload {
			file_name: Some("cat.png".into()),
			content_type: Some("image/png".into()),
			bytes: Bytes::from_static(bytes),
		}
	}

	#[tokio::test]
	async fn test_upload_then_delete() {
		let store = store();
		let blob = store.upload(&png(b"meow")).await.unwrap();

		assert!(blob.key.starts_with("images/"));
		assert!(blob.key.ends_with(".png"));
		assert_eq!(blob.url, format!("https://cdn.example.com/uploads/{}", blob.key));
		assert_eq!(store.fetch(&blob.key).await.unwrap().unwrap(), "meow");

		store.delete(&blob.key).await.unwrap();

		assert!(store.fetch(&blob.key).await.unwrap().is_none());
		// deleting twice is fine
		store.delete(&blob.key).await.unwrap();
	}

	#[test]
	fn test_key_from_url() {
		let store = store();

		assert_eq!(
			store.key_from_url("https://cdn.example.com/uploads/images/a.png"),
			Some("images/a.png".into())
		);
		assert_eq!(store.key_from_url("https://elsewhere.com/uploads/images/a.png"), None);
		assert_eq!(store.key_from_url("https://cdn.example.com/uploads/"), None);
	}

	fn upload(content_type: Option<&str>, file_name: &str) -> Upload {
		Upload {
			file_name: Some(file_name.into()),
			content_type: content_type.map(Into::into),
			bytes: Bytes::new(),
		}
	}

	#[test]
	fn test_extension_comes_from_content_type() {
		assert_eq!(upload(Some("image/heic"), "photo.HEIC").extension(), "heic");
		assert_eq!(upload(Some("Image/JPEG; q=1"), "photo").extension(), "jpg");
		// the client's file name never picks the extension
		assert_eq!(upload(Some("image/png"), "page.html").extension(), "png");

		let unknown = upload(None, "photo.png");

		assert_eq!(unknown.extension(), "bin");
		assert!(!unknown.is_image());
	}

	#[test]
	fn test_markup_images_are_refused() {
		assert!(!upload(Some("image/svg+xml"), "cat.svg").is_image());
		assert!(!upload(Some("text/html"), "cat.png").is_image());
		assert!(upload(Some("image/webp"), "cat.webp").is_image());
	}
}
