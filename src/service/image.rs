use std::sync::Arc;

use axum::http::StatusCode;

use crate::{
	blob::{self, BlobStore, StoredBlob, Upload},
	error::{self, ErrorShape},
	store::{self, Image, Store, DEFAULT_PROFILE_IMAGE_ID},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("default profile image {DEFAULT_PROFILE_IMAGE_ID} is missing")]
	ImageNotFound,
	#[error("image upload failed: {0}")]
	FailedImageUpload(#[from] blob::Error),
	#[error("{0:?} is not an image")]
	FailedImageConvert(Option<String>),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		StatusCode::INTERNAL_SERVER_ERROR
	}

	fn into_errors(self) -> Vec<error::Message> {
		let (code, content) = match self {
			Self::ImageNotFound => ("image_not_found", "기본 프로필 이미지를 찾지 못했습니다."),
			Self::FailedImageUpload(..) => ("failed_image_upload", "이미지 업로드에 실패했습니다."),
			Self::FailedImageConvert(..) => ("failed_image_convert", "이미지 파일 변환에 실패했습니다."),
			Self::Store(..) => return error::internal(),
		};

		error::Message::new(code).content(content).into_vec()
	}
}

/// Keeps image rows and their blobs in step.
#[derive(Clone)]
pub struct ImageService {
	store: Arc<dyn Store>,
	blobs: Arc<dyn BlobStore>,
}

impl ImageService {
	pub fn new(store: Arc<dyn Store>, blobs: Arc<dyn BlobStore>) -> Self {
		Self { store, blobs }
	}

	/// The shared profile picture of users who never uploaded one.
	pub async fn default_image(&self) -> Result<Image, Error> {
		self.store
			.find_image(DEFAULT_PROFILE_IMAGE_ID)
			.await?
			.ok_or(Error::ImageNotFound)
	}

	/// Stores `file` as a profile picture, or hands out the default image when
	/// there is no file.
	pub async fn save_profile_image(&self, file: Option<&Upload>) -> Result<Image, Error> {
		match file.filter(|file| !file.is_empty()) {
			Some(file) => self.save_image(file).await,
			None => self.default_image().await,
		}
	}

	/// Uploads `file` and records it as a standalone image.
	pub async fn save_image(&self, file: &Upload) -> Result<Image, Error> {
		let blob = self.upload(file).await?;

		match self.store.insert_image(&blob).await {
			Ok(image) => Ok(image),
			Err(error) => {
				self.discard(std::slice::from_ref(&blob)).await;
				Err(error.into())
			}
		}
	}

	/// Uploads every file, or none of them: on failure the blobs uploaded so
	/// far are deleted again.
	pub async fn upload_all(&self, files: &[Upload]) -> Result<Vec<StoredBlob>, Error> {
		let mut uploaded = Vec::with_capacity(files.len());

		for file in files {
			match self.upload(file).await {
				Ok(blob) => uploaded.push(blob),
				Err(error) => {
					self.discard(&uploaded).await;
					return Err(error);
				}
			}
		}

		Ok(uploaded)
	}

	/// Best-effort removal of blobs that no row refers to.
	pub async fn discard(&self, blobs: &[StoredBlob]) {
		for blob in blobs {
			if let Err(error) = self.blobs.delete(&blob.key).await {
				tracing::error!(%error, key = blob.key, "failed to discard blob");
			}
		}
	}

	/// Deletes the image row and then its blob. The default image is kept.
	pub async fn delete_image(&self, image: &Image) -> Result<(), Error> {
		if image.is_default() {
			tracing::warn!("refusing to delete the default profile image");
			return Ok(());
		}

		self.store.delete_image(image.id).await?;
		self.delete_blob(image).await
	}

	/// Deletes the blob behind an image whose row is already gone.
	pub async fn delete_blob(&self, image: &Image) -> Result<(), Error> {
		if image.is_default() {
			return Ok(());
		}

		let key = image
			.blob_key
			.clone()
			.or_else(|| self.blobs.key_from_url(&image.image_url));

		match key {
			Some(key) => Ok(self.blobs.delete(&key).await?),
			None => {
				tracing::warn!(image_id = image.id, url = image.image_url, "image has no blob key");
				Ok(())
			}
		}
	}

	async fn upload(&self, file: &Upload) -> Result<StoredBlob, Error> {
		if !file.is_image() {
			return Err(Error::FailedImageConvert(file.content_type.clone()));
		}

		Ok(self.blobs.upload(file).await?)
	}
}
