use aide::OperationInput;
use axum::extract::{FromRequest, Multipart, Request};
use serde::de;

use crate::{blob::Upload, error::AppError};

/// The multipart part carrying the JSON request body.
pub const REQUEST_PART: &str = "requestDto";

/// Extractor for `multipart/form-data` requests made of one JSON part named
/// `requestDto` and any number of file parts.
///
/// The JSON part is validated like [`super::Json`]. File parts with no
/// content are dropped, so an empty file input counts as "no file".
pub struct Form<T> {
	pub input: T,
	pub files: Vec<(String, Upload)>,
}

impl<T> Form<T> {
	/// Removes and returns every file sent under `name`.
	pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
		let (taken, rest) = std::mem::take(&mut self.files)
			.into_iter()
			.partition::<Vec<_>, _>(|(field, _)| field == name);

		self.files = rest;
		taken.into_iter().map(|(_, upload)| upload).collect()
	}

	/// Removes and returns the first file sent under `name`.
	pub fn take_file(&mut self, name: &str) -> Option<Upload> {
		self.take_files(name).into_iter().next()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Form<T>
where
	T: de::DeserializeOwned + validator::Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let mut multipart = Multipart::from_request(req, state).await?;

		let mut input = None;
		let mut files = Vec::new();

		while let Some(field) = multipart.next_field().await? {
			let Some(name) = field.name().map(str::to_owned) else {
				continue;
			};

			if name == REQUEST_PART {
				input = Some(serde_json::from_slice::<T>(&field.bytes().await?)?);
				continue;
			}

			let file_name = field.file_name().map(str::to_owned);
			let content_type = field.content_type().map(str::to_owned);
			let bytes = field.bytes().await?;

			if !bytes.is_empty() {
				files.push((
					name,
					Upload {
						file_name,
						content_type,
						bytes,
					},
				));
			}
		}

		let input = input.ok_or(AppError::MissingPart(REQUEST_PART))?;
		input.validate()?;

		Ok(Self { input, files })
	}
}

impl<T> OperationInput for Form<T> {}
