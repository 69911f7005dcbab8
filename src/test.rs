//! Shared fixtures for service and HTTP tests.

use std::{collections::HashSet, sync::Arc};

use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use axum::{body::Bytes, http::HeaderValue};
use axum_test::{
	multipart::{MultipartForm, Part},
	TestServer,
};
use object_store::memory::InMemory;
use parking_lot::Mutex;

use crate::{
	auth::{Encryptor, TokenProvider},
	blob::{self, BlobStore, ObjectBlobStore, StoredBlob, Upload},
	extract::form::REQUEST_PART,
	mail::{self, Mailer},
	route,
	service::{
		user::model::{LoginInput, SignupInput},
		ImageService, PostService, UserService,
	},
	store::MemoryStore,
	AppState,
};

pub const PUBLIC_URL: &str = "http://localhost:3000/uploads";

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n";

/// An in-memory blob store that knows which blobs are alive.
pub struct TrackingBlobs {
	inner: ObjectBlobStore,
	live: Mutex<HashSet<String>>,
}

impl TrackingBlobs {
	fn new() -> Self {
		Self {
			inner: ObjectBlobStore::new(Arc::new(InMemory::new()), PUBLIC_URL),
			live: Mutex::default(),
		}
	}
}

#[async_trait]
impl BlobStore for TrackingBlobs {
	async fn upload(&self, file: &Upload) -> Result<StoredBlob, blob::Error> {
		let blob = self.inner.upload(file).await?;
		self.live.lock().insert(blob.key.clone());

		Ok(blob)
	}

	async fn delete(&self, key: &str) -> Result<(), blob::Error> {
		self.inner.delete(key).await?;
		self.live.lock().remove(key);

		Ok(())
	}

	async fn fetch(&self, key: &str) -> Result<Option<Bytes>, blob::Error> {
		self.inner.fetch(key).await
	}

	fn key_from_url(&self, url: &str) -> Option<String> {
		self.inner.key_from_url(url)
	}
}

#[derive(Default)]
pub struct RecordingMailer {
	sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
	/// The last `(email, password)` pair sent.
	pub fn last(&self) -> Option<(String, String)> {
		self.sent.lock().last().cloned()
	}
}

#[async_trait]
impl Mailer for RecordingMailer {
	async fn send_new_password(&self, email: &str, password: &str) -> Result<(), mail::Error> {
		self.sent.lock().push((email.into(), password.into()));

		Ok(())
	}
}

pub struct Context {
	pub store: Arc<MemoryStore>,
	pub blobs: Arc<TrackingBlobs>,
	pub mailer: Arc<RecordingMailer>,
	pub tokens: TokenProvider,
	pub images: ImageService,
	pub users: UserService,
	pub posts: PostService,
}

/// Argon2 with the cheapest parameters, so tests stay fast.
pub fn encryptor() -> Encryptor {
	Encryptor::new(Argon2::new(
		Algorithm::Argon2id,
		Version::V0x13,
		Params::new(Params::MIN_M_COST, 1, 1, None).unwrap(),
	))
}

pub fn context() -> Context {
	let store = Arc::new(MemoryStore::new());
	let blobs = Arc::new(TrackingBlobs::new());
	let mailer = Arc::new(RecordingMailer::default());
	let tokens = TokenProvider::new("test-secret", "community-api", chrono::Duration::hours(1));

	let images = ImageService::new(store.clone(), blobs.clone());
	let users = UserService::new(
		store.clone(),
		images.clone(),
		encryptor(),
		tokens.clone(),
		mailer.clone(),
	);
	let posts = PostService::new(store.clone(), images.clone());

	Context {
		store,
		blobs,
		mailer,
		tokens,
		images,
		users,
		posts,
	}
}

pub fn server(ctx: &Context) -> TestServer {
	let state = AppState {
		users: ctx.users.clone(),
		posts: ctx.posts.clone(),
		tokens: ctx.tokens.clone(),
		blobs: ctx.blobs.clone(),
	};

	TestServer::new(route::router(state)).unwrap()
}

pub async fn blob_count(ctx: &Context) -> usize {
	ctx.blobs.live.lock().len()
}

pub fn signup(email: &str, nickname: &str, phone: &str) -> SignupInput {
	SignupInput {
		email: email.into(),
		password: "Abcd1234".into(),
		name: "Kim".into(),
		nickname: nickname.into(),
		phone: phone.into(),
	}
}

pub fn login(email: &str, password: &str) -> LoginInput {
	LoginInput {
		email: email.into(),
		password: password.into(),
	}
}

pub fn upload(content_type: &str, bytes: &'static [u8]) -> Upload {
	Upload {
		file_name: Some("file".into()),
		content_type: Some(content_type.into()),
		bytes: Bytes::from_static(bytes),
	}
}

pub fn png() -> Upload {
	upload("image/png", PNG)
}

/// Registers a user and returns a bearer token for it.
pub async fn token(ctx: &Context, email: &str, nickname: &str, phone: &str) -> String {
	ctx.users
		.create(signup(email, nickname, phone), None)
		.await
		.unwrap();

	ctx.users
		.login(login(email, "Abcd1234"))
		.await
		.unwrap()
		.token
}

pub fn bearer(token: &str) -> HeaderValue {
	HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

/// A multipart form with `request` as its JSON part.
pub fn form(request: serde_json::Value) -> MultipartForm {
	MultipartForm::new().add_text(REQUEST_PART, request.to_string())
}

pub fn image_part() -> Part {
	Part::bytes(PNG.to_vec())
		.file_name("cat.png")
		.mime_type("image/png")
}
