//! Persistence contracts.
//!
//! Every method that touches more than one row is a single unit of work: the
//! Postgres implementation runs it inside one transaction, the memory
//! implementation under one lock.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use schemars::JsonSchema;

use crate::blob::StoredBlob;

/// The seeded image used as a profile picture when a user uploads none.
/// It is shared by many users and is never deleted.
pub const DEFAULT_PROFILE_IMAGE_ID: i64 = 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	/// A unique index rejected the write. Carries the index name.
	#[error("unique constraint {0} violated")]
	Conflict(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
	pub id: i64,
	pub email: String,
	/// PHC-formatted argon2 hash.
	pub password: String,
	pub name: String,
	pub nickname: String,
	pub phone: String,
	pub image_id: i64,
	pub is_deleted: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Image {
	pub id: i64,
	pub image_url: String,
	/// Object key inside the blob store. `None` for seeded images that were
	/// never uploaded through this service.
	pub blob_key: Option<String>,
}

impl Image {
	pub fn is_default(&self) -> bool {
		self.id == DEFAULT_PROFILE_IMAGE_ID
	}
}

#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
pub struct Category {
	pub id: i64,
	pub category_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Skill {
	pub id: i64,
	pub skill_name: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
	pub id: i64,
	pub user_id: i64,
	pub category_id: i64,
	pub title: String,
	pub content: String,
	pub view: i32,
	pub is_deleted: bool,
	pub created_at: DateTime<Utc>,
}

/// A visible post joined with its author and like count.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
	pub id: i64,
	pub user_id: i64,
	pub nickname: String,
	pub category_id: i64,
	pub title: String,
	pub content: String,
	pub view: i32,
	pub like_count: i64,
	pub created_at: DateTime<Utc>,
}

/// A post as seen from one user's my-page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MyPagePostRow {
	pub id: i64,
	pub category_id: i64,
	pub title: String,
	pub view: i32,
	pub like_count: i64,
	pub reply_count: i64,
	pub liked: bool,
	pub replied: bool,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
	Email,
	Nickname,
	Phone,
}

#[derive(Debug, Clone)]
pub struct NewUser {
	pub email: String,
	pub password: String,
	pub name: String,
	pub nickname: String,
	pub phone: String,
	pub image_id: i64,
}

#[derive(Debug, Clone)]
pub struct ProfileChanges {
	pub name: String,
	pub nickname: String,
	pub phone: String,
	/// The complete skill set after the update.
	pub skill_ids: Vec<i64>,
	/// Replaces the profile picture when set.
	pub image_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
	pub user_id: i64,
	pub category_id: i64,
	pub title: String,
	pub content: String,
}

#[derive(Debug, Clone)]
pub struct PostChanges {
	pub title: String,
	pub content: String,
	/// `Some` replaces every attachment of the post with these blobs.
	pub images: Option<Vec<StoredBlob>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrder {
	/// Newest first.
	Newest,
	/// Most liked first, newest first among equals.
	Likes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LikeStatus {
	Liked,
	Unliked,
}

/// A window into an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub offset: i64,
	pub limit: i64,
}

/// One window of rows plus the size of the whole result set.
#[derive(Debug, Clone)]
pub struct Slice<T> {
	pub items: Vec<T>,
	pub total: i64,
}

#[async_trait]
pub trait UserStore: Send + Sync {
	/// Whether a non-deleted user already holds `value` in `field`.
	async fn user_exists(&self, field: UniqueField, value: &str) -> Result<bool>;
	async fn insert_user(&self, user: NewUser) -> Result<i64>;
	async fn find_user(&self, id: i64) -> Result<Option<User>>;
	async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
	async fn find_user_by_email_and_name(&self, email: &str, name: &str) -> Result<Option<User>>;
	/// Applies profile fields and replaces the skill set in one unit of work.
	///
	/// Returns the profile image id that `changes.image_id` replaced, read in
	/// the same unit of work, so concurrent updates each get their own.
	async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<i64>>;
	async fn update_password(&self, id: i64, password: &str) -> Result<()>;
	async fn soft_delete_user(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait SkillStore: Send + Sync {
	async fn find_skills_by_name(&self, names: &[String]) -> Result<Vec<Skill>>;
	async fn user_skills(&self, user_id: i64) -> Result<Vec<Skill>>;
}

#[async_trait]
pub trait ImageStore: Send + Sync {
	async fn find_image(&self, id: i64) -> Result<Option<Image>>;
	async fn insert_image(&self, blob: &StoredBlob) -> Result<Image>;
	/// Removes the image row. The default image is never removed.
	async fn delete_image(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
	async fn find_category(&self, id: i64) -> Result<Option<Category>>;
	async fn categories(&self) -> Result<Vec<Category>>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
	/// Inserts the post, one image row per blob and the attachments linking them.
	async fn insert_post(&self, post: NewPost, images: &[StoredBlob]) -> Result<i64>;
	/// Returns the post unless it is missing or soft-deleted.
	async fn find_post(&self, id: i64) -> Result<Option<PostRow>>;
	async fn list_posts(&self, category_id: i64, order: PostOrder, window: Window) -> Result<Slice<PostRow>>;
	/// Attached images of every given post, in attachment order.
	async fn post_images(&self, post_ids: &[i64]) -> Result<Vec<(i64, Image)>>;
	/// Adds one view, returning the new count, or `None` if the post is not visible.
	async fn increment_view(&self, id: i64) -> Result<Option<i32>>;
	/// Updates a visible post owned by `author_id`. Returns `None` when no such
	/// post exists, otherwise the images that were detached from it. Detached
	/// image rows are removed in the same unit of work; their blobs are not.
	async fn update_post(&self, id: i64, author_id: i64, changes: PostChanges) -> Result<Option<Vec<Image>>>;
	/// Soft-deletes a visible post owned by `author_id`, reporting whether it did.
	async fn soft_delete_post(&self, id: i64, author_id: i64) -> Result<bool>;
	/// Visible posts written by `user_id` in `category_id`, newest first.
	async fn authored_posts(&self, user_id: i64, category_id: i64, window: Window) -> Result<Slice<MyPagePostRow>>;
}

#[async_trait]
pub trait LikeStore: Send + Sync {
	/// Flips the like of `user_id` on a visible post and returns the new state
	/// with the post's like count. `None` when the post is not visible.
	async fn toggle_like(&self, user_id: i64, post_id: i64) -> Result<Option<(LikeStatus, i64)>>;
	/// Visible posts liked by `user_id`, most recently liked first.
	async fn liked_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>>;
}

#[async_trait]
pub trait ReplyStore: Send + Sync {
	/// Adds a reply to a visible post. `None` when the post is not visible.
	async fn insert_reply(&self, post_id: i64, user_id: i64, content: &str) -> Result<Option<i64>>;
	/// Visible posts `user_id` replied to, most recent reply first.
	async fn replied_posts(&self, user_id: i64, window: Window) -> Result<Slice<MyPagePostRow>>;
}

pub trait Store:
	UserStore + SkillStore + ImageStore + CategoryStore + PostStore + LikeStore + ReplyStore
{
}

impl<T> Store for T where
	T: UserStore + SkillStore + ImageStore + CategoryStore + PostStore + LikeStore + ReplyStore
{
}
