use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::store::{Image, LikeStatus, PostRow};

/// The file part name carrying post images.
pub const FILES_PART: &str = "multipartFiles";

/// How a post listing is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
	/// Newest first.
	Default,
	/// Most liked first, newest first among equals.
	Likes,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
	pub category_id: i64,
	#[validate(length(min = 1, max = 50))]
	pub title: String,
	#[validate(length(min = 1))]
	pub content: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
	#[validate(length(min = 1, max = 50))]
	pub title: String,
	#[validate(length(min = 1))]
	pub content: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReplyInput {
	#[validate(length(min = 1, max = 1000))]
	pub content: String,
}

/// A post together with its author and images.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
	pub id: i64,
	pub user_id: i64,
	pub nickname: String,
	pub category_id: i64,
	pub title: String,
	/// The content of the post.
	pub content: String,
	pub view: i32,
	pub like_count: i64,
	/// Public URLs of the attached images, in upload order.
	pub images: Vec<String>,
	pub created_at: DateTime<Utc>,
}

impl PostResponse {
	pub fn new(row: PostRow, images: Vec<Image>) -> Self {
		Self {
			id: row.id,
			user_id: row.user_id,
			nickname: row.nickname,
			category_id: row.category_id,
			title: row.title,
			content: row.content,
			view: row.view,
			like_count: row.like_count,
			images: images.into_iter().map(|image| image.image_url).collect(),
			created_at: row.created_at,
		}
	}
}

#[derive(Debug, Serialize, JsonSchema)]
pub struct LikeOutput {
	pub status: LikeStatus,
	/// The like count after the toggle.
	pub count: i64,
}
