//! Posts, their images, likes and replies.

pub mod model;

use std::{collections::HashMap, sync::Arc};

use axum::http::StatusCode;

use crate::{
	blob::{StoredBlob, Upload},
	error::{self, ErrorShape},
	model::{Page, Paginate},
	store::{self, Category, Image, NewPost, PostChanges, PostOrder, PostRow, Store},
};

use super::image::{self, ImageService};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("post {0} not found")]
	PostNotFound(i64),
	#[error("user {0} not found")]
	UserNotFound(i64),
	#[error("category {0} not found")]
	CategoryNotFound(i64),
	#[error(transparent)]
	Image(#[from] image::Error),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::PostNotFound(..) | Self::UserNotFound(..) | Self::CategoryNotFound(..) => StatusCode::NOT_FOUND,
			Self::Image(error) => error.status(),
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		match self {
			Self::PostNotFound(id) => error::Message::new("post_not_found")
				.content("존재하지 않는 게시글입니다.")
				.detail("post", id)
				.into_vec(),
			Self::UserNotFound(..) => error::Message::new("user_not_found")
				.content("존재하지 않는 회원입니다.")
				.into_vec(),
			Self::CategoryNotFound(id) => error::Message::new("category_not_found")
				.content("존재하지 않는 카테고리입니다.")
				.detail("category", id)
				.into_vec(),
			Self::Image(error) => error.into_errors(),
			Self::Store(..) => error::internal(),
		}
	}
}

#[derive(Clone)]
pub struct PostService {
	store: Arc<dyn Store>,
	images: ImageService,
}

impl PostService {
	pub fn new(store: Arc<dyn Store>, images: ImageService) -> Self {
		Self { store, images }
	}

	pub async fn categories(&self) -> Result<Vec<Category>, Error> {
		Ok(self.store.categories().await?)
	}

	/// One page of the visible posts of a category.
	pub async fn get_post_list(
		&self,
		category_id: i64,
		paginate: Paginate,
		sort: model::SortMode,
	) -> Result<Page<model::PostResponse>, Error> {
		let order = match sort {
			model::SortMode::Default => PostOrder::Newest,
			model::SortMode::Likes => PostOrder::Likes,
		};

		let slice = self
			.store
			.list_posts(category_id, order, paginate.window())
			.await?;

		let ids = slice.items.iter().map(|post| post.id).collect::<Vec<_>>();
		let mut images = HashMap::<i64, Vec<Image>>::new();

		for (post_id, image) in self.store.post_images(&ids).await? {
			images.entry(post_id).or_default().push(image);
		}

		Ok(Page::from_slice(slice, paginate, |post| {
			let images = images.remove(&post.id).unwrap_or_default();
			model::PostResponse::new(post, images)
		}))
	}

	/// Returns a visible post. Viewing someone else's post counts as a view.
	#[tracing::instrument(skip(self))]
	pub async fn get_post_details(&self, post_id: i64, viewer_id: Option<i64>) -> Result<model::PostResponse, Error> {
		let mut post = self.visible_post(post_id).await?;

		if viewer_id.is_some_and(|viewer| viewer != post.user_id) {
			// a concurrent delete makes the increment miss
			post.view = self
				.store
				.increment_view(post_id)
				.await?
				.ok_or(Error::PostNotFound(post_id))?;
		}

		let images = self
			.store
			.post_images(&[post_id])
			.await?
			.into_iter()
			.map(|(_, image)| image)
			.collect();

		Ok(model::PostResponse::new(post, images))
	}

	/// Stores a post with its images, returning the new id.
	///
	/// Blobs are uploaded first, then the post, image rows and attachments are
	/// written in one unit of work. If that fails, the blobs are deleted again.
	#[tracing::instrument(skip(self, input, files), fields(files = files.len()))]
	pub async fn save_post(&self, input: model::CreatePostInput, files: Vec<Upload>, author_id: i64) -> Result<i64, Error> {
		self.ensure_active_user(author_id).await?;

		self.store
			.find_category(input.category_id)
			.await?
			.ok_or(Error::CategoryNotFound(input.category_id))?;

		let blobs = self.images.upload_all(&files).await?;

		let result = self
			.store
			.insert_post(
				NewPost {
					user_id: author_id,
					category_id: input.category_id,
					title: input.title,
					content: input.content,
				},
				&blobs,
			)
			.await;

		match result {
			Ok(id) => {
				tracing::info!(post_id = id, "post created");
				Ok(id)
			}
			Err(error) => {
				self.images.discard(&blobs).await;
				Err(error.into())
			}
		}
	}

	/// Replaces title and content. Non-empty `files` replace every image of
	/// the post, empty `files` keep the current ones.
	#[tracing::instrument(skip(self, input, files), fields(files = files.len()))]
	pub async fn update_post(
		&self,
		post_id: i64,
		input: model::UpdatePostInput,
		files: Vec<Upload>,
		editor_id: i64,
	) -> Result<i64, Error> {
		let post = self.visible_post(post_id).await?;

		if post.user_id != editor_id {
			return Err(Error::PostNotFound(post_id));
		}

		let blobs = if files.is_empty() {
			None
		} else {
			Some(self.images.upload_all(&files).await?)
		};

		let result = self
			.store
			.update_post(
				post_id,
				editor_id,
				PostChanges {
					title: input.title,
					content: input.content,
					images: blobs.clone(),
				},
			)
			.await;

		let detached = match result {
			Ok(Some(detached)) => detached,
			Ok(None) => {
				self.discard(blobs.as_deref()).await;
				return Err(Error::PostNotFound(post_id));
			}
			Err(error) => {
				self.discard(blobs.as_deref()).await;
				return Err(error.into());
			}
		};

		for image in &detached {
			if let Err(error) = self.images.delete_blob(image).await {
				tracing::error!(%error, image_id = image.id, "failed to delete detached image");
			}
		}

		Ok(post_id)
	}

	/// Soft-deletes a post. Its attachments stay in place.
	pub async fn delete_post(&self, post_id: i64, editor_id: i64) -> Result<(), Error> {
		if !self.store.soft_delete_post(post_id, editor_id).await? {
			return Err(Error::PostNotFound(post_id));
		}

		tracing::info!(post_id, "post deleted");

		Ok(())
	}

	/// Likes the post, or takes the like back if there already is one.
	pub async fn like_process(&self, post_id: i64, user_id: i64) -> Result<model::LikeOutput, Error> {
		self.ensure_active_user(user_id).await?;

		let (status, count) = self
			.store
			.toggle_like(user_id, post_id)
			.await?
			.ok_or(Error::PostNotFound(post_id))?;

		Ok(model::LikeOutput { status, count })
	}

	pub async fn add_reply(&self, post_id: i64, user_id: i64, input: model::ReplyInput) -> Result<i64, Error> {
		self.ensure_active_user(user_id).await?;

		self.store
			.insert_reply(post_id, user_id, &input.content)
			.await?
			.ok_or(Error::PostNotFound(post_id))
	}

	async fn visible_post(&self, post_id: i64) -> Result<PostRow, Error> {
		self.store
			.find_post(post_id)
			.await?
			.ok_or(Error::PostNotFound(post_id))
	}

	async fn ensure_active_user(&self, user_id: i64) -> Result<(), Error> {
		match self.store.find_user(user_id).await? {
			Some(user) if !user.is_deleted => Ok(()),
			_ => Err(Error::UserNotFound(user_id)),
		}
	}

	async fn discard(&self, blobs: Option<&[StoredBlob]>) {
		if let Some(blobs) = blobs {
			self.images.discard(blobs).await;
		}
	}
}

#[cfg(test)]
mod test {
	use super::{model::*, *};
	use crate::{blob::BlobStore, store::LikeStatus, test};

	const TEAM: i64 = 1;

	async fn setup() -> (test::Context, i64, i64) {
		let ctx = test::context();
		let author = ctx
			.users
			.create(test::signup("a@x.com", "author", "01012345678"), None)
			.await
			.unwrap();
		let reader = ctx
			.users
			.create(test::signup("b@x.com", "reader", "01087654321"), None)
			.await
			.unwrap();

		(ctx, author, reader)
	}

	fn input(title: &str) -> CreatePostInput {
		CreatePostInput {
			category_id: TEAM,
			title: title.into(),
			content: "content".into(),
		}
	}

	fn edit() -> UpdatePostInput {
		UpdatePostInput {
			title: "edited".into(),
			content: "edited content".into(),
		}
	}

	#[tokio::test]
	async fn test_save_and_list_with_images() {
		let (ctx, author, _) = setup().await;

		let id = ctx
			.posts
			.save_post(input("hello"), vec![test::png(), test::png()], author)
			.await
			.unwrap();

		let page = ctx
			.posts
			.get_post_list(TEAM, Paginate::default(), SortMode::Default)
			.await
			.unwrap();

		assert_eq!(page.total_elements, 1);
		assert_eq!(page.content[0].id, id);
		assert_eq!(page.content[0].nickname, "author");
		assert_eq!(page.content[0].images.len(), 2);
		assert_eq!(test::blob_count(&ctx).await, 2);
	}

	#[tokio::test]
	async fn test_save_requires_user_and_category() {
		let (ctx, author, _) = setup().await;

		let error = ctx.posts.save_post(input("hello"), Vec::new(), 12345).await.unwrap_err();
		assert!(matches!(error, Error::UserNotFound(12345)));

		let mut missing = input("hello");
		missing.category_id = 999;

		let error = ctx.posts.save_post(missing, vec![test::png()], author).await.unwrap_err();
		assert!(matches!(error, Error::CategoryNotFound(999)));
		assert_eq!(test::blob_count(&ctx).await, 0);
	}

	#[tokio::test]
	async fn test_failed_upload_leaves_nothing_behind() {
		let (ctx, author, _) = setup().await;
		let files = vec![test::png(), test::upload("application/pdf", b"%PDF")];

		let error = ctx.posts.save_post(input("hello"), files, author).await.unwrap_err();

		assert!(matches!(error, Error::Image(image::Error::FailedImageConvert(..))));
		assert_eq!(test::blob_count(&ctx).await, 0);

		let page = ctx
			.posts
			.get_post_list(TEAM, Paginate::default(), SortMode::Default)
			.await
			.unwrap();

		assert_eq!(page.total_elements, 0);
	}

	#[tokio::test]
	async fn test_views_count_other_users_only() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), Vec::new(), author).await.unwrap();

		assert_eq!(ctx.posts.get_post_details(id, Some(author)).await.unwrap().view, 0);
		assert_eq!(ctx.posts.get_post_details(id, None).await.unwrap().view, 0);
		assert_eq!(ctx.posts.get_post_details(id, Some(reader)).await.unwrap().view, 1);
		assert_eq!(ctx.posts.get_post_details(id, Some(reader)).await.unwrap().view, 2);
		assert_eq!(ctx.posts.get_post_details(id, Some(author)).await.unwrap().view, 2);
	}

	#[tokio::test]
	async fn test_like_toggle_parity() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), Vec::new(), author).await.unwrap();

		let like = ctx.posts.like_process(id, reader).await.unwrap();
		assert_eq!(like.status, LikeStatus::Liked);
		assert_eq!(like.count, 1);

		let like = ctx.posts.like_process(id, reader).await.unwrap();
		assert_eq!(like.status, LikeStatus::Unliked);
		assert_eq!(like.count, 0);

		for _ in 0..3 {
			ctx.posts.like_process(id, author).await.unwrap();
		}

		let post = ctx.posts.get_post_details(id, None).await.unwrap();
		assert_eq!(post.like_count, 1);
	}

	#[tokio::test]
	async fn test_concurrent_likes_follow_parity() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), Vec::new(), author).await.unwrap();

		let tasks = (0..7)
			.map(|_| {
				let posts = ctx.posts.clone();
				tokio::spawn(async move { posts.like_process(id, reader).await })
			})
			.collect::<Vec<_>>();

		for task in tasks {
			task.await.unwrap().unwrap();
		}

		let post = ctx.posts.get_post_details(id, None).await.unwrap();
		assert_eq!(post.like_count, 1);
	}

	#[tokio::test]
	async fn test_likes_sort_order() {
		let (ctx, author, reader) = setup().await;
		let older = ctx.posts.save_post(input("older"), Vec::new(), author).await.unwrap();
		let newer = ctx.posts.save_post(input("newer"), Vec::new(), author).await.unwrap();

		ctx.posts.like_process(older, reader).await.unwrap();

		let by_date = ctx
			.posts
			.get_post_list(TEAM, Paginate::default(), SortMode::Default)
			.await
			.unwrap();
		let by_likes = ctx
			.posts
			.get_post_list(TEAM, Paginate::default(), SortMode::Likes)
			.await
			.unwrap();

		let ids = |page: &Page<PostResponse>| page.content.iter().map(|post| post.id).collect::<Vec<_>>();

		assert_eq!(ids(&by_date), [newer, older]);
		assert_eq!(ids(&by_likes), [older, newer]);
	}

	#[tokio::test]
	async fn test_update_replaces_images() {
		let (ctx, author, _) = setup().await;
		let id = ctx
			.posts
			.save_post(input("hello"), vec![test::png(), test::png()], author)
			.await
			.unwrap();

		let before = ctx.posts.get_post_details(id, None).await.unwrap().images;

		ctx.posts.update_post(id, edit(), vec![test::png()], author).await.unwrap();

		let post = ctx.posts.get_post_details(id, None).await.unwrap();

		assert_eq!(post.title, "edited");
		assert_eq!(post.images.len(), 1);
		assert!(!before.contains(&post.images[0]));
		assert_eq!(test::blob_count(&ctx).await, 1);

		for url in before {
			let key = ctx.blobs.key_from_url(&url).unwrap();
			assert!(ctx.blobs.fetch(&key).await.unwrap().is_none());
		}
	}

	#[tokio::test]
	async fn test_update_without_files_keeps_images() {
		let (ctx, author, _) = setup().await;
		let id = ctx
			.posts
			.save_post(input("hello"), vec![test::png()], author)
			.await
			.unwrap();

		ctx.posts.update_post(id, edit(), Vec::new(), author).await.unwrap();

		let post = ctx.posts.get_post_details(id, None).await.unwrap();

		assert_eq!(post.content, "edited content");
		assert_eq!(post.images.len(), 1);
	}

	#[tokio::test]
	async fn test_only_the_author_may_edit() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), Vec::new(), author).await.unwrap();

		let error = ctx.posts.update_post(id, edit(), vec![test::png()], reader).await.unwrap_err();
		assert!(matches!(error, Error::PostNotFound(..)));
		assert_eq!(test::blob_count(&ctx).await, 0);

		let error = ctx.posts.delete_post(id, reader).await.unwrap_err();
		assert!(matches!(error, Error::PostNotFound(..)));
	}

	#[tokio::test]
	async fn test_deleted_posts_disappear() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), vec![test::png()], author).await.unwrap();

		ctx.posts.delete_post(id, author).await.unwrap();

		let error = ctx.posts.get_post_details(id, Some(reader)).await.unwrap_err();
		assert!(matches!(error, Error::PostNotFound(..)));

		let page = ctx
			.posts
			.get_post_list(TEAM, Paginate::default(), SortMode::Default)
			.await
			.unwrap();
		assert!(page.content.is_empty());

		let error = ctx.posts.update_post(id, edit(), Vec::new(), author).await.unwrap_err();
		assert!(matches!(error, Error::PostNotFound(..)));

		let error = ctx.posts.like_process(id, reader).await.unwrap_err();
		assert!(matches!(error, Error::PostNotFound(..)));

		// attachments are left for later cleanup
		assert_eq!(test::blob_count(&ctx).await, 1);
	}

	#[tokio::test]
	async fn test_my_page_queries() {
		let (ctx, author, reader) = setup().await;
		let first = ctx.posts.save_post(input("first"), Vec::new(), author).await.unwrap();
		let second = ctx.posts.save_post(input("second"), Vec::new(), author).await.unwrap();

		ctx.posts.like_process(first, reader).await.unwrap();
		ctx.posts.like_process(second, reader).await.unwrap();
		ctx.posts
			.add_reply(first, reader, ReplyInput { content: "nice".into() })
			.await
			.unwrap();

		let liked = ctx.users.liked_posts(reader, Paginate::default()).await.unwrap();
		assert_eq!(liked.total_elements, 2);
		assert_eq!(liked.content[0].id, second);
		assert!(liked.content.iter().all(|post| post.liked));

		let replied = ctx.users.replied_posts(reader, Paginate::default()).await.unwrap();
		assert_eq!(replied.total_elements, 1);
		assert_eq!(replied.content[0].id, first);
		assert!(replied.content[0].replied);
		assert_eq!(replied.content[0].reply_count, 1);

		let mine = ctx
			.users
			.participating_posts(author, TEAM, Paginate::default())
			.await
			.unwrap();
		assert_eq!(mine.total_elements, 2);
		assert!(mine.content.iter().all(|post| !post.liked && post.like_count == 1));

		ctx.posts.delete_post(first, author).await.unwrap();

		let replied = ctx.users.replied_posts(reader, Paginate::default()).await.unwrap();
		assert_eq!(replied.total_elements, 0);
	}

	#[tokio::test]
	async fn test_reply_needs_visible_post() {
		let (ctx, author, reader) = setup().await;
		let id = ctx.posts.save_post(input("hello"), Vec::new(), author).await.unwrap();

		ctx.posts.delete_post(id, author).await.unwrap();

		let error = ctx
			.posts
			.add_reply(id, reader, ReplyInput { content: "late".into() })
			.await
			.unwrap_err();

		assert!(matches!(error, Error::PostNotFound(..)));
	}
}
