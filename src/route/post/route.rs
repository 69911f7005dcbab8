use axum::extract::State;
use macros::route;

use crate::{
	extract::{Form, Json, MaybePrincipal, Path, Principal, Query},
	model::{self, CategoryIdInput, IdInput, Page, Paginate, PostIdInput},
	openapi::tag,
	service::{
		post::model::{self as post, FILES_PART},
		PostService,
	},
	store::Category,
};

use super::RouteError;

/// Get categories
#[route(tag = tag::POST)]
pub async fn categories(State(posts): State<PostService>) -> Result<Json<Vec<Category>>, RouteError> {
	Ok(Json(posts.categories().await?))
}

/// Get posts
/// Returns a page of the posts of a category, newest first.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(posts): State<PostService>,
	Path(path): Path<CategoryIdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<post::PostResponse>>, RouteError> {
	Ok(Json(
		posts
			.get_post_list(path.category_id, paginate, post::SortMode::Default)
			.await?,
	))
}

/// Get posts by likes
/// Returns a page of the posts of a category, most liked first.
#[route(tag = tag::POST)]
pub async fn get_posts_by_likes(
	State(posts): State<PostService>,
	Path(path): Path<CategoryIdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<post::PostResponse>>, RouteError> {
	Ok(Json(
		posts
			.get_post_list(path.category_id, paginate, post::SortMode::Likes)
			.await?,
	))
}

/// Get single post
/// Returns a post with its images. Authenticated readers other than the
/// author increase its view count.
#[route(tag = tag::POST, response(status = 404, description = "The post does not exist."))]
pub async fn get_post(
	State(posts): State<PostService>,
	principal: MaybePrincipal,
	Path(path): Path<IdInput>,
) -> Result<Json<post::PostResponse>, RouteError> {
	Ok(Json(
		posts
			.get_post_details(path.id, principal.user_id())
			.await?,
	))
}

/// Create post
/// Creates a post from a `requestDto` JSON part and any number of
/// `multipartFiles` image parts.
#[route(tag = tag::POST)]
pub async fn create_post(
	State(posts): State<PostService>,
	principal: Principal,
	mut form: Form<post::CreatePostInput>,
) -> Result<Json<model::Id>, RouteError> {
	let files = form.take_files(FILES_PART);
	let id = posts.save_post(form.input, files, principal.user_id).await?;

	Ok(Json(model::Id { id }))
}

/// Update post
/// Replaces the title and content of an own post. Sending `multipartFiles`
/// replaces all of its images, sending none keeps them.
#[route(tag = tag::POST, response(status = 404, description = "The post does not exist or is not yours."))]
pub async fn update_post(
	State(posts): State<PostService>,
	principal: Principal,
	Path(path): Path<PostIdInput>,
	mut form: Form<post::UpdatePostInput>,
) -> Result<Json<model::Id>, RouteError> {
	let files = form.take_files(FILES_PART);
	let id = posts
		.update_post(path.post_id, form.input, files, principal.user_id)
		.await?;

	Ok(Json(model::Id { id }))
}

/// Delete post
#[route(tag = tag::POST, response(status = 404, description = "The post does not exist or is not yours."))]
pub async fn delete_post(
	State(posts): State<PostService>,
	principal: Principal,
	Path(path): Path<PostIdInput>,
) -> Result<(), RouteError> {
	posts.delete_post(path.post_id, principal.user_id).await?;

	Ok(())
}

/// Toggle like
/// Likes the post, or takes the like back when the caller already likes it.
#[route(tag = tag::POST)]
pub async fn like_post(
	State(posts): State<PostService>,
	principal: Principal,
	Path(path): Path<PostIdInput>,
) -> Result<Json<post::LikeOutput>, RouteError> {
	Ok(Json(posts.like_process(path.post_id, principal.user_id).await?))
}

/// Reply to post
#[route(tag = tag::POST)]
pub async fn reply(
	State(posts): State<PostService>,
	principal: Principal,
	Path(path): Path<PostIdInput>,
	Json(input): Json<post::ReplyInput>,
) -> Result<Json<model::Id>, RouteError> {
	let id = posts.add_reply(path.post_id, principal.user_id, input).await?;

	Ok(Json(model::Id { id }))
}
