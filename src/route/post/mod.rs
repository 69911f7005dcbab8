use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};

use crate::{error, service::post, AppState};

pub mod route;

pub type RouteError = error::RouteError<post::Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/categories", get_with(categories, categories_docs))
		.api_route("/list/:categoryId", get_with(get_posts, get_posts_docs))
		.api_route(
			"/list/likes/:categoryId",
			get_with(get_posts_by_likes, get_posts_by_likes_docs),
		)
		.api_route("/post/:id", get_with(get_post, get_post_docs))
		.api_route("/create", post_with(create_post, create_post_docs))
		.api_route("/update/:postId", post_with(update_post, update_post_docs))
		.api_route("/delete/:postId", post_with(delete_post, delete_post_docs))
		.api_route("/like/:postId", post_with(like_post, like_post_docs))
		.api_route("/reply/:postId", post_with(reply, reply_docs))
}
