use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use tower_governor::GovernorLayer;

use crate::{error, ratelimit::Limits, service::user, AppState};

pub mod route;

/// The multipart part carrying a profile picture.
pub const PROFILE_IMAGE_PART: &str = "profileImage";

pub type RouteError = error::RouteError<user::Error>;

pub fn routes(limits: Option<&Limits>) -> ApiRouter<AppState> {
	use route::*;

	let credentials = ApiRouter::new().api_route("/login", post_with(login, login_docs));
	let credentials = match limits {
		Some(limits) => credentials.layer(GovernorLayer {
			config: limits.login.clone(),
		}),
		None => credentials,
	};

	ApiRouter::new()
		.merge(credentials)
		.api_route("/create", post_with(create, create_docs))
		.api_route("/me", get_with(me, me_docs))
		.api_route("/mypage", get_with(my_page, my_page_docs))
		.api_route("/update", post_with(update, update_docs))
		.api_route("/password", post_with(update_password, update_password_docs))
		.api_route("/password/reset", post_with(reset_password, reset_password_docs))
		.api_route("/delete", post_with(delete, delete_docs))
		.api_route("/mypage/likes", get_with(liked_posts, liked_posts_docs))
		.api_route("/mypage/replies", get_with(replied_posts, replied_posts_docs))
		.api_route(
			"/mypage/posts/:categoryId",
			get_with(participating_posts, participating_posts_docs),
		)
}
