use axum::extract::State;
use macros::route;

use crate::{
	extract::{Created, Form, Json, Path, Principal, Query},
	model::{self, CategoryIdInput, Page, Paginate},
	openapi::tag,
	service::{user::model as user, UserService},
};

use super::{RouteError, PROFILE_IMAGE_PART};

/// Sign up
/// Registers an account from a `requestDto` JSON part and an optional
/// `profileImage` file part. Without a picture the default one is used.
#[route(
	tag = tag::USER,
	response(status = 409, description = "The email, nickname or phone is already registered.")
)]
pub async fn create(
	State(users): State<UserService>,
	mut form: Form<user::SignupInput>,
) -> Result<Created<model::Id>, RouteError> {
	let profile_image = form.take_file(PROFILE_IMAGE_PART);
	let id = users.create(form.input, profile_image).await?;

	Ok(Created(model::Id { id }))
}

/// Log in
/// Exchanges credentials for a bearer token.
#[route(
	tag = tag::USER,
	response(status = 404, description = "Unknown email or wrong password."),
	response(status = 403, description = "The account was deleted.")
)]
pub async fn login(
	State(users): State<UserService>,
	Json(input): Json<user::LoginInput>,
) -> Result<Json<user::LoginOutput>, RouteError> {
	Ok(Json(users.login(input).await?))
}

/// Get login information
/// Returns the id, nickname and profile picture of the authenticated user.
#[route(tag = tag::USER)]
pub async fn me(State(users): State<UserService>, principal: Principal) -> Result<Json<user::LoginInfo>, RouteError> {
	Ok(Json(users.get_login_information(principal.user_id).await?))
}

/// Get my-page information
#[route(tag = tag::MY_PAGE)]
pub async fn my_page(State(users): State<UserService>, principal: Principal) -> Result<Json<user::MyInfo>, RouteError> {
	Ok(Json(users.get_my_page_information(principal.user_id).await?))
}

/// Update profile
/// Replaces the name, nickname, phone and skill list. A `profileImage` file
/// part replaces the profile picture.
#[route(tag = tag::MY_PAGE)]
pub async fn update(
	State(users): State<UserService>,
	principal: Principal,
	mut form: Form<user::UpdateProfileInput>,
) -> Result<(), RouteError> {
	let profile_image = form.take_file(PROFILE_IMAGE_PART);

	users
		.update(form.input, profile_image, principal.user_id)
		.await?;

	Ok(())
}

/// Change password
#[route(
	tag = tag::MY_PAGE,
	response(status = 401, description = "The current password is wrong.")
)]
pub async fn update_password(
	State(users): State<UserService>,
	principal: Principal,
	Json(input): Json<user::UpdatePasswordInput>,
) -> Result<(), RouteError> {
	users.update_password(input, principal.user_id).await?;

	Ok(())
}

/// Reset password
/// Mails a new password to the account matching the email and name.
#[route(tag = tag::USER)]
pub async fn reset_password(
	State(users): State<UserService>,
	Json(input): Json<user::ResetPasswordInput>,
) -> Result<(), RouteError> {
	users.create_new_password(input).await?;

	Ok(())
}

/// Delete account
#[route(
	tag = tag::MY_PAGE,
	response(status = 401, description = "The password is wrong.")
)]
pub async fn delete(
	State(users): State<UserService>,
	principal: Principal,
	Json(input): Json<user::DeleteAccountInput>,
) -> Result<(), RouteError> {
	users.delete(input, principal.user_id).await?;

	Ok(())
}

/// Get liked posts
/// Returns the posts the authenticated user likes, most recently liked first.
#[route(tag = tag::MY_PAGE)]
pub async fn liked_posts(
	State(users): State<UserService>,
	principal: Principal,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<user::MyPagePost>>, RouteError> {
	Ok(Json(users.liked_posts(principal.user_id, paginate).await?))
}

/// Get replied posts
/// Returns the posts the authenticated user replied to, most recent reply first.
#[route(tag = tag::MY_PAGE)]
pub async fn replied_posts(
	State(users): State<UserService>,
	principal: Principal,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<user::MyPagePost>>, RouteError> {
	Ok(Json(users.replied_posts(principal.user_id, paginate).await?))
}

/// Get own posts
/// Returns the posts the authenticated user wrote in a category, newest first.
#[route(tag = tag::MY_PAGE)]
pub async fn participating_posts(
	State(users): State<UserService>,
	principal: Principal,
	Path(path): Path<CategoryIdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<user::MyPagePost>>, RouteError> {
	Ok(Json(
		users
			.participating_posts(principal.user_id, path.category_id, paginate)
			.await?,
	))
}
