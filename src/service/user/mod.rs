//! Account lifecycle and my-page queries.

pub mod model;

use std::sync::Arc;

use axum::http::StatusCode;

use crate::{
	auth::{self, password, Encryptor, TokenProvider},
	blob::Upload,
	error::{self, ErrorShape},
	mail::{self, Mailer},
	model::{Page, Paginate},
	store::{self, NewUser, ProfileChanges, Store, UniqueField, User},
};

use super::image::{self, ImageService};

/// An error that can occur while managing accounts.
///
/// The `Display` output is only logged, the client sees the Korean messages
/// from [`ErrorShape::into_errors`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("email already registered")]
	DuplicatedEmail,
	#[error("nickname already registered")]
	DuplicatedNickname,
	#[error("phone already registered")]
	DuplicatedPhone,
	#[error("user not found")]
	UserNotFound,
	#[error("user is deleted")]
	UserDeleted,
	#[error("wrong password")]
	WrongPassword,
	#[error("new password equals the current one")]
	AlreadyMyPassword,
	#[error("unknown skill {0}")]
	UserSkillNotFound(String),
	#[error("category not found")]
	CategoryNotFound,
	#[error(transparent)]
	Image(#[from] image::Error),
	#[error(transparent)]
	Auth(#[from] auth::Error),
	#[error(transparent)]
	Mail(#[from] mail::Error),
	#[error("store error: {0}")]
	Store(store::Error),
}

impl From<store::Error> for Error {
	/// Unique index violations that got past the pre-checks are reported like
	/// the pre-checks would have.
	fn from(error: store::Error) -> Self {
		match error {
			store::Error::Conflict(index) => match index.as_str() {
				"user_email_key" => Self::DuplicatedEmail,
				"user_nickname_key" => Self::DuplicatedNickname,
				"user_phone_key" => Self::DuplicatedPhone,
				_ => Self::Store(store::Error::Conflict(index)),
			},
			error => Self::Store(error),
		}
	}
}

impl ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::DuplicatedEmail | Self::DuplicatedNickname | Self::DuplicatedPhone => StatusCode::CONFLICT,
			Self::UserNotFound | Self::UserSkillNotFound(..) | Self::CategoryNotFound => StatusCode::NOT_FOUND,
			Self::UserDeleted => StatusCode::FORBIDDEN,
			Self::WrongPassword => StatusCode::UNAUTHORIZED,
			Self::AlreadyMyPassword => StatusCode::BAD_REQUEST,
			Self::Image(error) => error.status(),
			Self::Auth(error) => error.status(),
			Self::Mail(..) | Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn into_errors(self) -> Vec<error::Message> {
		let (code, content) = match self {
			Self::DuplicatedEmail => ("duplicated_email", "이미 등록된 이메일입니다."),
			Self::DuplicatedNickname => ("duplicated_nickname", "이미 등록된 닉네임입니다."),
			Self::DuplicatedPhone => ("duplicated_phone", "이미 등록된 휴대폰 번호입니다"),
			Self::UserNotFound => ("user_not_found", "존재하지 않는 사용자입니다."),
			Self::UserDeleted => ("user_deleted", "탈퇴한 회원입니다."),
			Self::WrongPassword => ("wrong_password", "잘못된 비밀번호를 입력하였습니다."),
			Self::AlreadyMyPassword => ("already_my_password", "현재 비밀번호와 동일한 비밀번호입니다."),
			Self::UserSkillNotFound(skill) => {
				return error::Message::new("user_skill_not_found")
					.content("존재하지 않는 기술 스택입니다.")
					.field("skills")
					.detail("skill", skill)
					.into_vec()
			}
			Self::CategoryNotFound => ("category_not_found", "존재하지 않는 카테고리입니다."),
			Self::Image(error) => return error.into_errors(),
			Self::Auth(error) => return error.into_errors(),
			Self::Mail(..) | Self::Store(..) => return error::internal(),
		};

		error::Message::new(code).content(content).into_vec()
	}
}

/// Account lifecycle and my-page queries.
#[derive(Clone)]
pub struct UserService {
	store: Arc<dyn Store>,
	images: ImageService,
	encryptor: Encryptor,
	tokens: TokenProvider,
	mailer: Arc<dyn Mailer>,
}

impl UserService {
	pub fn new(
		store: Arc<dyn Store>,
		images: ImageService,
		encryptor: Encryptor,
		tokens: TokenProvider,
		mailer: Arc<dyn Mailer>,
	) -> Self {
		Self {
			store,
			images,
			encryptor,
			tokens,
			mailer,
		}
	}

	/// Registers a user, returning the new id.
	#[tracing::instrument(skip_all, fields(email = %input.email))]
	pub async fn create(&self, input: model::SignupInput, profile_image: Option<Upload>) -> Result<i64, Error> {
		self.ensure_unique(UniqueField::Email, &input.email).await?;
		self.ensure_unique(UniqueField::Nickname, &input.nickname).await?;
		self.ensure_unique(UniqueField::Phone, &input.phone).await?;

		let password = self.encryptor.hash(&input.password)?;

		let image = self.images.save_profile_image(profile_image.as_ref()).await?;

		let result = self
			.store
			.insert_user(NewUser {
				email: input.email,
				password,
				name: input.name,
				nickname: input.nickname,
				phone: input.phone,
				image_id: image.id,
			})
			.await;

		match result {
			Ok(id) => {
				tracing::info!(user_id = id, "user created");
				Ok(id)
			}
			Err(error) => {
				if !image.is_default() {
					if let Err(error) = self.images.delete_image(&image).await {
						tracing::error!(%error, image_id = image.id, "failed to remove orphaned profile image");
					}
				}

				Err(error.into())
			}
		}
	}

	/// Checks the credentials and issues a token.
	///
	/// An unknown email and a wrong password fail the same way.
	#[tracing::instrument(skip_all, fields(email = %input.email))]
	pub async fn login(&self, input: model::LoginInput) -> Result<model::LoginOutput, Error> {
		let user = self
			.store
			.find_user_by_email(&input.email)
			.await?
			.ok_or(Error::UserNotFound)?;

		if user.is_deleted {
			return Err(Error::UserDeleted);
		}

		if !self.encryptor.verify(&input.password, &user.password) {
			return Err(Error::UserNotFound);
		}

		let token = self.tokens.create(&user)?;

		Ok(model::LoginOutput {
			token,
			user_id: user.id,
			nickname: user.nickname,
		})
	}

	pub async fn get_my_page_information(&self, user_id: i64) -> Result<model::MyInfo, Error> {
		let user = self.active_user(user_id).await?;
		let profile_image_url = self.profile_image_url(&user).await?;
		let skills = self
			.store
			.user_skills(user.id)
			.await?
			.into_iter()
			.map(|skill| skill.skill_name)
			.collect();

		Ok(model::MyInfo {
			id: user.id,
			email: user.email,
			name: user.name,
			nickname: user.nickname,
			phone: user.phone,
			profile_image_url,
			skills,
		})
	}

	pub async fn get_login_information(&self, user_id: i64) -> Result<model::LoginInfo, Error> {
		let user = self.active_user(user_id).await?;
		let profile_image_url = self.profile_image_url(&user).await?;

		Ok(model::LoginInfo {
			id: user.id,
			nickname: user.nickname,
			profile_image_url,
		})
	}

	/// Applies profile fields and the skill list, and replaces the profile
	/// picture when a new one is given.
	#[tracing::instrument(skip(self, input, profile_image))]
	pub async fn update(
		&self,
		input: model::UpdateProfileInput,
		profile_image: Option<Upload>,
		user_id: i64,
	) -> Result<(), Error> {
		let user = self.active_user(user_id).await?;

		if user.nickname != input.nickname {
			self.ensure_unique(UniqueField::Nickname, &input.nickname).await?;
		}
		if user.phone != input.phone {
			self.ensure_unique(UniqueField::Phone, &input.phone).await?;
		}

		let skill_ids = self.resolve_skills(&input.skills).await?;

		let image = match profile_image.as_ref().filter(|file| !file.is_empty()) {
			Some(file) => Some(self.images.save_image(file).await?),
			None => None,
		};

		let result = self
			.store
			.update_profile(
				user.id,
				ProfileChanges {
					name: input.name,
					nickname: input.nickname,
					phone: input.phone,
					skill_ids,
					image_id: image.as_ref().map(|image| image.id),
				},
			)
			.await;

		let replaced = match result {
			Ok(replaced) => replaced,
			Err(error) => {
				if let Some(image) = &image {
					if let Err(error) = self.images.delete_image(image).await {
						tracing::error!(%error, image_id = image.id, "failed to remove unused profile image");
					}
				}

				return Err(error.into());
			}
		};

		if let Some(image_id) = replaced {
			self.remove_previous_image(image_id).await;
		}

		Ok(())
	}

	pub async fn update_password(&self, input: model::UpdatePasswordInput, user_id: i64) -> Result<(), Error> {
		let user = self.active_user(user_id).await?;

		if !self.encryptor.verify(&input.current_password, &user.password) {
			return Err(Error::WrongPassword);
		}

		if input.current_password == input.new_password {
			return Err(Error::AlreadyMyPassword);
		}

		let hash = self.encryptor.hash(&input.new_password)?;
		self.store.update_password(user.id, &hash).await?;

		Ok(())
	}

	/// Mails a freshly generated password to the user and makes it current.
	#[tracing::instrument(skip_all, fields(email = %input.email))]
	pub async fn create_new_password(&self, input: model::ResetPasswordInput) -> Result<(), Error> {
		let user = self
			.store
			.find_user_by_email_and_name(&input.email, &input.name)
			.await?
			.ok_or(Error::UserNotFound)?;

		let password = password::generate();
		let hash = self.encryptor.hash(&password)?;

		self.mailer.send_new_password(&user.email, &password).await?;
		self.store.update_password(user.id, &hash).await?;

		Ok(())
	}

	/// Soft-deletes the account after checking its password.
	pub async fn delete(&self, input: model::DeleteAccountInput, user_id: i64) -> Result<(), Error> {
		let user = self.active_user(user_id).await?;

		if !self.encryptor.verify(&input.password, &user.password) {
			return Err(Error::WrongPassword);
		}

		self.store.soft_delete_user(user.id).await?;

		tracing::info!(user_id, "user deleted");

		Ok(())
	}

	pub async fn liked_posts(&self, user_id: i64, paginate: Paginate) -> Result<Page<model::MyPagePost>, Error> {
		let user = self.active_user(user_id).await?;
		let slice = self.store.liked_posts(user.id, paginate.window()).await?;

		Ok(Page::from_slice(slice, paginate, model::MyPagePost::from))
	}

	pub async fn replied_posts(&self, user_id: i64, paginate: Paginate) -> Result<Page<model::MyPagePost>, Error> {
		let user = self.active_user(user_id).await?;
		let slice = self.store.replied_posts(user.id, paginate.window()).await?;

		Ok(Page::from_slice(slice, paginate, model::MyPagePost::from))
	}

	/// Posts the user wrote in one category.
	pub async fn participating_posts(
		&self,
		user_id: i64,
		category_id: i64,
		paginate: Paginate,
	) -> Result<Page<model::MyPagePost>, Error> {
		self.store
			.find_category(category_id)
			.await?
			.ok_or(Error::CategoryNotFound)?;

		let user = self.active_user(user_id).await?;
		let slice = self
			.store
			.authored_posts(user.id, category_id, paginate.window())
			.await?;

		Ok(Page::from_slice(slice, paginate, model::MyPagePost::from))
	}

	async fn ensure_unique(&self, field: UniqueField, value: &str) -> Result<(), Error> {
		if !self.store.user_exists(field, value).await? {
			return Ok(());
		}

		Err(match field {
			UniqueField::Email => Error::DuplicatedEmail,
			UniqueField::Nickname => Error::DuplicatedNickname,
			UniqueField::Phone => Error::DuplicatedPhone,
		})
	}

	/// Soft-deleted users are treated as absent.
	async fn active_user(&self, user_id: i64) -> Result<User, Error> {
		self.store
			.find_user(user_id)
			.await?
			.filter(|user| !user.is_deleted)
			.ok_or(Error::UserNotFound)
	}

	async fn profile_image_url(&self, user: &User) -> Result<String, Error> {
		let image = self.store.find_image(user.image_id).await?;

		Ok(image.map(|image| image.image_url).unwrap_or_default())
	}

	/// Maps skill names to ids, failing on the first unknown name.
	async fn resolve_skills(&self, names: &[String]) -> Result<Vec<i64>, Error> {
		let mut names = names.to_vec();
		names.sort();
		names.dedup();

		let skills = self.store.find_skills_by_name(&names).await?;

		if let Some(missing) = names
			.iter()
			.find(|name| !skills.iter().any(|skill| &skill.skill_name == *name))
		{
			return Err(Error::UserSkillNotFound(missing.clone()));
		}

		Ok(skills.into_iter().map(|skill| skill.id).collect())
	}

	/// Drops the replaced profile picture unless it is the shared default.
	async fn remove_previous_image(&self, image_id: i64) {
		let image = match self.store.find_image(image_id).await {
			Ok(Some(image)) if !image.is_default() => image,
			Ok(_) => return,
			Err(error) => {
				tracing::error!(%error, image_id, "failed to load replaced profile image");
				return;
			}
		};

		if let Err(error) = self.images.delete_image(&image).await {
			tracing::error!(%error, image_id, "failed to delete replaced profile image");
		}
	}
}

#[cfg(test)]
mod test {
	use super::{model::*, *};
	use crate::{
		blob::BlobStore,
		store::{ImageStore, UserStore},
		test,
	};

	#[tokio::test]
	async fn test_signup_uses_default_image() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let user = ctx.store.find_user(id).await.unwrap().unwrap();

		assert_eq!(user.image_id, store::DEFAULT_PROFILE_IMAGE_ID);
		assert_ne!(user.password, "Abcd1234");
	}

	#[tokio::test]
	async fn test_duplicates_are_rejected() {
		let ctx = test::context();
		ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let error = ctx.users.create(test::signup("a@x.com", "other", "01087654321"), None).await.unwrap_err();
		assert!(matches!(error, Error::DuplicatedEmail));

		let error = ctx.users.create(test::signup("b@x.com", "nick", "01087654321"), None).await.unwrap_err();
		assert!(matches!(error, Error::DuplicatedNickname));

		let error = ctx.users.create(test::signup("b@x.com", "other", "01012345678"), None).await.unwrap_err();
		assert!(matches!(error, Error::DuplicatedPhone));
	}

	#[tokio::test]
	async fn test_login() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let output = ctx.users.login(test::login("a@x.com", "Abcd1234")).await.unwrap();

		assert_eq!(output.user_id, id);
		assert_eq!(ctx.tokens.validate(&output.token).unwrap(), id.to_string());

		let unknown = ctx.users.login(test::login("b@x.com", "Abcd1234")).await.unwrap_err();
		let wrong = ctx.users.login(test::login("a@x.com", "Abcd12345")).await.unwrap_err();

		// indistinguishable to the client
		assert!(matches!(unknown, Error::UserNotFound));
		assert!(matches!(wrong, Error::UserNotFound));
	}

	#[tokio::test]
	async fn test_deleted_user_cannot_log_in() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let error = ctx
			.users
			.delete(DeleteAccountInput { password: "wrong1234".into() }, id)
			.await
			.unwrap_err();
		assert!(matches!(error, Error::WrongPassword));

		ctx.users
			.delete(DeleteAccountInput { password: "Abcd1234".into() }, id)
			.await
			.unwrap();

		let error = ctx.users.login(test::login("a@x.com", "Abcd1234")).await.unwrap_err();
		assert!(matches!(error, Error::UserDeleted));

		let error = ctx.users.get_login_information(id).await.unwrap_err();
		assert!(matches!(error, Error::UserNotFound));
	}

	#[tokio::test]
	async fn test_update_profile_and_skills() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();
		ctx.users.create(test::signup("b@x.com", "taken", "01087654321"), None).await.unwrap();

		let update = |nickname: &str, skills: &[&str]| UpdateProfileInput {
			name: "Lee".into(),
			nickname: nickname.into(),
			phone: "01012345678".into(),
			skills: skills.iter().map(|&skill| skill.into()).collect(),
		};

		let error = ctx.users.update(update("taken", &[]), None, id).await.unwrap_err();
		assert!(matches!(error, Error::DuplicatedNickname));

		let error = ctx.users.update(update("nick", &["Rust", "Cobol"]), None, id).await.unwrap_err();
		assert!(matches!(error, Error::UserSkillNotFound(ref skill) if skill == "Cobol"));

		// keeping the current nickname is not a duplicate
		ctx.users.update(update("nick", &["Rust", "Go"]), None, id).await.unwrap();
		ctx.users.update(update("renamed", &["Rust", "Docker"]), None, id).await.unwrap();

		let info = ctx.users.get_my_page_information(id).await.unwrap();
		let mut skills = info.skills.clone();
		skills.sort();

		assert_eq!(info.name, "Lee");
		assert_eq!(info.nickname, "renamed");
		assert_eq!(skills, ["Docker", "Rust"]);
	}

	#[tokio::test]
	async fn test_profile_image_replacement_keeps_default() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let update = || UpdateProfileInput {
			name: "Kim".into(),
			nickname: "nick".into(),
			phone: "01012345678".into(),
			skills: Vec::new(),
		};

		ctx.users.update(update(), Some(test::png()), id).await.unwrap();

		let first = ctx.store.find_user(id).await.unwrap().unwrap().image_id;
		assert_ne!(first, store::DEFAULT_PROFILE_IMAGE_ID);
		assert!(ctx.images.default_image().await.is_ok());

		ctx.users.update(update(), Some(test::png()), id).await.unwrap();

		let second = ctx.store.find_user(id).await.unwrap().unwrap().image_id;
		assert_ne!(second, first);
		assert!(ctx.store.find_image(first).await.unwrap().is_none());
		assert_eq!(test::blob_count(&ctx).await, 1);

		let info = ctx.users.get_login_information(id).await.unwrap();
		let key = ctx.blobs.key_from_url(&info.profile_image_url).unwrap();
		assert!(ctx.blobs.fetch(&key).await.unwrap().is_some());
	}

	#[tokio::test]
	async fn test_concurrent_image_updates_keep_only_current_image() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let update = || UpdateProfileInput {
			name: "Kim".into(),
			nickname: "nick".into(),
			phone: "01012345678".into(),
			skills: Vec::new(),
		};

		ctx.users.update(update(), Some(test::png()), id).await.unwrap();
		let first = ctx.store.find_user(id).await.unwrap().unwrap().image_id;

		// each update removes only the image it replaced
		let (a, b) = tokio::join!(
			ctx.users.update(update(), Some(test::png()), id),
			ctx.users.update(update(), Some(test::png()), id),
		);
		a.unwrap();
		b.unwrap();

		let current = ctx.store.find_user(id).await.unwrap().unwrap().image_id;
		assert_ne!(current, first);
		assert!(ctx.store.find_image(first).await.unwrap().is_none());
		assert!(ctx.store.find_image(current).await.unwrap().is_some());
		assert_eq!(test::blob_count(&ctx).await, 1);
	}

	#[tokio::test]
	async fn test_update_password() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let change = |current: &str, new: &str| UpdatePasswordInput {
			current_password: current.into(),
			new_password: new.into(),
		};

		let error = ctx.users.update_password(change("Wrong1234", "Efgh5678"), id).await.unwrap_err();
		assert!(matches!(error, Error::WrongPassword));

		let error = ctx.users.update_password(change("Abcd1234", "Abcd1234"), id).await.unwrap_err();
		assert!(matches!(error, Error::AlreadyMyPassword));

		ctx.users.update_password(change("Abcd1234", "Efgh5678"), id).await.unwrap();

		assert!(ctx.users.login(test::login("a@x.com", "Efgh5678")).await.is_ok());
		assert!(ctx.users.login(test::login("a@x.com", "Abcd1234")).await.is_err());
	}

	#[tokio::test]
	async fn test_new_password_is_mailed_and_stored() {
		let ctx = test::context();
		ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let error = ctx
			.users
			.create_new_password(ResetPasswordInput {
				email: "a@x.com".into(),
				name: "Somebody".into(),
			})
			.await
			.unwrap_err();
		assert!(matches!(error, Error::UserNotFound));

		ctx.users
			.create_new_password(ResetPasswordInput {
				email: "a@x.com".into(),
				name: "Kim".into(),
			})
			.await
			.unwrap();

		let (email, password) = ctx.mailer.last().unwrap();

		assert_eq!(email, "a@x.com");
		assert!(password::is_valid(&password));
		assert!(ctx.users.login(test::login("a@x.com", &password)).await.is_ok());
	}

	#[tokio::test]
	async fn test_participating_posts_need_a_category() {
		let ctx = test::context();
		let id = ctx.users.create(test::signup("a@x.com", "nick", "01012345678"), None).await.unwrap();

		let error = ctx
			.users
			.participating_posts(id, 999, Paginate::default())
			.await
			.unwrap_err();

		assert!(matches!(error, Error::CategoryNotFound));
	}
}
