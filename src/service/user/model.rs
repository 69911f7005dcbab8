use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::{auth::password, store::MyPagePostRow};

/// Korean mobile numbers, digits only.
pub const PHONE_PATTERN: &str = r"^(01[016789]\d{3,4}\d{4})$";

fn phone_regex() -> &'static Regex {
	static PHONE: OnceLock<Regex> = OnceLock::new();

	PHONE.get_or_init(|| Regex::new(PHONE_PATTERN).expect("phone pattern is a valid regex"))
}

fn validate_phone(phone: &str) -> Result<(), ValidationError> {
	if phone_regex().is_match(phone) {
		return Ok(());
	}

	let mut error = ValidationError::new("phone");
	error.message = Some("휴대폰 번호 형식이 올바르지 않습니다.".into());

	Err(error)
}

fn validate_password(value: &str) -> Result<(), ValidationError> {
	if password::is_valid(value) {
		return Ok(());
	}

	let mut error = ValidationError::new("password");
	error.message = Some("비밀번호는 영문과 숫자를 섞어 8~20자로 입력해주세요.".into());

	Err(error)
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupInput {
	/// Used to log in and to receive password resets.
	#[validate(email)]
	pub email: String,
	/// 8 to 20 letters and digits, with at least one of each.
	#[validate(custom(function = "validate_password"))]
	pub password: String,
	#[validate(length(min = 1, max = 20))]
	pub name: String,
	/// The name displayed next to posts.
	#[validate(length(min = 2, max = 20))]
	pub nickname: String,
	/// Digits only, e.g. `01012345678`.
	#[validate(custom(function = "validate_phone"))]
	pub phone: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1))]
	pub password: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutput {
	/// Send as `Authorization: Bearer <token>`.
	pub token: String,
	pub user_id: i64,
	pub nickname: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
	#[validate(length(min = 1, max = 20))]
	pub name: String,
	#[validate(length(min = 2, max = 20))]
	pub nickname: String,
	#[validate(custom(function = "validate_phone"))]
	pub phone: String,
	/// The complete list of skill names after the update.
	#[serde(default)]
	pub skills: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordInput {
	#[validate(length(min = 1))]
	pub current_password: String,
	#[validate(custom(function = "validate_password"))]
	pub new_password: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1))]
	pub name: String,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountInput {
	#[validate(length(min = 1))]
	pub password: String,
}

/// What the client needs right after logging in.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginInfo {
	pub id: i64,
	pub nickname: String,
	pub profile_image_url: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyInfo {
	pub id: i64,
	pub email: String,
	pub name: String,
	pub nickname: String,
	pub phone: String,
	pub profile_image_url: String,
	pub skills: Vec<String>,
}

/// A post listed on the my-page, with the viewer's own involvement.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyPagePost {
	pub id: i64,
	pub category_id: i64,
	pub title: String,
	pub view: i32,
	pub like_count: i64,
	pub reply_count: i64,
	/// Whether the viewer likes this post.
	pub liked: bool,
	/// Whether the viewer replied to this post.
	pub replied: bool,
	pub created_at: DateTime<Utc>,
}

impl From<MyPagePostRow> for MyPagePost {
	fn from(row: MyPagePostRow) -> Self {
		Self {
			id: row.id,
			category_id: row.category_id,
			title: row.title,
			view: row.view,
			like_count: row.like_count,
			reply_count: row.reply_count,
			liked: row.liked,
			replied: row.replied,
			created_at: row.created_at,
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn signup(password: &str, phone: &str) -> SignupInput {
		SignupInput {
			email: "a@x.com".into(),
			password: password.into(),
			name: "Kim".into(),
			nickname: "nick".into(),
			phone: phone.into(),
		}
	}

	#[test]
	fn test_phone_pattern() {
		assert!(validate_phone("01012345678").is_ok());
		assert!(validate_phone("0111234567").is_ok());
		assert!(validate_phone("01912345678").is_ok());

		assert!(validate_phone("010-1234-5678").is_err());
		assert!(validate_phone("01212345678").is_err());
		assert!(validate_phone("0101234567890").is_err());
		assert!(validate_phone("").is_err());
	}

	#[test]
	fn test_signup_validation() {
		assert!(signup("Abcd1234", "01012345678").validate().is_ok());

		let errors = signup("abcdefgh", "01012345678").validate().unwrap_err();
		assert!(errors.field_errors().contains_key("password"));

		let errors = signup("Abcd1234", "1234").validate().unwrap_err();
		assert!(errors.field_errors().contains_key("phone"));
	}
}
