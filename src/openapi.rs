use aide::{
	openapi::{SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json};

pub const SECURITY_SCHEME_BEARER: &str = "Bearer";

pub mod tag {
	pub const USER: &str = "User";
	pub const POST: &str = "Post";
	pub const MY_PAGE: &str = "MyPage";
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Community API")
		.summary("User accounts, categorized posts, images and likes")
		.description(
			"Write endpoints need an `Authorization: Bearer <token>` header with a token \
			 obtained from `POST /user/login`.",
		)
		.tag(Tag {
			name: tag::USER.into(),
			description: Some("Accounts and authentication".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::POST.into(),
			description: Some("Community posts, images, likes and replies".into()),
			..Default::default()
		})
		.tag(Tag {
			name: tag::MY_PAGE.into(),
			description: Some("Posts related to the authenticated user".into()),
			..Default::default()
		})
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::Http {
				scheme: "bearer".into(),
				bearer_format: Some("JWT".into()),
				description: Some("A token issued by the login endpoint".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorBody>, _>(|res| {
			res.example(error::ErrorBody {
				success: false,
				errors: error::Message::new("post_not_found")
					.content("존재하지 않는 게시글입니다.")
					.detail("post", 42)
					.into_vec(),
			})
		})
}
