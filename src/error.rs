use aide::OperationOutput;
use axum::{
	body::Body,
	extract::{multipart, rejection},
	http::{Response, StatusCode},
	response::IntoResponse,
	Json,
};
use axum_jsonschema::JsonSchemaRejection;
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message sent to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// Stable, machine readable error code.
	pub code: String,
	/// Human readable message.
	pub content: String,
	/// The request field the error refers to, if any.
	pub field: Option<String>,
	pub details: Option<Map>,
}

impl Message {
	pub fn new(code: impl Into<String>) -> Self {
		let code = code.into();

		Self {
			content: code.clone(),
			code,
			field: None,
			details: None,
		}
	}

	pub fn content(mut self, content: impl Into<String>) -> Self {
		self.content = content.into();
		self
	}

	pub fn field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorBody {
	pub success: bool,
	pub errors: Vec<Message>,
}

impl ErrorBody {
	fn respond(status: StatusCode, errors: Vec<Message>) -> Response<Body> {
		(
			status,
			Json(Self {
				success: false,
				errors,
			}),
		)
			.into_response()
	}
}

/// How a domain error is presented over HTTP.
///
/// The `Display` output of the error is logged for server errors and never
/// sent to the client, so it may contain sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn into_errors(self) -> Vec<Message>;
}

/// Errors produced before a request reaches a service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("request body does not match its schema")]
	JsonSchema(JsonSchemaRejection),
	#[error("invalid json part: {0}")]
	PartJson(#[from] serde_json::Error),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("multipart error: {0}")]
	Multipart(#[from] multipart::MultipartRejection),
	#[error("multipart field error: {0}")]
	MultipartField(#[from] multipart::MultipartError),
	#[error("missing multipart part {0}")]
	MissingPart(&'static str),
	#[error("rate limited")]
	RateLimited(GovernorError),
}

impl From<JsonSchemaRejection> for AppError {
	fn from(rejection: JsonSchemaRejection) -> Self {
		Self::JsonSchema(rejection)
	}
}

impl From<GovernorError> for AppError {
	fn from(error: GovernorError) -> Self {
		Self::RateLimited(error)
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		let errors = match self {
			Self::JsonSchema(rejection) => return rejection.into_response(),
			Self::RateLimited(GovernorError::TooManyRequests { wait_time, .. }) => {
				return ErrorBody::respond(
					StatusCode::TOO_MANY_REQUESTS,
					Message::new("too_many_requests")
						.content("요청이 너무 많습니다. 잠시 후 다시 시도해주세요.")
						.detail("wait_time", wait_time)
						.into_vec(),
				)
			}
			Self::RateLimited(error) => {
				tracing::error!(?error, "rate limiter failed");

				return ErrorBody::respond(StatusCode::INTERNAL_SERVER_ERROR, Vec::new());
			}
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let message = Message::new(error.code.to_string()).field(field);

						match &error.message {
							Some(content) => message.content(content.to_string()),
							None => message,
						}
					})
				})
				.collect(),
			Self::MissingPart(part) => Message::new("missing_part")
				.field(part)
				.content(format!("{part} 항목이 필요합니다."))
				.into_vec(),
			error => Message::new("bad_request")
				.content(error.to_string())
				.into_vec(),
		};

		ErrorBody::respond(StatusCode::BAD_REQUEST, errors)
	}
}

/// The error type returned from route handlers: either the route's own
/// domain error or a request-level [`AppError`].
#[derive(Debug)]
pub enum RouteError<T> {
	Route(T),
	App(AppError),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => {
				let status = error.status();

				if status.is_server_error() {
					tracing::error!(%error, "request failed");
				}

				ErrorBody::respond(status, error.into_errors())
			}
			Self::App(error) => error.into_response(),
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = ErrorBody;
}

/// The message used for failures the client cannot act on.
pub fn internal() -> Vec<Message> {
	Message::new("internal_error")
		.content("서버 내부 오류가 발생했습니다.")
		.into_vec()
}
