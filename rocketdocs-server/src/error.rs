//! Maps [`CoreError`] onto HTTP status codes and a uniform JSON body,
//! per the error-category table: input errors are `400`, auth/ownership
//! `401`, state conflicts `400`/`409`, upstream and programming errors
//! surface as `500` without leaking the upstream stack.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rocketdocs_core::error::CoreError;
use serde_json::json;
use tracing::error;

pub struct ApiError(pub CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::InvalidUrl(_) | CoreError::EmptyInput(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            CoreError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            CoreError::NotOwner(_) => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            CoreError::BusyError(_) | CoreError::NamespaceConflict(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            CoreError::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            CoreError::UnsupportedKind(_) => {
                error!(error = %self.0, "programming error reached the http boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            CoreError::UpstreamIo { .. }
            | CoreError::LlmTruncated { .. }
            | CoreError::LlmParseError(_)
            | CoreError::MarkdownEmpty(_)
            | CoreError::DependencyNotReady(_) => {
                error!(error = %self.0, "upstream or generation error reached the http boundary");
                (StatusCode::INTERNAL_SERVER_ERROR, "generation failed".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
