//! Mapping of engine errors to HTTP responses
//!
//! Request problems are 400 with the reason. Sandbox failures are 500 with a
//! fixed message; the details only go to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use polyrun::runner::ExecutionError;
use polyrun::templates::TemplateError;
use thiserror::Error;
use tracing::error;

use crate::payload::ErrorResponse;

const INTERNAL_MESSAGE: &str = "internal error while executing code";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("request body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status and machine-readable kind
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Execution(ExecutionError::UnsupportedLanguage(_)) => {
                (StatusCode::BAD_REQUEST, "unsupported_language")
            }
            Self::Execution(ExecutionError::PayloadTooLarge { .. }) | Self::BodyTooLarge(_) => {
                (StatusCode::BAD_REQUEST, "payload_too_large")
            }
            Self::Execution(ExecutionError::InvalidTimeout(_)) => {
                (StatusCode::BAD_REQUEST, "invalid_timeout")
            }
            Self::InvalidBody(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Self::Template(TemplateError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "template_not_found")
            }
            Self::Execution(ExecutionError::Infrastructure(_)) | Self::Template(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure")
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, kind) = self.classify();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            INTERNAL_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            kind: kind.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
