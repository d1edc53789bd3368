//! HTTP mapping for query errors

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::query::{ErrorKind, QueryError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    pub kind: &'static str,
}

impl From<&QueryError> for ErrorResponse {
    fn from(err: &QueryError) -> Self {
        Self {
            error: err.public_message(),
            code: err.status_code(),
            kind: err.kind().as_str(),
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        if self.kind() == ErrorKind::Internal {
            tracing::error!(error = %self, "request failed");
        }

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(ErrorResponse::from(&self))).into_response()
    }
}
