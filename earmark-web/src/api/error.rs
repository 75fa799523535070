//! Error responses for HTTP handlers
//!
//! Every failure leaves the server as `{"error": message}` with a status derived
//! from the domain error. Server-side failures are logged and reported with a
//! generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use earmark_common::Error;
use serde_json::json;
use tracing::error;

/// Domain error on its way to becoming an HTTP response
#[derive(Debug)]
pub struct ApiError(pub Error);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::PathEscape | Error::UnsupportedType => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::InvalidCsrf => StatusCode::FORBIDDEN,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self(Error::Internal(format!("Blocking task failed: {}", err)))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!("Request failed: {}", self.0);
            "Internal server error".to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
