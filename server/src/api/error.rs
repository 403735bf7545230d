//! Transport-level rejection types.
//!
//! These never reach the backend. Every variant answers with a bare status
//! code and an empty body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Request rejected before dispatch.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Method other than GET/POST.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// No route or action-specific method restriction.
    #[error("Not found")]
    NotFound,

    /// Body could not be read (I/O error or over the size limit).
    #[error("Failed to read request body")]
    UnreadableBody,

    /// JSON content type with a body that is not valid JSON.
    #[error("Invalid JSON body")]
    InvalidJson,

    /// `Authorization` header without a space-separated token.
    #[error("Malformed authorization header")]
    MalformedAuthHeader,

    /// Token present but different from the configured one, or missing.
    #[error("Access token mismatch")]
    Unauthorized,
}

impl ApiError {
    pub const fn status(self) -> StatusCode {
        match self {
            // Deliberately opaque to method probing.
            Self::MethodNotAllowed | Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnreadableBody | Self::InvalidJson => StatusCode::BAD_REQUEST,
            Self::MalformedAuthHeader | Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.status().into_response()
    }
}
