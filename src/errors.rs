//! API error types.
//!
//! Every variant maps to an HTTP status code and renders as a JSON body of
//! the form `{"error": "..."}`.  The enum implements
//! [`axum::response::IntoResponse`] so handlers can simply return
//! `Err(ApiError::NotFound)`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Generate a 16-character hex request ID.
pub fn generate_request_id() -> String {
    let bytes: [u8; 8] = rand::random();
    hex::encode(bytes).to_uppercase()
}

/// Errors surfaced to HTTP callers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A query parameter other than `id` was supplied.
    #[error("Invalid parameters")]
    InvalidParameters,

    /// The request body is missing the required `message` field.
    #[error("Oops! No message has been provided!")]
    MissingMessage,

    /// The `id` query parameter is required but absent.
    #[error("ID parameter is required")]
    MissingId,

    /// No message exists with the requested id.
    #[error("Message not found")]
    NotFound,

    /// An underlying store call failed; the message is forwarded verbatim.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Return the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParameters => StatusCode::BAD_REQUEST,
            ApiError::MissingMessage => StatusCode::BAD_REQUEST,
            ApiError::MissingId => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

// -- Tests --------------------------------------------------------------------
