//! Error responses
//!
//! Every client mistake gets the same 400 body so a caller cannot tell a bad
//! token from a bad note or a malformed submission. Server-side failures are
//! logged and answered with a bare 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use piano_common::Error;
use tracing::{debug, error};

/// Body of every client-error response
pub const GENERIC_REJECTION: &str = "just tune the piano :)";

/// Handler error wrapping the core error type
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_client_error() {
            debug!("Rejected request: {}", self.0);
            (StatusCode::BAD_REQUEST, GENERIC_REJECTION).into_response()
        } else {
            error!("Request failed: {}", self.0);
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// Fallback for unmatched routes
pub async fn fallback() -> ApiError {
    ApiError(Error::InvalidRequest("no such route".to_string()))
}
