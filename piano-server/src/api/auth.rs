//! Session authentication middleware
//!
//! Session routes carry the token issued by `/token` in the `Authorization`
//! header (raw, or with a `Bearer ` prefix). On success the verified
//! [`SessionClaims`] are attached to the request extensions for handlers.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use piano_common::{token, Error, SessionClaims};

use super::ApiError;
use crate::AppState;

/// Verify the session token of the current request
pub fn session_from_headers(state: &AppState, headers: &HeaderMap) -> Result<SessionClaims, Error> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::InvalidToken("missing Authorization header".to_string()))?
        .to_str()
        .map_err(|_| Error::InvalidToken("non-ASCII Authorization header".to_string()))?;

    token::verify(state.secrets.signing_key(), token::token_from_header(value))
}

/// Authentication middleware for session routes
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = session_from_headers(&state, request.headers())?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
