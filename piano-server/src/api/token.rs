//! Token issuance and self-check endpoints

use axum::{extract::State, http::HeaderMap};
use piano_common::{time, token};
use tracing::debug;

use super::auth::session_from_headers;
use super::ApiError;
use crate::AppState;

/// GET /token
///
/// Starts a new session: returns a signed token embedding a fresh random
/// session seed, as plain text.
pub async fn issue_token(State(state): State<AppState>) -> Result<String, ApiError> {
    let (token, claims) = token::issue(state.secrets.signing_key(), time::unix_seconds())?;
    debug!("[{}]: Issued session token", claims.seed);
    Ok(token)
}

/// GET /verify
///
/// Lets a client check its token. Always 200; the body is `ok` or `nope`
/// and never says why a token failed.
pub async fn verify_token(State(state): State<AppState>, headers: HeaderMap) -> &'static str {
    match session_from_headers(&state, &headers) {
        Ok(_) => "ok",
        Err(_) => "nope",
    }
}
