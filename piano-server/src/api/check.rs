//! Submission endpoint

use axum::{body::Bytes, extract::State, Extension, Json};
use piano_common::{time, Error, SessionClaims, TuningMap, Verdict};

use super::ApiError;
use crate::AppState;

/// POST /check
///
/// Body is a JSON object mapping note identifiers to the player's
/// corrections. The content type is not checked. Throttled submissions are
/// still a 200 carrying `tuned: false` and the cooldown message.
pub async fn check_tuning(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    body: Bytes,
) -> Result<Json<Verdict>, ApiError> {
    let submission: TuningMap = serde_json::from_slice(&body)
        .map_err(|e| Error::InvalidRequest(format!("unparsable submission: {}", e)))?;

    let verdict = state
        .judge
        .judge(&state.oracle, claims.seed, &submission, time::now());

    Ok(Json(verdict))
}
