//! Note preview endpoint
//!
//! Streams the pre-rendered recording of a key at the detuning the oracle
//! assigns to this session, so the player hears exactly what the judge
//! checks against.

use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension,
};
use piano_common::{Error, Note, SessionClaims};
use serde::Deserialize;
use tracing::debug;

use super::ApiError;
use crate::AppState;

/// Query parameters for note previews; `note` is the only one accepted
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewQuery {
    pub note: Option<String>,
}

/// GET /piano?note=C%234
pub async fn note_preview(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    query: Option<Query<PreviewQuery>>,
) -> Result<Response, ApiError> {
    let name = query
        .and_then(|Query(query)| query.note)
        .ok_or_else(|| Error::InvalidRequest("missing note".to_string()))?;

    if !Note::is_well_formed(&name) {
        return Err(Error::InvalidNote(name).into());
    }
    let note = Note::from_name(&name)?;
    let level = state.oracle.level(note, claims.seed);

    let path = state
        .assets
        .notes_dir
        .join(format!("{}.mp3", level.file_stem(note)));
    debug!("[{}]: Serving {}", claims.seed, path.display());

    let audio = tokio::fs::read(&path).await.map_err(Error::Io)?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}
