//! piano-server library - HTTP front end for the piano tuning puzzle
//!
//! Serves the puzzle page, issues session tokens, streams each session's
//! detuned notes and judges submitted tunings.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use piano_common::{SecretState, SubmissionJudge, TuningOracle};

pub mod api;

/// Filesystem locations of served assets
#[derive(Debug, Clone)]
pub struct AssetPaths {
    /// Directory holding `index.html` and `cartographer.png`
    pub assets_dir: PathBuf,
    /// Directory holding rendered `{note}-{level}.mp3` files
    pub notes_dir: PathBuf,
}

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Secret state loaded (or created) at startup
    pub secrets: Arc<SecretState>,
    /// Oracle bound to the secret seeds
    pub oracle: TuningOracle,
    /// Judge owning the per-session rate-limit map
    pub judge: Arc<SubmissionJudge>,
    pub assets: Arc<AssetPaths>,
}

impl AppState {
    /// Create new application state
    pub fn new(secrets: SecretState, judge: SubmissionJudge, assets: AssetPaths) -> Self {
        Self {
            oracle: TuningOracle::new(secrets.seeds),
            secrets: Arc::new(secrets),
            judge: Arc::new(judge),
            assets: Arc::new(assets),
        }
    }
}

/// Build application router with every puzzle route under `prefix`
///
/// `prefix` is either empty or `/name` (see `TomlConfig::normalized_prefix`).
/// `/health` always lives at the root. Anything unmatched, including a known
/// path with the wrong method, gets the generic 400 answer.
pub fn build_router(state: AppState, prefix: &str) -> Router {
    use axum::middleware;
    use axum::routing::{get, get_service, post, MethodRouter};
    use tower_http::services::ServeFile;
    use tower_http::trace::TraceLayer;

    let path = |suffix: &str| format!("{}{}", prefix, suffix);

    // Session routes (require a valid token in the Authorization header)
    let protected = Router::new()
        .route(
            &path("/check"),
            post(api::check_tuning).fallback(api::fallback),
        )
        .route(
            &path("/piano"),
            get(api::note_preview).fallback(api::fallback),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_session,
        ));

    let index = ServeFile::new(state.assets.assets_dir.join("index.html"));
    let image = ServeFile::new(state.assets.assets_dir.join("cartographer.png"));
    let static_file =
        |file: ServeFile| -> MethodRouter<AppState> { get_service(file).fallback(api::fallback) };

    // Public routes (no authentication)
    let mut public = Router::new()
        .route(&path("/"), static_file(index.clone()))
        .route(&path("/cartographer.png"), static_file(image))
        .route(
            &path("/token"),
            get(api::issue_token).fallback(api::fallback),
        )
        .route(
            &path("/verify"),
            get(api::verify_token).fallback(api::fallback),
        );
    if !prefix.is_empty() {
        public = public.route(prefix, static_file(index));
    }

    Router::new()
        .merge(protected)
        .merge(public)
        .merge(api::health_routes())
        .fallback(api::fallback)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
