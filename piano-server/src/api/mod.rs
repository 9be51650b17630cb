//! HTTP API handlers for piano-server

pub mod auth;
pub mod check;
pub mod error;
pub mod health;
pub mod piano;
pub mod token;

pub use auth::require_session;
pub use check::check_tuning;
pub use error::{fallback, ApiError, GENERIC_REJECTION};
pub use health::health_routes;
pub use piano::note_preview;
pub use token::{issue_token, verify_token};
