//! # Piano Tuner Common Library
//!
//! Core of the piano tuning puzzle, shared by the HTTP service and the
//! offline note renderer:
//! - Note catalogue with its fixed index order
//! - xorshift128+ generator and the deterministic tuning oracle
//! - Persisted secret state (generator seeds + token signing secret)
//! - Signed session tokens
//! - Submission judging with per-session cooldown
//! - Bootstrap configuration loading

pub mod config;
pub mod error;
pub mod judge;
pub mod notes;
pub mod oracle;
pub mod secrets;
pub mod time;
pub mod token;
pub mod xorshift;

pub use error::{Error, Result};
pub use judge::{SubmissionJudge, Tier, TuningMap, Verdict};
pub use notes::Note;
pub use oracle::{TuningLevel, TuningOracle};
pub use secrets::{SecretState, StateOrigin};
pub use token::SessionClaims;
