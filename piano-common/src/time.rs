//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current time as whole Unix seconds, for token `iat` claims
pub fn unix_seconds() -> i64 {
    now().timestamp()
}
