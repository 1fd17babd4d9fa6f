//! Utility functions for session ids and timestamps.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generates a fresh, caller-opaque session id (UUID v4).
#[must_use]
pub fn generate_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Formats a UTC timestamp as ISO 8601 with microsecond precision.
///
/// # Examples
///
/// ```
/// use modelchain::utils::iso_timestamp;
///
/// let ts = iso_timestamp(chrono::Utc::now());
/// assert!(ts.contains('T'));
/// assert!(ts.ends_with("+00:00"));
/// ```
#[must_use]
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}
