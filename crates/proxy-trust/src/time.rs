//! Time utilities for constraint handling.
//!
//! Connection and delegation times are Unix epoch milliseconds (i64),
//! matching the units of the time-based invocation constraints.

/// Return the current time as milliseconds since Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Convert milliseconds to an RFC 3339 string.
pub fn millis_to_rfc3339(millis: i64) -> String {
    let secs = millis.div_euclid(1000);
    let nsecs = (millis.rem_euclid(1000) * 1_000_000) as u32;
    let dt = chrono::DateTime::from_timestamp(secs, nsecs).unwrap_or(chrono::DateTime::UNIX_EPOCH);
    dt.to_rfc3339()
}
