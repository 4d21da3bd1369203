//! Wall-clock helpers. All timestamps in the workspace are unix milliseconds.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

pub const MINUTE_MS: u64 = 60_000;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Index of the one-minute bucket containing `ts_ms`.
pub fn minute_bucket(ts_ms: u64) -> u64 {
    ts_ms / MINUTE_MS
}

/// RFC 3339 rendering used in log lines and alert text.
pub fn format_ms(ts_ms: u64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ts_ms as i64)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts_ms.to_string())
}
