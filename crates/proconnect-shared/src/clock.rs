use chrono::{SecondsFormat, Utc};

/// Milliseconds since the Unix epoch, as used by message and invite timestamps.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// ISO-8601 UTC time with millisecond precision, as used by `createdAt`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
