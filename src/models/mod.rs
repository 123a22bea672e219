pub mod annotations;
pub mod file_comment;
pub mod highlight;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current time, forced past `previous` so successive updates stay strictly ordered
/// even when they land inside the same millisecond.
pub fn next_timestamp(previous: i64) -> i64 {
    now_millis().max(previous + 1)
}
