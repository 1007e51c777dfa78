/// Time utilities.
///
/// All persisted timestamps in Cinder Core are Unix milliseconds (UTC),
/// taken from `chrono::Utc::now()`. Session expiry math happens in the
/// same unit so sub-second TTLs behave predictably.

/// Returns the current Unix timestamp in milliseconds.
pub fn now_timestamp_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
