use std::time::{SystemTime, UNIX_EPOCH};

/// Retrieves the current Unix timestamp in seconds.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_secs()
}

/// Retrieves the current Unix timestamp in milliseconds.
///
/// Every time-indexed store in this crate (log lines, goroutine samples,
/// runtime stats, peer `lastModTime`) is stamped in milliseconds, not
/// seconds, so collector sampling cadence (1 Hz) still has useful
/// sub-second ordering resolution.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
