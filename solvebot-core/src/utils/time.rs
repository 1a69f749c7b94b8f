use chrono::{DateTime, TimeZone, Utc};

/// Convert a `DateTime<Utc>` to epoch seconds for storage.
pub fn to_epoch(dt: DateTime<Utc>) -> i64 {
    dt.timestamp()
}

/// Convert epoch seconds (i64) back to `DateTime<Utc>`.
/// Out-of-range values fall back to 1970-01-01.
pub fn from_epoch(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Returns the current epoch seconds.
pub fn current_epoch() -> i64 {
    Utc::now().timestamp()
}
