//! Timestamps are stored as unix milliseconds so that session lists written
//! by the browser client stay readable.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;

/// Deserialize unix milliseconds into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = i64::deserialize(deserializer)?;
    from_unix_millis(millis).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into unix milliseconds
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_i64(unix_millis(datetime))
}

/// Milliseconds since the unix epoch.
pub fn unix_millis(datetime: &OffsetDateTime) -> i64 {
    (datetime.unix_timestamp_nanos() / 1_000_000) as i64
}

/// Inverse of [`unix_millis`].
pub fn from_unix_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(millis as i128 * 1_000_000)
}

/// The current time truncated to millisecond precision.
pub fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    from_unix_millis(unix_millis(&now)).unwrap_or(now)
}
