//! Millisecond timestamps.
//!
//! Every timestamp that crosses the wire (signature times, dynamic salt times, expiry hints) is a signed count of
//! milliseconds since the Unix epoch. Storing them as `i64` keeps them directly comparable and lets SQLite hold them as
//! plain integers.
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

pub type EpochMillis = i64;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0} is not a representable millisecond timestamp")]
pub struct TimestampError(pub EpochMillis);

pub fn millis_to_datetime(millis: EpochMillis) -> Result<DateTime<Utc>, TimestampError> {
    Utc.timestamp_millis_opt(millis).single().ok_or(TimestampError(millis))
}
