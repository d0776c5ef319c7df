mod helpers;
mod secret;
mod time;

pub use helpers::{flag_or_default, parse_flag};
pub use secret::Secret;
pub use time::{millis_to_datetime, EpochMillis, TimestampError};
