use anyhow::{Context, Result};
use time::format_description::well_known;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::model::Timestamp;

/// Converts a Unix timestamp into a UTC date.
pub fn timestamp_to_utc(timestamp: Timestamp) -> Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .with_context(|| format!("Timestamp {timestamp} is out of range"))
}

/// True if the timestamp can be represented as a date. Anything outside
/// that range is junk, and arithmetic on it could overflow.
pub fn is_valid_timestamp(timestamp: Timestamp) -> bool {
    OffsetDateTime::from_unix_timestamp(timestamp).is_ok()
}

/// Formats 'utc_date' into a string like "2024-09-01T05:10:44Z".
/// This is the format that GPX files contain.
pub fn format_utc_date(utc_date: &OffsetDateTime) -> Result<String> {
    assert!(utc_date.offset().is_utc());

    let mut buf = Vec::with_capacity(20);
    utc_date.format_into(&mut buf, &well_known::Rfc3339)?;
    Ok(String::from_utf8(buf)?)
}

/// Formats 'utc_date' as "YYYYMMDDHHMMSS", which sorts the same way as the
/// dates do and is safe to use in a file name.
pub fn format_compact_utc_date(utc_date: &OffsetDateTime) -> Result<String> {
    assert!(utc_date.offset().is_utc());

    let format = format_description!("[year][month][day][hour][minute][second]");
    Ok(utc_date.format(&format)?)
}
