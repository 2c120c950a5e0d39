// SPDX-License-Identifier: PMPL-1.0-or-later
//! Coercion of the time representations found in backup metadata.
//!
//! The backup tool reports times in several shapes: `backup.info` carries
//! `2013-02-25 19:26:54.852814` (optionally with an offset), listings carry
//! ctime strings (`Mon Feb 18 18:11:16 2013`), and the WAL index carries
//! fractional epoch seconds. All of them normalise to `DateTime<Utc>`;
//! times without an offset are taken as UTC.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::error::{CatalogError, CatalogResult};

/// Text formats carrying an explicit offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Text formats without an offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%a %b %e %H:%M:%S %Y",
    "%Y%m%dT%H%M%S",
];

/// A value that can be interpreted as a point in time.
pub trait IntoTimestamp {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>>;
}

impl IntoTimestamp for DateTime<Utc> {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        Ok(self)
    }
}

impl IntoTimestamp for DateTime<FixedOffset> {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        Ok(self.with_timezone(&Utc))
    }
}

/// Whole seconds since the Unix epoch.
impl IntoTimestamp for i64 {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        Utc.timestamp_opt(self, 0)
            .single()
            .ok_or_else(|| CatalogError::InvalidTimestamp(self.to_string()))
    }
}

/// Seconds since the Unix epoch; the fractional part is dropped.
impl IntoTimestamp for f64 {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        if !self.is_finite() || self.abs() > i64::MAX as f64 {
            return Err(CatalogError::InvalidTimestamp(self.to_string()));
        }
        (self.trunc() as i64).into_timestamp()
    }
}

impl IntoTimestamp for &str {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

impl IntoTimestamp for String {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        parse_timestamp(&self)
    }
}

impl IntoTimestamp for &String {
    fn into_timestamp(self) -> CatalogResult<DateTime<Utc>> {
        parse_timestamp(self)
    }
}

/// Parse a textual timestamp in any of the shapes the backup tool emits.
pub fn parse_timestamp(input: &str) -> CatalogResult<DateTime<Utc>> {
    let text = input.trim();
    if text.is_empty() {
        return Err(CatalogError::InvalidTimestamp(input.to_string()));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Ok(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(parsed.and_utc());
        }
    }
    if let Ok(epoch) = text.parse::<f64>() {
        return epoch.into_timestamp();
    }

    Err(CatalogError::InvalidTimestamp(input.to_string()))
}
