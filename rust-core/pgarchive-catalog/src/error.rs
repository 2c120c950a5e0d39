// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive catalog - Error types
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Every failure in the catalog model is raised at the point where a value is
// assigned or parsed. Nothing is retried or clamped; callers receive the
// error as data.

use thiserror::Error;

/// Broad classification of a [`CatalogError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Malformed or out-of-range input.
    Validation,
    /// An operation was invoked before the fields it needs were populated.
    Precondition,
    /// An unrecognised size-unit symbol.
    Unit,
}

/// Errors that can occur while building or querying catalog values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// A WAL segment name is not exactly 24 characters long.
    #[error("invalid WAL segment name {name:?}: {reason}")]
    InvalidSegmentName {
        /// The rejected input.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// One of the timeline/xlog/segment fields is not exactly 8 characters.
    #[error("WAL segment {field} must be exactly 8 characters, got {value:?}")]
    InvalidSegmentField {
        /// Which field was being assigned.
        field: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A segment field was accepted on assignment but cannot be read as hex
    /// when the continuity arithmetic needs its numeric value.
    #[error("WAL segment {field} {value:?} is not hexadecimal")]
    NonHexSegmentField {
        /// Which field was being interpreted.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// Successor computation ran past the largest representable xlog.
    #[error("WAL segment {0} has no successor")]
    SegmentOverflow(String),

    #[error("invalid backup id {0:?}, expected YYYYMMDDTHHMMSS")]
    InvalidBackupId(String),

    #[error("invalid backup status {0:?}, expected one of empty, started, done, failed")]
    InvalidStatus(String),

    #[error("invalid compression {0:?}, expected one of none, gzip, bzip2, custom")]
    InvalidCompression(String),

    #[error("timeline must be greater than 0")]
    InvalidTimeline,

    /// The expected range would cover more xlog buckets than
    /// `MAX_XLOG_SPAN` allows, usually because of a corrupt upper bound.
    #[error("expected WAL range {begin}..={last} spans {buckets} xlog buckets, limit is {limit}")]
    RangeTooLarge {
        begin: String,
        last: String,
        buckets: u64,
        limit: u32,
    },

    /// A required string field was assigned an empty value.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("cannot interpret {0:?} as a timestamp")]
    InvalidTimestamp(String),

    /// A size magnitude was negative or not a finite number.
    #[error("invalid size magnitude {0}")]
    InvalidSize(String),

    #[error("unit {0:?} is not one of B, KiB, MiB, GiB, TiB")]
    InvalidUnit(String),

    /// A field needed by the requested operation has not been set yet.
    #[error("{0} is not set")]
    MissingField(&'static str),
}

impl CatalogError {
    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            CatalogError::MissingField(_) => ErrorClass::Precondition,
            CatalogError::InvalidUnit(_) => ErrorClass::Unit,
            _ => ErrorClass::Validation,
        }
    }
}

/// Convenience type alias for catalog results.
pub type CatalogResult<T> = Result<T, CatalogError>;
