// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive catalog crate
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Models a PostgreSQL physical backup catalog as reported by the backup
// tool: backups, the WAL segments archived for them, and the continuity
// check answering "which segments must exist for this backup to be
// restorable, and which of them are missing?".
//
// # Structure
//
// - `segment`    : WalSegmentId (timeline/xlog/segment), WalSegment, WalSegments
// - `backup`     : BackupId, BackupStatus, BackupRecord
// - `continuity` : expected-range derivation and missing-segment diff
// - `catalog`    : BackupCatalog with latest/oldest selection
// - `size_unit`  : B/KiB/MiB/GiB/TiB to bytes
// - `timestamp`  : coercion of textual, epoch and instant times
//
// Everything here is synchronous and in-memory. A record is a short-lived
// value owned by one request; nothing is locked internally.
//
// ## Usage
//
// ```
// use pgarchive_catalog::{BackupRecord, WalSegmentId};
//
// let mut backup = BackupRecord::new();
// backup.set_begin_segment("00000001000005A9000000BC").unwrap();
// backup.add_segment("00000001000005A9000000BE").unwrap();
//
// let missing = backup.missing_segments().unwrap();
// assert_eq!(missing, vec![
//     WalSegmentId::parse("00000001000005A9000000BC").unwrap(),
//     WalSegmentId::parse("00000001000005A9000000BD").unwrap(),
// ]);
// ```

pub mod backup;
pub mod catalog;
pub mod continuity;
pub mod error;
pub mod segment;
pub mod size_unit;
pub mod timestamp;

// Re-export the primary public API for ergonomic imports.
pub use backup::{BackupId, BackupRecord, BackupStatus};
pub use catalog::BackupCatalog;
pub use continuity::{expected_range, missing_from, MAX_XLOG_SPAN};
pub use error::{CatalogError, CatalogResult, ErrorClass};
pub use segment::{
    Compression, IntoSegmentId, IntoWalSegment, WalSegment, WalSegmentId, WalSegments,
    MAX_SEGMENT_NUMBER, SEGMENT_NAME_LEN,
};
pub use size_unit::{to_bytes, SizeUnit};
pub use timestamp::{parse_timestamp, IntoTimestamp};
