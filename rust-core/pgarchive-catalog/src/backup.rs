// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive catalog - Backup records
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A BackupRecord starts empty and is filled field by field from the backup
// tool's listings and `backup.info` file. Every setter validates its input
// and fails immediately rather than clamping.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::continuity;
use crate::error::{CatalogError, CatalogResult};
use crate::segment::{IntoSegmentId, IntoWalSegment, WalSegmentId, WalSegments};
use crate::timestamp::IntoTimestamp;

/// Format of a backup id: date, literal `T`, time.
pub const BACKUP_ID_FORMAT: &str = "%Y%m%dT%H%M%S";

const BACKUP_ID_LEN: usize = 15;

// ---------------------------------------------------------------------------
// BackupId
// ---------------------------------------------------------------------------

/// Identifier of a backup within its server, e.g. `20130304T080002`.
///
/// The id is the backup's start time, so ordering ids orders backups
/// chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BackupId {
    text: String,
    timestamp: NaiveDateTime,
}

impl BackupId {
    pub fn parse(id: &str) -> CatalogResult<Self> {
        let invalid = || CatalogError::InvalidBackupId(id.to_string());
        if !has_id_shape(id) {
            return Err(invalid());
        }
        let timestamp = NaiveDateTime::parse_from_str(id, BACKUP_ID_FORMAT).map_err(|_| invalid())?;
        Ok(Self {
            text: id.to_string(),
            timestamp,
        })
    }

    /// Returns `true` if `id` is a well-formed backup id.
    pub fn is_valid(id: &str) -> bool {
        Self::parse(id).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The start time encoded in the id.
    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }
}

/// Exactly eight digits, `T`, six digits.
fn has_id_shape(id: &str) -> bool {
    let bytes = id.as_bytes();
    bytes.len() == BACKUP_ID_LEN
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'T'
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

impl fmt::Display for BackupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for BackupId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BackupId {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BackupId> for String {
    fn from(id: BackupId) -> Self {
        id.text
    }
}

impl PartialEq<str> for BackupId {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for BackupId {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

// ---------------------------------------------------------------------------
// BackupStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a backup as reported by the backup tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Empty,
    Started,
    Done,
    Failed,
}

impl BackupStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BackupStatus::Empty => "empty",
            BackupStatus::Started => "started",
            BackupStatus::Done => "done",
            BackupStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for BackupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupStatus {
    type Err = CatalogError;

    /// Case-insensitive, so `DONE` from `backup.info` is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(BackupStatus::Empty),
            "started" => Ok(BackupStatus::Started),
            "done" => Ok(BackupStatus::Done),
            "failed" => Ok(BackupStatus::Failed),
            _ => Err(CatalogError::InvalidStatus(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BackupRecord
// ---------------------------------------------------------------------------

/// Metadata of one physical base backup and the WAL segments belonging to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    server_name: Option<String>,
    id: Option<BackupId>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    status: Option<BackupStatus>,
    data_size_bytes: Option<u64>,
    wal_size_bytes: Option<u64>,
    begin_segment: Option<WalSegmentId>,
    end_segment: Option<WalSegmentId>,
    timeline: Option<u32>,
    data_directory: Option<PathBuf>,
    pg_version: Option<u32>,
    segments: WalSegments,
    deleted: bool,
}

impl BackupRecord {
    /// An empty record; every field is unset and `deleted` is false.
    pub fn new() -> Self {
        Self::default()
    }

    // -- accessors ----------------------------------------------------------

    pub fn server_name(&self) -> Option<&str> {
        self.server_name.as_deref()
    }

    pub fn id(&self) -> Option<&BackupId> {
        self.id.as_ref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Absent while the backup is still running.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn status(&self) -> Option<BackupStatus> {
        self.status
    }

    pub fn data_size_bytes(&self) -> Option<u64> {
        self.data_size_bytes
    }

    pub fn wal_size_bytes(&self) -> Option<u64> {
        self.wal_size_bytes
    }

    /// First WAL segment written after the backup started.
    pub fn begin_segment(&self) -> Option<&WalSegmentId> {
        self.begin_segment.as_ref()
    }

    /// Last WAL segment written before the backup stopped.
    pub fn end_segment(&self) -> Option<&WalSegmentId> {
        self.end_segment.as_ref()
    }

    pub fn timeline(&self) -> Option<u32> {
        self.timeline
    }

    pub fn data_directory(&self) -> Option<&Path> {
        self.data_directory.as_deref()
    }

    /// Server version number as recorded in `backup.info` (e.g. `90204`).
    pub fn pg_version(&self) -> Option<u32> {
        self.pg_version
    }

    pub fn segments(&self) -> &WalSegments {
        &self.segments
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    // -- setters ------------------------------------------------------------

    pub fn set_server_name(&mut self, name: impl Into<String>) -> CatalogResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CatalogError::EmptyField("server name"));
        }
        self.server_name = Some(name);
        Ok(())
    }

    pub fn set_id(&mut self, id: &str) -> CatalogResult<()> {
        self.id = Some(BackupId::parse(id)?);
        Ok(())
    }

    pub fn set_started_at(&mut self, started_at: impl IntoTimestamp) -> CatalogResult<()> {
        self.started_at = Some(started_at.into_timestamp()?);
        Ok(())
    }

    pub fn set_ended_at(&mut self, ended_at: impl IntoTimestamp) -> CatalogResult<()> {
        self.ended_at = Some(ended_at.into_timestamp()?);
        Ok(())
    }

    pub fn set_status(&mut self, status: BackupStatus) {
        self.status = Some(status);
    }

    pub fn set_data_size_bytes(&mut self, size: u64) {
        self.data_size_bytes = Some(size);
    }

    pub fn set_wal_size_bytes(&mut self, size: u64) {
        self.wal_size_bytes = Some(size);
    }

    pub fn set_begin_segment(&mut self, segment: impl IntoSegmentId) -> CatalogResult<()> {
        self.begin_segment = Some(segment.into_segment_id()?);
        Ok(())
    }

    pub fn set_end_segment(&mut self, segment: impl IntoSegmentId) -> CatalogResult<()> {
        self.end_segment = Some(segment.into_segment_id()?);
        Ok(())
    }

    pub fn set_timeline(&mut self, timeline: u32) -> CatalogResult<()> {
        if timeline == 0 {
            return Err(CatalogError::InvalidTimeline);
        }
        self.timeline = Some(timeline);
        Ok(())
    }

    pub fn set_data_directory(&mut self, path: impl Into<PathBuf>) -> CatalogResult<()> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(CatalogError::EmptyField("data directory"));
        }
        self.data_directory = Some(path);
        Ok(())
    }

    pub fn set_pg_version(&mut self, version: u32) {
        self.pg_version = Some(version);
    }

    /// Replace the held segments wholesale.
    pub fn set_segments(&mut self, segments: WalSegments) {
        self.segments = segments;
    }

    /// Set the WAL size to the sum of the held segments' sizes. The index
    /// sizes are exact where the listing's rounded figure is not.
    pub fn refresh_wal_size_from_segments(&mut self) {
        self.wal_size_bytes = Some(self.segments.total_size_bytes());
    }

    // -- segments -----------------------------------------------------------

    /// Add a segment to this backup. Returns `false` if a segment with the
    /// same identifier was already held.
    pub fn add_segment(&mut self, segment: impl IntoWalSegment) -> CatalogResult<bool> {
        Ok(self.segments.push(segment.into_wal_segment()?))
    }

    /// Whether a segment with the same identifier is already held. Always
    /// `false` while no segments are held, whatever the argument.
    pub fn contains_segment(&self, segment: impl IntoSegmentId) -> CatalogResult<bool> {
        if self.segments.is_empty() {
            return Ok(false);
        }
        Ok(self.segments.contains(&segment.into_segment_id()?))
    }

    // -- continuity ---------------------------------------------------------

    /// Segments that must exist between the begin segment and the highest
    /// held segment, both inclusive.
    pub fn expected_segments(&self) -> CatalogResult<Vec<WalSegmentId>> {
        let last = self
            .segments
            .max_id()
            .ok_or(CatalogError::MissingField("WAL segments"))?;
        self.expected_segments_through(last)
    }

    /// Segments that must exist between the begin segment and `last`, both
    /// inclusive; for example `end_segment` to check a backup against what
    /// the backup tool reported rather than what was observed.
    pub fn expected_segments_through(
        &self,
        last: impl IntoSegmentId,
    ) -> CatalogResult<Vec<WalSegmentId>> {
        let begin = self
            .begin_segment
            .as_ref()
            .ok_or(CatalogError::MissingField("begin segment"))?;
        continuity::expected_range(begin, &last.into_segment_id()?)
    }

    /// Expected segments that are not held, in ascending order.
    pub fn missing_segments(&self) -> CatalogResult<Vec<WalSegmentId>> {
        Ok(continuity::missing_from(self.expected_segments()?, &self.segments))
    }

    /// Expected segments through `last` that are not held.
    pub fn missing_segments_through(
        &self,
        last: impl IntoSegmentId,
    ) -> CatalogResult<Vec<WalSegmentId>> {
        Ok(continuity::missing_from(
            self.expected_segments_through(last)?,
            &self.segments,
        ))
    }

    /// `true` when no expected segment is missing.
    pub fn is_restorable(&self) -> CatalogResult<bool> {
        Ok(self.missing_segments()?.is_empty())
    }

    // -- lifecycle ----------------------------------------------------------

    /// Server name and id, required before the backup tool can be asked
    /// anything about this backup.
    pub fn key(&self) -> CatalogResult<(&str, &BackupId)> {
        let server = self
            .server_name
            .as_deref()
            .ok_or(CatalogError::MissingField("server name"))?;
        let id = self.id.as_ref().ok_or(CatalogError::MissingField("backup id"))?;
        Ok((server, id))
    }

    /// Flag the record as deleted. There is no way back.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;
    use crate::segment::WalSegment;

    fn id(name: &str) -> WalSegmentId {
        WalSegmentId::parse(name).unwrap()
    }

    #[test]
    fn test_new_record_is_not_deleted() {
        let backup = BackupRecord::new();
        assert!(!backup.is_deleted());
        assert!(backup.id().is_none());
        assert!(backup.segments().is_empty());
    }

    #[test]
    fn test_backup_id_validation() {
        assert!(BackupId::is_valid("20130304T080002"));
        assert!(!BackupId::is_valid(""));
        assert!(!BackupId::is_valid("213"));
        assert!(!BackupId::is_valid("x20130304T080002"));
        assert!(!BackupId::is_valid("20130304T0800021"));
        assert!(!BackupId::is_valid("20130304t080002"));
        // Right shape, impossible date.
        assert!(!BackupId::is_valid("20131399T080002"));
    }

    #[test]
    fn test_set_id() {
        let mut backup = BackupRecord::new();
        assert_eq!(
            backup.set_id("213"),
            Err(CatalogError::InvalidBackupId("213".into()))
        );
        backup.set_id("20130304T080002").unwrap();
        assert!(backup.id().unwrap() == "20130304T080002");
    }

    #[test]
    fn test_backup_id_timestamp_and_order() {
        let a = BackupId::parse("20130303T081002").unwrap();
        let b = BackupId::parse("20130304T080002").unwrap();
        assert!(a < b);
        assert_eq!(b.timestamp().to_string(), "2013-03-04 08:00:02");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("DONE".parse::<BackupStatus>().unwrap(), BackupStatus::Done);
        assert_eq!("started".parse::<BackupStatus>().unwrap(), BackupStatus::Started);
        assert_eq!("Failed".parse::<BackupStatus>().unwrap(), BackupStatus::Failed);
        assert_eq!("empty".parse::<BackupStatus>().unwrap(), BackupStatus::Empty);
        assert!(matches!(
            "some".parse::<BackupStatus>(),
            Err(CatalogError::InvalidStatus(_))
        ));
    }

    #[test]
    fn test_time_setters() {
        let mut backup = BackupRecord::new();
        backup.set_started_at("2013-02-25 19:26:54.852814").unwrap();
        backup.set_ended_at(1_361_857_805i64).unwrap();
        assert!(backup.started_at().unwrap() < backup.ended_at().unwrap());
        assert!(backup.set_ended_at("None").is_err());
    }

    #[test]
    fn test_timeline_must_be_positive() {
        let mut backup = BackupRecord::new();
        assert_eq!(backup.set_timeline(0), Err(CatalogError::InvalidTimeline));
        backup.set_timeline(1).unwrap();
        assert_eq!(backup.timeline(), Some(1));
    }

    #[test]
    fn test_data_directory_must_not_be_empty() {
        let mut backup = BackupRecord::new();
        assert!(backup.set_data_directory("").is_err());
        backup.set_data_directory("/path/to/pgdata").unwrap();
        assert_eq!(backup.data_directory(), Some(Path::new("/path/to/pgdata")));
    }

    #[test]
    fn test_server_name_must_not_be_empty() {
        let mut backup = BackupRecord::new();
        assert!(backup.set_server_name("").is_err());
        assert!(backup.set_server_name("   ").is_err());
        backup.set_server_name("test").unwrap();
        assert_eq!(backup.server_name(), Some("test"));
    }

    #[test]
    fn test_begin_and_end_segment() {
        let mut backup = BackupRecord::new();
        backup.set_begin_segment("0000000100000552000000B6").unwrap();
        backup.set_end_segment(id("000000010000055700000031")).unwrap();
        assert_eq!(backup.begin_segment(), Some(&id("0000000100000552000000B6")));
        assert_eq!(backup.end_segment(), Some(&id("000000010000055700000031")));
        assert!(backup.set_begin_segment("short").is_err());
    }

    #[test]
    fn test_contains_segment() {
        let mut backup = BackupRecord::new();
        // Nothing held yet: false, even for garbage.
        assert!(!backup.contains_segment("garbage").unwrap());

        assert!(backup.add_segment("000000010000049A000000DA").unwrap());
        assert!(backup.contains_segment("000000010000049A000000DA").unwrap());
        assert!(!backup.contains_segment("000000010000049A000000CE").unwrap());
        assert!(backup.contains_segment("garbage").is_err());
    }

    #[test]
    fn test_add_segment_keeps_metadata_and_skips_duplicates() {
        let mut backup = BackupRecord::new();
        let mut segment = WalSegment::parse("00000001000005A9000000BC").unwrap();
        segment.set_size_bytes(4_684_503);
        assert!(backup.add_segment(segment).unwrap());
        assert!(backup.add_segment("00000001000005A9000000BD").unwrap());
        assert!(!backup.add_segment(id("00000001000005A9000000BC")).unwrap());
        assert_eq!(backup.segments().len(), 2);

        backup.refresh_wal_size_from_segments();
        assert_eq!(backup.wal_size_bytes(), Some(4_684_503));
    }

    #[test]
    fn test_expected_segments_stop_at_highest_held() {
        let mut backup = BackupRecord::new();
        backup.set_begin_segment("00000001000005A9000000BC").unwrap();
        backup.add_segment("00000001000005A9000000BD").unwrap();
        backup.add_segment("00000001000005A9000000BC").unwrap();

        let expected = backup.expected_segments().unwrap();
        assert_eq!(
            expected,
            vec![id("00000001000005A9000000BC"), id("00000001000005A9000000BD")]
        );
        assert!(backup.missing_segments().unwrap().is_empty());
        assert!(backup.is_restorable().unwrap());
    }

    #[test]
    fn test_expected_segments_cross_bucket() {
        let mut backup = BackupRecord::new();
        backup.set_begin_segment("00000001000005A9000000BC").unwrap();
        backup.add_segment("00000001000005AA00000000").unwrap();

        let expected = backup.expected_segments().unwrap();
        assert_eq!(expected.len(), 0xFE - 0xBC + 2);
        assert_eq!(expected[0xFE - 0xBC], id("00000001000005A9000000FE"));
        assert_eq!(expected.last().unwrap(), &id("00000001000005AA00000000"));

        let missing = backup.missing_segments().unwrap();
        assert_eq!(missing.len(), expected.len() - 1);
        assert!(!missing.contains(&id("00000001000005AA00000000")));
        assert!(!backup.is_restorable().unwrap());
    }

    #[test]
    fn test_expected_segments_through_end_segment() {
        let mut backup = BackupRecord::new();
        backup.set_begin_segment("00000001000005A9000000BC").unwrap();
        backup.set_end_segment("00000001000005A9000000BF").unwrap();
        backup.add_segment("00000001000005A9000000BC").unwrap();

        let end = backup.end_segment().cloned().unwrap();
        assert_eq!(backup.expected_segments_through(&end).unwrap().len(), 4);
        assert_eq!(
            backup.missing_segments_through(&end).unwrap(),
            vec![
                id("00000001000005A9000000BD"),
                id("00000001000005A9000000BE"),
                id("00000001000005A9000000BF"),
            ]
        );
    }

    #[test]
    fn test_continuity_preconditions() {
        let mut backup = BackupRecord::new();
        backup.add_segment("00000001000005A9000000BC").unwrap();
        let err = backup.expected_segments().unwrap_err();
        assert_eq!(err, CatalogError::MissingField("begin segment"));
        assert_eq!(err.class(), ErrorClass::Precondition);

        let mut backup = BackupRecord::new();
        backup.set_begin_segment("00000001000005A9000000BC").unwrap();
        assert_eq!(
            backup.missing_segments().unwrap_err(),
            CatalogError::MissingField("WAL segments")
        );
    }

    #[test]
    fn test_key_requires_server_and_id() {
        let mut backup = BackupRecord::new();
        assert_eq!(
            backup.key().unwrap_err(),
            CatalogError::MissingField("server name")
        );
        backup.set_server_name("test").unwrap();
        assert_eq!(backup.key().unwrap_err(), CatalogError::MissingField("backup id"));
        backup.set_id("20130304T080002").unwrap();
        let (server, id) = backup.key().unwrap();
        assert_eq!(server, "test");
        assert_eq!(id.as_str(), "20130304T080002");
    }

    #[test]
    fn test_mark_deleted() {
        let mut backup = BackupRecord::new();
        backup.mark_deleted();
        assert!(backup.is_deleted());
    }

    #[test]
    fn test_record_serializes_ids_as_strings() {
        let mut backup = BackupRecord::new();
        backup.set_id("20130304T080002").unwrap();
        backup.set_status(BackupStatus::Done);
        backup.set_begin_segment("00000001000005A9000000BC").unwrap();
        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["id"], "20130304T080002");
        assert_eq!(json["status"], "done");
        assert_eq!(json["begin_segment"], "00000001000005A9000000BC");

        let back: BackupRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, backup);
    }
}
