// SPDX-License-Identifier: PMPL-1.0-or-later
//
// pgarchive catalog - WAL segment identifiers and metadata
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// A WAL segment file is named by 24 hex characters: three 8-character
// fields for timeline, xlog (log file number) and segment number, e.g.
// `00000001000005A9000000BC`. Within one xlog the segment number runs from
// 00 to FE; FF is never used.
//
// Fields are only checked for length when assigned. Hex content is checked
// lazily, when the continuity arithmetic needs a field's numeric value.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};
use crate::timestamp::IntoTimestamp;

/// Length of a full segment name.
pub const SEGMENT_NAME_LEN: usize = 24;

/// Length of each of the three name fields.
pub const FIELD_LEN: usize = 8;

/// Highest segment number used within one xlog.
pub const MAX_SEGMENT_NUMBER: u32 = 0xFE;

// ---------------------------------------------------------------------------
// WalSegmentId
// ---------------------------------------------------------------------------

/// The timeline/xlog/segment triple naming one WAL segment.
///
/// Fields are stored in canonical uppercase. Equality, hashing and ordering
/// all follow the 24-character name, so ordering agrees with comparing the
/// names as base-16 integers.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalSegmentId {
    timeline: String,
    xlog: String,
    segment: String,
}

impl WalSegmentId {
    /// Parse a 24-character segment name.
    pub fn parse(name: &str) -> CatalogResult<Self> {
        let chars: Vec<char> = name.chars().collect();
        if chars.len() != SEGMENT_NAME_LEN {
            return Err(CatalogError::InvalidSegmentName {
                name: name.to_string(),
                reason: format!(
                    "expected exactly {SEGMENT_NAME_LEN} characters, got {}",
                    chars.len()
                ),
            });
        }

        let field = |index: usize| -> String {
            chars[index * FIELD_LEN..(index + 1) * FIELD_LEN]
                .iter()
                .collect()
        };

        Self::from_parts(&field(0), &field(1), &field(2)).map_err(|e| {
            CatalogError::InvalidSegmentName {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Build an identifier from its three 8-character fields.
    pub fn from_parts(timeline: &str, xlog: &str, segment: &str) -> CatalogResult<Self> {
        Ok(Self {
            timeline: validated_field("timeline", timeline)?,
            xlog: validated_field("xlog", xlog)?,
            segment: validated_field("segment", segment)?,
        })
    }

    /// Build an identifier from numeric fields, zero-padded to 8 hex digits.
    pub fn from_numbers(timeline: u32, xlog: u32, segment: u32) -> Self {
        Self {
            timeline: format!("{timeline:08X}"),
            xlog: format!("{xlog:08X}"),
            segment: format!("{segment:08X}"),
        }
    }

    /// Returns `true` if `name` looks like a WAL segment file name
    /// (24 hex digits, no suffix).
    pub fn is_wal_name(name: &str) -> bool {
        name.len() == SEGMENT_NAME_LEN && name.chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn timeline(&self) -> &str {
        &self.timeline
    }

    pub fn xlog(&self) -> &str {
        &self.xlog
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn set_timeline(&mut self, timeline: &str) -> CatalogResult<()> {
        self.timeline = validated_field("timeline", timeline)?;
        Ok(())
    }

    pub fn set_xlog(&mut self, xlog: &str) -> CatalogResult<()> {
        self.xlog = validated_field("xlog", xlog)?;
        Ok(())
    }

    pub fn set_segment(&mut self, segment: &str) -> CatalogResult<()> {
        self.segment = validated_field("segment", segment)?;
        Ok(())
    }

    /// The canonical 24-character name.
    pub fn name(&self) -> String {
        format!("{}{}{}", self.timeline, self.xlog, self.segment)
    }

    pub fn timeline_number(&self) -> CatalogResult<u32> {
        hex_value("timeline", &self.timeline)
    }

    pub fn xlog_number(&self) -> CatalogResult<u32> {
        hex_value("xlog", &self.xlog)
    }

    pub fn segment_number(&self) -> CatalogResult<u32> {
        hex_value("segment", &self.segment)
    }

    /// The identifier that follows this one on the same timeline.
    ///
    /// Segment numbers advance up to `FE`; after that the next xlog starts
    /// again at segment `00`.
    pub fn successor(&self) -> CatalogResult<Self> {
        let timeline = self.timeline_number()?;
        let xlog = self.xlog_number()?;
        let segment = self.segment_number()?;

        if segment < MAX_SEGMENT_NUMBER {
            return Ok(Self::from_numbers(timeline, xlog, segment + 1));
        }
        let next_xlog = xlog
            .checked_add(1)
            .ok_or_else(|| CatalogError::SegmentOverflow(self.name()))?;
        Ok(Self::from_numbers(timeline, next_xlog, 0))
    }

    /// An identifier on this identifier's timeline (kept verbatim) with the
    /// given xlog and segment numbers.
    pub(crate) fn on_same_timeline(&self, xlog: u32, segment: u32) -> Self {
        Self {
            timeline: self.timeline.clone(),
            xlog: format!("{xlog:08X}"),
            segment: format!("{segment:08X}"),
        }
    }

    fn name_bytes(&self) -> impl Iterator<Item = u8> + '_ {
        self.timeline
            .bytes()
            .chain(self.xlog.bytes())
            .chain(self.segment.bytes())
    }
}

fn validated_field(field: &'static str, value: &str) -> CatalogResult<String> {
    if value.chars().count() != FIELD_LEN {
        return Err(CatalogError::InvalidSegmentField {
            field,
            value: value.to_string(),
        });
    }
    Ok(value.to_ascii_uppercase())
}

fn hex_value(field: &'static str, value: &str) -> CatalogResult<u32> {
    let non_hex = || CatalogError::NonHexSegmentField {
        field,
        value: value.to_string(),
    };
    // from_str_radix alone would accept a leading '+'.
    if !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(non_hex());
    }
    u32::from_str_radix(value, 16).map_err(|_| non_hex())
}

impl PartialEq for WalSegmentId {
    fn eq(&self, other: &Self) -> bool {
        self.timeline == other.timeline
            && self.xlog == other.xlog
            && self.segment == other.segment
    }
}

/// Compares against a segment name. A name that does not parse is never equal.
impl PartialEq<str> for WalSegmentId {
    fn eq(&self, other: &str) -> bool {
        WalSegmentId::parse(other).is_ok_and(|parsed| *self == parsed)
    }
}

impl PartialEq<&str> for WalSegmentId {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

impl Hash for WalSegmentId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.timeline.hash(state);
        self.xlog.hash(state);
        self.segment.hash(state);
    }
}

impl PartialOrd for WalSegmentId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WalSegmentId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name_bytes().cmp(other.name_bytes())
    }
}

impl fmt::Display for WalSegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.timeline, self.xlog, self.segment)
    }
}

impl FromStr for WalSegmentId {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for WalSegmentId {
    type Error = CatalogError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for WalSegmentId {
    type Error = CatalogError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalSegmentId> for String {
    fn from(id: WalSegmentId) -> Self {
        id.name()
    }
}

/// Anything that denotes a WAL segment: an identifier (passed through
/// unchanged), a segment record, or a 24-character name.
pub trait IntoSegmentId {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId>;
}

impl IntoSegmentId for WalSegmentId {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        Ok(self)
    }
}

impl IntoSegmentId for &WalSegmentId {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        Ok(self.clone())
    }
}

impl IntoSegmentId for WalSegment {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        Ok(self.id)
    }
}

impl IntoSegmentId for &WalSegment {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        Ok(self.id.clone())
    }
}

impl IntoSegmentId for &str {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        WalSegmentId::parse(self)
    }
}

impl IntoSegmentId for String {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        WalSegmentId::parse(&self)
    }
}

impl IntoSegmentId for &String {
    fn into_segment_id(self) -> CatalogResult<WalSegmentId> {
        WalSegmentId::parse(self)
    }
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// How an archived segment file is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Custom,
}

impl Compression {
    pub fn as_str(self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            Compression::Custom => "custom",
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Compression {
    type Err = CatalogError;

    /// Case-insensitive. The python-side `pygzip`/`pybzip2` compressors
    /// write the same formats as `gzip`/`bzip2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Compression::None),
            "gzip" | "pygzip" => Ok(Compression::Gzip),
            "bzip2" | "pybzip2" => Ok(Compression::Bzip2),
            "custom" => Ok(Compression::Custom),
            _ => Err(CatalogError::InvalidCompression(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// WalSegment
// ---------------------------------------------------------------------------

/// An archived WAL segment: its identifier plus the metadata recorded in
/// the archive index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalSegment {
    id: WalSegmentId,
    size_bytes: Option<u64>,
    created_at: Option<DateTime<Utc>>,
    compression: Option<Compression>,
}

impl WalSegment {
    pub fn new(id: WalSegmentId) -> Self {
        Self {
            id,
            size_bytes: None,
            created_at: None,
            compression: None,
        }
    }

    /// Create a segment record from its 24-character name.
    pub fn parse(name: &str) -> CatalogResult<Self> {
        WalSegmentId::parse(name).map(Self::new)
    }

    pub fn id(&self) -> &WalSegmentId {
        &self.id
    }

    pub fn name(&self) -> String {
        self.id.name()
    }

    pub fn size_bytes(&self) -> Option<u64> {
        self.size_bytes
    }

    pub fn set_size_bytes(&mut self, size_bytes: u64) {
        self.size_bytes = Some(size_bytes);
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Accepts an instant, epoch seconds, or any textual form understood by
    /// [`crate::timestamp::parse_timestamp`].
    pub fn set_created_at(&mut self, created_at: impl IntoTimestamp) -> CatalogResult<()> {
        self.created_at = Some(created_at.into_timestamp()?);
        Ok(())
    }

    pub fn set_created_at_utc(&mut self, created_at: DateTime<Utc>) {
        self.created_at = Some(created_at);
    }

    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    pub fn set_compression(&mut self, compression: Compression) {
        self.compression = Some(compression);
    }
}

impl From<WalSegmentId> for WalSegment {
    fn from(id: WalSegmentId) -> Self {
        Self::new(id)
    }
}

/// Anything that can become a held segment record. Records keep their
/// metadata; identifiers and names produce a bare record.
pub trait IntoWalSegment {
    fn into_wal_segment(self) -> CatalogResult<WalSegment>;
}

impl IntoWalSegment for WalSegment {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        Ok(self)
    }
}

impl IntoWalSegment for &WalSegment {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        Ok(self.clone())
    }
}

impl IntoWalSegment for WalSegmentId {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        Ok(WalSegment::new(self))
    }
}

impl IntoWalSegment for &WalSegmentId {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        Ok(WalSegment::new(self.clone()))
    }
}

impl IntoWalSegment for &str {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        WalSegment::parse(self)
    }
}

impl IntoWalSegment for String {
    fn into_wal_segment(self) -> CatalogResult<WalSegment> {
        WalSegment::parse(&self)
    }
}

// ---------------------------------------------------------------------------
// WalSegments
// ---------------------------------------------------------------------------

/// The WAL segments held by one backup, in the order they were added.
///
/// An identifier is held at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<WalSegment>", into = "Vec<WalSegment>")]
pub struct WalSegments {
    segments: Vec<WalSegment>,
    index: HashSet<WalSegmentId>,
}

impl WalSegments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment. Returns `false`, leaving the collection unchanged,
    /// if a segment with the same identifier is already held.
    pub fn push(&mut self, segment: WalSegment) -> bool {
        if !self.index.insert(segment.id.clone()) {
            return false;
        }
        self.segments.push(segment);
        true
    }

    pub fn contains(&self, id: &WalSegmentId) -> bool {
        self.index.contains(id)
    }

    pub fn get(&self, id: &WalSegmentId) -> Option<&WalSegment> {
        if !self.contains(id) {
            return None;
        }
        self.segments.iter().find(|s| &s.id == id)
    }

    /// The highest identifier held.
    pub fn max_id(&self) -> Option<&WalSegmentId> {
        self.segments.iter().map(|s| &s.id).max()
    }

    /// The most recently added segment.
    pub fn last_added(&self) -> Option<&WalSegment> {
        self.segments.last()
    }

    /// Sum of the known segment sizes.
    pub fn total_size_bytes(&self) -> u64 {
        self.segments.iter().filter_map(|s| s.size_bytes).sum()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WalSegment> {
        self.segments.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &WalSegmentId> {
        self.segments.iter().map(|s| &s.id)
    }
}

impl From<Vec<WalSegment>> for WalSegments {
    fn from(segments: Vec<WalSegment>) -> Self {
        segments.into_iter().collect()
    }
}

impl From<WalSegments> for Vec<WalSegment> {
    fn from(segments: WalSegments) -> Self {
        segments.segments
    }
}

impl FromIterator<WalSegment> for WalSegments {
    fn from_iter<I: IntoIterator<Item = WalSegment>>(iter: I) -> Self {
        let mut segments = WalSegments::new();
        for segment in iter {
            segments.push(segment);
        }
        segments
    }
}

impl IntoIterator for WalSegments {
    type Item = WalSegment;
    type IntoIter = std::vec::IntoIter<WalSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}

impl<'a> IntoIterator for &'a WalSegments {
    type Item = &'a WalSegment;
    type IntoIter = std::slice::Iter<'a, WalSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.iter()
    }
}
