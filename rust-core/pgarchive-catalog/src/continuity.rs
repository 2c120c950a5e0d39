// SPDX-License-Identifier: PMPL-1.0-or-later
//! WAL continuity: which segments a backup needs, and which are absent.
//!
//! Segments live in per-xlog buckets numbered `00`..`FE`. The expected range
//! walks that lattice from the backup's first segment to an upper bound,
//! stopping early in the bound's bucket once the bound itself is produced.

use tracing::trace;

use crate::error::{CatalogError, CatalogResult};
use crate::segment::{WalSegmentId, WalSegments, MAX_SEGMENT_NUMBER};

/// Most xlog buckets one expected range may cover. 4096 buckets of 255
/// 16 MiB segments is about 16 TiB of WAL.
pub const MAX_XLOG_SPAN: u32 = 4096;

/// Every segment from `begin` through `last`, both inclusive, in ascending
/// order.
///
/// Candidates are generated on `begin`'s timeline. In each xlog bucket
/// enumeration stops as soon as a candidate equals `last`; a bound that is
/// never produced (another timeline, segment `FF`) therefore runs every
/// bucket through `FE`. An empty range is returned if `last` lies in an
/// earlier xlog than `begin`, and an error if the range would cover more
/// than [`MAX_XLOG_SPAN`] buckets.
pub fn expected_range(
    begin: &WalSegmentId,
    last: &WalSegmentId,
) -> CatalogResult<Vec<WalSegmentId>> {
    let begin_xlog = begin.xlog_number()?;
    let begin_segment = begin.segment_number()?;
    let last_xlog = last.xlog_number()?;

    let buckets = u64::from(last_xlog).saturating_sub(u64::from(begin_xlog)) + 1;
    if buckets > u64::from(MAX_XLOG_SPAN) {
        return Err(CatalogError::RangeTooLarge {
            begin: begin.name(),
            last: last.name(),
            buckets,
            limit: MAX_XLOG_SPAN,
        });
    }

    let mut range = Vec::new();
    for xlog in begin_xlog..=last_xlog {
        let start = if xlog == begin_xlog { begin_segment } else { 0 };
        for segment in start..=MAX_SEGMENT_NUMBER {
            let candidate = begin.on_same_timeline(xlog, segment);
            let reached_bound = candidate == *last;
            range.push(candidate);
            if reached_bound {
                break;
            }
        }
    }

    trace!(
        begin = %begin,
        last = %last,
        expected = range.len(),
        "Derived expected WAL range"
    );
    Ok(range)
}

/// The members of `expected` that are not held in `held`, order preserved.
pub fn missing_from(expected: Vec<WalSegmentId>, held: &WalSegments) -> Vec<WalSegmentId> {
    let missing: Vec<WalSegmentId> = expected
        .into_iter()
        .filter(|id| !held.contains(id))
        .collect();
    trace!(missing = missing.len(), "Diffed expected WAL range against held segments");
    missing
}
