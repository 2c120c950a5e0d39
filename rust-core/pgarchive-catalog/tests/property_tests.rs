// SPDX-License-Identifier: PMPL-1.0-or-later
//! Property-based tests for the catalog model

use std::cmp::Ordering;

use pgarchive_catalog::{
    expected_range, missing_from, to_bytes, BackupCatalog, BackupRecord, SizeUnit, WalSegment,
    WalSegmentId, WalSegments, MAX_SEGMENT_NUMBER,
};
use proptest::prelude::*;

/// Generate arbitrary canonical segment names
fn arb_segment_name() -> impl Strategy<Value = String> {
    "[0-9A-F]{24}"
}

/// Generate a segment inside the used lattice (segment number <= FE)
fn arb_lattice_segment() -> impl Strategy<Value = WalSegmentId> {
    (1u32..16, 0u32..0x1000, 0u32..=MAX_SEGMENT_NUMBER)
        .prop_map(|(timeline, xlog, segment)| WalSegmentId::from_numbers(timeline, xlog, segment))
}

/// Generate arbitrary backup ids from calendar-valid parts
fn arb_backup_id() -> impl Strategy<Value = String> {
    (2000u32..2030, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60).prop_map(
        |(year, month, day, hour, minute, second)| {
            format!("{year:04}{month:02}{day:02}T{hour:02}{minute:02}{second:02}")
        },
    )
}

fn numeric_value(id: &WalSegmentId) -> u128 {
    u128::from_str_radix(&id.name(), 16).unwrap()
}

proptest! {
    #[test]
    fn test_parse_roundtrips_name(name in arb_segment_name()) {
        let id = WalSegmentId::parse(&name).unwrap();
        let rebuilt = format!("{}{}{}", id.timeline(), id.xlog(), id.segment());
        prop_assert_eq!(rebuilt, name);
    }

    #[test]
    fn test_parse_is_case_insensitive(name in arb_segment_name()) {
        let upper = WalSegmentId::parse(&name).unwrap();
        let lower = WalSegmentId::parse(&name.to_ascii_lowercase()).unwrap();
        prop_assert_eq!(upper, lower);
    }

    #[test]
    fn test_parse_rejects_other_lengths(name in "[0-9A-F]{0,23}|[0-9A-F]{25,40}") {
        prop_assert!(WalSegmentId::parse(&name).is_err());
    }

    #[test]
    fn test_ordering_matches_numeric_value(a in arb_segment_name(), b in arb_segment_name()) {
        let a = WalSegmentId::parse(&a).unwrap();
        let b = WalSegmentId::parse(&b).unwrap();
        prop_assert_eq!(a.cmp(&b), numeric_value(&a).cmp(&numeric_value(&b)));
        prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
    }

    #[test]
    fn test_range_is_successor_chain(begin in arb_lattice_segment(), steps in 0usize..600) {
        let mut chain = vec![begin.clone()];
        for _ in 0..steps {
            let next = chain.last().unwrap().successor().unwrap();
            chain.push(next);
        }
        let last = chain.last().unwrap().clone();

        let range = expected_range(&begin, &last).unwrap();
        prop_assert_eq!(range.len(), steps + 1);
        prop_assert_eq!(range.first(), Some(&begin));
        prop_assert_eq!(range.last(), Some(&last));
        prop_assert_eq!(range, chain);
    }

    #[test]
    fn test_range_is_strictly_ascending(begin in arb_lattice_segment(), steps in 0usize..400) {
        let mut last = begin.clone();
        for _ in 0..steps {
            last = last.successor().unwrap();
        }
        let range = expected_range(&begin, &last).unwrap();
        prop_assert!(range.windows(2).all(|pair| pair[0] < pair[1]));
        prop_assert!(range.iter().all(|id| id.segment_number().unwrap() <= MAX_SEGMENT_NUMBER));
    }

    #[test]
    fn test_missing_is_exactly_the_removed_segments(
        begin in arb_lattice_segment(),
        steps in 1usize..300,
        removals in prop::collection::vec(any::<prop::sample::Index>(), 0..20)
    ) {
        let mut last = begin.clone();
        for _ in 0..steps {
            last = last.successor().unwrap();
        }
        let expected = expected_range(&begin, &last).unwrap();

        // Never remove the bound itself so the range stays the same.
        let mut removed: Vec<WalSegmentId> = removals
            .iter()
            .map(|index| expected[index.index(expected.len() - 1)].clone())
            .collect();
        removed.sort();
        removed.dedup();

        let held: WalSegments = expected
            .iter()
            .filter(|id| !removed.contains(id))
            .cloned()
            .map(WalSegment::new)
            .collect();

        let mut backup = BackupRecord::new();
        backup.set_begin_segment(&begin).unwrap();
        backup.set_segments(held.clone());

        prop_assert_eq!(backup.missing_segments().unwrap(), removed.clone());
        prop_assert_eq!(missing_from(expected, &held), removed);
    }

    #[test]
    fn test_to_bytes_scales_whole_numbers(magnitude in 0u64..(1 << 20), unit_index in 0usize..5) {
        let unit = SizeUnit::ALL[unit_index];
        prop_assert_eq!(
            to_bytes(magnitude as f64, unit.symbol()).unwrap(),
            magnitude * unit.multiplier()
        );
    }

    #[test]
    fn test_catalog_latest_and_oldest_bound_all_ids(ids in prop::collection::vec(arb_backup_id(), 1..20)) {
        let catalog: BackupCatalog = ids
            .iter()
            .map(|id| {
                let mut backup = BackupRecord::new();
                backup.set_id(id).unwrap();
                backup
            })
            .collect();

        let latest = catalog.latest().unwrap().id().unwrap().as_str().to_string();
        let oldest = catalog.oldest().unwrap().id().unwrap().as_str().to_string();
        prop_assert_eq!(&latest, ids.iter().max().unwrap());
        prop_assert_eq!(&oldest, ids.iter().min().unwrap());
    }
}
