// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for WAL segment name and backup id parsing

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgarchive_catalog::{parse_timestamp, to_bytes, BackupId, WalSegmentId};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Accepted names must round-trip and have a successor or overflow
        // cleanly.
        if let Ok(id) = WalSegmentId::parse(s) {
            let reparsed = WalSegmentId::parse(&id.name()).expect("canonical name parses");
            assert_eq!(id, reparsed);
            let _ = id.successor();
        }

        if let Ok(id) = BackupId::parse(s) {
            assert_eq!(id.as_str(), s);
        }

        let _ = parse_timestamp(s);

        if let Some((magnitude, unit)) = s.split_once(' ') {
            if let Ok(magnitude) = magnitude.parse::<f64>() {
                let _ = to_bytes(magnitude, unit);
            }
        }
    }
});
