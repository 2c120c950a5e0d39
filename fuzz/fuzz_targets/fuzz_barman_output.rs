// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for barman output and metadata parsers

#![no_main]

use libfuzzer_sys::fuzz_target;
use pgarchive_barman::parse;
use pgarchive_catalog::BackupRecord;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let lines: Vec<&str> = s.lines().collect();

        let _ = parse::parse_list_server_lines(&lines);
        let _ = parse::parse_show_server_lines("fuzz", &lines);
        let _ = parse::parse_backup_list(&lines);
        let _ = parse::parse_wal_files_list(&lines);
        let _ = parse::parse_xlog_db(&lines);

        let mut backup = BackupRecord::new();
        let _ = parse::parse_backup_info(&mut backup, &lines);
    }
});
