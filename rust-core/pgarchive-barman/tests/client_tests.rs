// SPDX-License-Identifier: PMPL-1.0-or-later
//! Client tests against a scripted barman and a temporary barman home

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use pgarchive_barman::{
    BarmanClient, BarmanConfig, BarmanError, BarmanResult, CommandRunner, ExitCode,
    FetchOptions, RecoveryOptions,
};
use pgarchive_catalog::{BackupStatus, CatalogError, Compression, WalSegmentId};
use tempfile::TempDir;

const SERVER: &str = "test";
const OLDER: &str = "20130225T192654";
const NEWER: &str = "20130304T080002";

/// Answers known command lines with canned output and records every call.
#[derive(Default)]
struct ScriptedRunner {
    responses: HashMap<String, Vec<String>>,
    calls: RefCell<Vec<(String, bool)>>,
}

impl ScriptedRunner {
    fn respond(mut self, command: &str, lines: &[&str]) -> Self {
        self.responses.insert(
            command.to_string(),
            lines.iter().map(|line| line.to_string()).collect(),
        );
        self
    }

    fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|(command, _)| command.clone()).collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, args: &[String], abort_on_error: bool) -> BarmanResult<Vec<String>> {
        let command = args.join(" ");
        self.calls.borrow_mut().push((command.clone(), abort_on_error));
        self.responses
            .get(&command)
            .cloned()
            .ok_or(BarmanError::CommandFailed {
                command,
                status: ExitCode(Some(1)),
                stderr: "unexpected command".to_string(),
            })
    }
}

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn backup_info(begin_wal: &str) -> String {
    format!(
        "begin_time=2013-02-25 19:26:54.852814\n\
         begin_wal={begin_wal}\n\
         end_time=2013-02-26 05:50:05.523594\n\
         end_wal=00000001000005A9000000BD\n\
         pgdata=/var/lib/postgresql/9.2/main\n\
         size=233655051378\n\
         status=DONE\n\
         tablespaces=None\n\
         timeline=1\n\
         version=90204\n"
    )
}

/// Barman home with two backups. The older one is complete, the newer one
/// starts two segments before the first archived segment.
fn barman_home() -> TempDir {
    let dir = TempDir::new().unwrap();
    let config = BarmanConfig::default().with_barman_home(dir.path());
    write(
        &config.backup_info_path(SERVER, OLDER),
        &backup_info("00000001000005A9000000BC"),
    );
    write(
        &config.backup_info_path(SERVER, NEWER),
        &backup_info("00000001000005A9000000BA"),
    );
    write(
        &config.xlog_db_path(SERVER),
        "00000001000005A9000000BC\t4684503\t1360568429.0\tbzip2\n\
         00000001000005A9000000BD\t5099998\t1360568442.0\tbzip2\n\
         00000001000005A9000000BD.00000020.backup\t250\t1360568443.0\tNone\n",
    );
    dir
}

fn runner() -> ScriptedRunner {
    let wal_files = [
        "/var/lib/barman/test/wals/00000001000005A9/00000001000005A9000000BC",
        "/var/lib/barman/test/wals/00000001000005A9/00000001000005A9000000BD",
    ];
    ScriptedRunner::default()
        .respond(
            "list-backup test",
            &[
                "test 20130304T080002 - Mon Mar  4 09:12:00 2013 - Size: 1.0 GiB - WAL Size: 10.0 MiB",
                "test 20130225T192654 - Tue Feb 26 05:50:05 2013 - Size: 217.0 GiB - WAL Size: 72.0 GiB",
            ],
        )
        .respond(&format!("list-files --target wal test {OLDER}"), &wal_files)
        .respond(&format!("list-files --target wal test {NEWER}"), &wal_files)
        .respond("list-server", &["test - main database"])
        .respond(
            "show-server test",
            &[
                "Server test:",
                "\tactive: true",
                "\tssh_command: ssh postgres@27.118.19.4",
                "\tserver_txt_version: 9.2.3",
            ],
        )
        .respond("check test", &["Server test:", "\tssh: OK", "\tPostgreSQL: OK"])
}

fn client(home: &TempDir, runner: ScriptedRunner) -> BarmanClient<ScriptedRunner> {
    let config = BarmanConfig::default().with_barman_home(home.path());
    BarmanClient::with_runner(config, runner)
}

#[test]
fn test_backups_are_completed_from_backup_info() {
    let home = barman_home();
    let client = client(&home, runner());

    let catalog = client.backups(SERVER, FetchOptions::default()).unwrap();
    assert_eq!(catalog.len(), 2);

    let older = catalog.find(OLDER).unwrap();
    assert_eq!(older.server_name(), Some(SERVER));
    assert_eq!(older.status(), Some(BackupStatus::Done));
    assert_eq!(older.data_size_bytes(), Some(233_655_051_378));
    assert_eq!(older.wal_size_bytes(), Some(72 * 1024 * 1024 * 1024));
    assert_eq!(older.timeline(), Some(1));
    assert_eq!(older.pg_version(), Some(90204));
    assert!(older.segments().is_empty());

    assert_eq!(catalog.latest().unwrap().id().unwrap().as_str(), NEWER);
    assert_eq!(catalog.oldest().unwrap().id().unwrap().as_str(), OLDER);
    assert_eq!(client.runner().commands(), vec!["list-backup test"]);
}

#[test]
fn test_backup_with_wal_segments() {
    let home = barman_home();
    let client = client(&home, runner());

    let backup = client
        .backup(SERVER, OLDER, FetchOptions::default().with_wal_segments())
        .unwrap();

    assert_eq!(backup.segments().len(), 2);
    assert_eq!(backup.wal_size_bytes(), Some(9_784_501));
    let first = backup.segments().iter().next().unwrap();
    assert_eq!(first.size_bytes(), Some(4_684_503));
    assert_eq!(first.compression(), Some(Compression::Bzip2));
    assert_eq!(first.created_at().unwrap().timestamp(), 1_360_568_429);
    assert!(backup.is_restorable().unwrap());
}

#[test]
fn test_missing_segments_of_newer_backup() {
    let home = barman_home();
    let client = client(&home, runner());

    let backup = client
        .backup(SERVER, NEWER, FetchOptions::default().with_wal_segments())
        .unwrap();

    assert_eq!(
        backup.missing_segments().unwrap(),
        vec![
            WalSegmentId::parse("00000001000005A9000000BA").unwrap(),
            WalSegmentId::parse("00000001000005A9000000BB").unwrap(),
        ]
    );
    assert!(!backup.is_restorable().unwrap());
}

#[test]
fn test_unknown_backup() {
    let home = barman_home();
    let client = client(&home, runner());

    let result = client.backup(SERVER, "20200101T000000", FetchOptions::default());
    assert!(matches!(result, Err(BarmanError::BackupNotFound { .. })));
}

#[test]
fn test_segment_missing_from_xlog_db() {
    let home = barman_home();
    let runner = runner().respond(
        &format!("list-files --target wal test {OLDER}"),
        &["/var/lib/barman/test/wals/00000001000005A9/00000001000005A9000000BE"],
    );
    let client = client(&home, runner);

    let result = client.wal_segments(SERVER, OLDER);
    assert!(matches!(
        result,
        Err(BarmanError::MissingXlogEntry(name)) if name == "00000001000005A9000000BE"
    ));
}

#[test]
fn test_missing_backup_info_is_io_error() {
    let home = TempDir::new().unwrap();
    let client = client(&home, runner());

    let result = client.backups(SERVER, FetchOptions::default());
    assert!(matches!(result, Err(BarmanError::Io { .. })));
}

#[test]
fn test_servers_with_backups() {
    let home = barman_home();
    let client = client(&home, runner());

    let servers = client
        .servers(FetchOptions::default().with_backups())
        .unwrap();
    assert_eq!(servers.len(), 1);

    let server = &servers[0];
    assert_eq!(server.name, SERVER);
    assert_eq!(server.active, Some(true));
    assert_eq!(server.pg_version.as_deref(), Some("9.2.3"));
    assert!(server.is_healthy());
    assert_eq!(server.backups.as_ref().map(|catalog| catalog.len()), Some(2));

    // `check` output is used even when it exits non-zero.
    let calls = client.runner().calls.borrow();
    assert!(calls.contains(&("check test".to_string(), false)));
    assert!(calls.contains(&("show-server test".to_string(), true)));
}

#[test]
fn test_server_without_backups() {
    let home = barman_home();
    let client = client(&home, runner());

    let server = client.server(SERVER, FetchOptions::default()).unwrap();
    assert!(server.backups.is_none());
    assert_eq!(
        client.runner().commands(),
        vec!["show-server test", "check test"]
    );
}

#[test]
fn test_delete_marks_record() {
    let home = barman_home();
    let runner = runner().respond(&format!("delete test {OLDER}"), &[]);
    let client = client(&home, runner);

    let mut backup = client.backup(SERVER, OLDER, FetchOptions::default()).unwrap();
    assert!(!backup.is_deleted());
    client.delete(&mut backup).unwrap();
    assert!(backup.is_deleted());
    assert!(client
        .runner()
        .commands()
        .contains(&format!("delete test {OLDER}")));
}

#[test]
fn test_delete_needs_key() {
    let home = barman_home();
    let client = client(&home, runner());

    let mut backup = pgarchive_catalog::BackupRecord::new();
    let result = client.delete(&mut backup);
    assert!(matches!(
        result,
        Err(BarmanError::Catalog(CatalogError::MissingField(_)))
    ));
    assert!(!backup.is_deleted());
    assert!(client.runner().commands().is_empty());
}

#[test]
fn test_failed_delete_keeps_record() {
    let home = barman_home();
    let client = client(&home, runner());

    let mut backup = client.backup(SERVER, OLDER, FetchOptions::default()).unwrap();
    assert!(client.delete(&mut backup).is_err());
    assert!(!backup.is_deleted());
}

#[test]
fn test_create_returns_latest_with_segments() {
    let home = barman_home();
    let runner = runner().respond("backup test", &["Starting backup for server test"]);
    let client = client(&home, runner);

    let backup = client.create(SERVER).unwrap();
    assert_eq!(backup.id().unwrap().as_str(), NEWER);
    assert_eq!(backup.segments().len(), 2);
    assert_eq!(client.runner().commands()[0], "backup test");
}

#[test]
fn test_recover_passes_options_as_arguments() {
    let home = barman_home();
    let command = format!(
        "recover --remote-ssh-command ssh postgres@10.20.20.2 --target-xid 1234 test {OLDER} /var/lib/postgresql/9.2/main"
    );
    let runner = runner().respond(&command, &[]);
    let client = client(&home, runner);

    let backup = client.backup(SERVER, OLDER, FetchOptions::default()).unwrap();
    let options = RecoveryOptions::default()
        .remote_ssh_command("ssh postgres@10.20.20.2")
        .target_xid("1234");
    client
        .recover(&backup, Path::new("/var/lib/postgresql/9.2/main"), &options)
        .unwrap();
    assert!(client.runner().commands().contains(&command));
}
