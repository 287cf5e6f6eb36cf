use gaitstore_backup::{BackupKind, BackupManager, BackupRequest};
use gaitstore_config::ConfigBuilder;
use gaitstore_core::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

struct Fixture {
    temp: TempDir,
    database: PathBuf,
    storage: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let database = temp.path().join("data").join("gaitstore.db");
        let storage = temp.path().join("data").join("storage");
        fs::create_dir_all(storage.join("pose_results").join("gavd")).unwrap();
        fs::write(&database, b"SQLite format 3\0fake pages").unwrap();
        fs::write(
            storage.join("pose_results").join("gavd").join("s1.json"),
            br#"{"cadence":110}"#,
        )
        .unwrap();
        fs::write(storage.join("pose_results").join("gavd").join("s1.meta.json"), b"{}").unwrap();
        Self {
            temp,
            database,
            storage,
        }
    }

    fn manager(&self) -> BackupManager {
        BackupManager::open(self.temp.path().join("backups")).unwrap()
    }

    fn request(&self, compress: bool) -> BackupRequest {
        BackupRequest::new(
            BackupKind::Full,
            vec![self.database.clone(), self.storage.clone()],
        )
        .compress(compress)
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.temp.path().join(relative)
    }
}

fn flip_first_byte(path: &Path) {
    let mut bytes = fs::read(path).unwrap();
    bytes[0] ^= 0xff;
    fs::write(path, bytes).unwrap();
}

#[test]
fn test_compressed_backup_verifies_after_create() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(true)).unwrap();

    assert!(backup.name.starts_with("full_"));
    assert!(backup.compressed);
    assert!(backup.verified);
    assert_eq!(backup.files_backed_up, 3);
    assert!(manager
        .root()
        .join(format!("{}.tar.gz", backup.name))
        .exists());

    let report = manager.verify_backup(&backup.name).unwrap();
    assert!(report.is_valid());
    assert!(report.checksum_matches());
    assert_eq!(report.actual_files, None);
}

#[test]
fn test_uncompressed_backup_copies_each_source() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(false)).unwrap();

    let dir = manager.root().join(&backup.name);
    assert!(dir.join("gaitstore.db").is_file());
    assert!(dir.join("storage/pose_results/gavd/s1.json").is_file());
    assert_eq!(backup.files_backed_up, 3);
    assert_eq!(backup.artifacts.len(), 2);

    let report = manager.verify_backup(&backup.name).unwrap();
    assert_eq!(report.actual_files, Some(3));
    assert!(report.is_valid());
}

#[test]
fn test_single_byte_change_fails_verification() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(false)).unwrap();

    flip_first_byte(
        &manager
            .root()
            .join(&backup.name)
            .join("storage/pose_results/gavd/s1.json"),
    );

    let report = manager.verify_backup(&backup.name).unwrap();
    assert!(!report.is_valid());
    assert!(!report.checksum_matches());
    assert!(!manager.get_backup(&backup.name).unwrap().verified);
}

#[test]
fn test_corrupt_archive_blocks_verified_restore() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(true)).unwrap();
    flip_first_byte(&manager.root().join(format!("{}.tar.gz", backup.name)));

    let destination = fixture.path("restore");
    let err = manager
        .restore_backup(&backup.name, &destination, true)
        .unwrap_err();
    assert!(matches!(err, Error::Integrity { .. }), "{err}");
    assert!(!destination.exists());
}

#[test]
fn test_compressed_restore_extracts_into_destination() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(true)).unwrap();

    let destination = fixture.path("restore");
    let restored = manager
        .restore_backup(&backup.name, &destination, true)
        .unwrap();
    assert_eq!(restored, 2);
    assert_eq!(
        fs::read(destination.join("storage/pose_results/gavd/s1.json")).unwrap(),
        br#"{"cadence":110}"#
    );
    assert!(destination.join("gaitstore.db").is_file());
}

#[test]
fn test_uncompressed_restore_replaces_conflicting_subtree() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(false)).unwrap();

    let destination = fixture.path("restore");
    let stale = destination.join("storage").join("stale");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("old.json"), b"{}").unwrap();
    fs::write(destination.join("unrelated.txt"), b"keep me").unwrap();

    manager
        .restore_backup(&backup.name, &destination, false)
        .unwrap();

    assert!(!stale.exists());
    assert!(destination
        .join("storage/pose_results/gavd/s1.json")
        .is_file());
    assert_eq!(
        fs::read(destination.join("unrelated.txt")).unwrap(),
        b"keep me"
    );
}

#[test]
fn test_delete_removes_artifacts_and_entry() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let compressed = manager.create_backup(&fixture.request(true)).unwrap();
    let plain = manager.create_backup(&fixture.request(false)).unwrap();

    assert!(manager.delete_backup(&compressed.name).unwrap());
    assert!(manager.delete_backup(&plain.name).unwrap());
    assert!(!manager.root().join(&plain.name).exists());
    assert!(manager.list_backups().is_empty());
    assert!(!manager.delete_backup(&plain.name).unwrap());

    let reopened = fixture.manager();
    assert!(reopened.manifest().backups.is_empty());
}

#[test]
fn test_missing_backup_is_not_found() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    assert!(manager.verify_backup("full_19700101_000000").unwrap_err().is_not_found());
    assert!(manager
        .restore_backup("full_19700101_000000", &fixture.path("restore"), false)
        .unwrap_err()
        .is_not_found());
}

#[test]
fn test_sources_are_validated() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();

    let empty = BackupRequest::new(BackupKind::Custom, Vec::new());
    assert!(matches!(
        manager.create_backup(&empty).unwrap_err(),
        Error::Configuration { .. }
    ));

    let missing = BackupRequest::new(BackupKind::Custom, vec![fixture.path("nope")]);
    assert!(manager.create_backup(&missing).unwrap_err().is_not_found());

    let other = fixture.path("elsewhere").join("storage");
    fs::create_dir_all(&other).unwrap();
    let clash = BackupRequest::new(BackupKind::Custom, vec![fixture.storage.clone(), other]);
    assert!(matches!(
        manager.create_backup(&clash).unwrap_err(),
        Error::Configuration { .. }
    ));
    assert!(manager.list_backups().is_empty());
}

#[test]
fn test_statistics_and_listing_order() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let first = manager.create_backup(&fixture.request(true)).unwrap();
    let second = manager
        .create_backup(&fixture.request(false).verify(false))
        .unwrap();

    let listed: Vec<_> = manager.list_backups().iter().map(|b| b.name.clone()).collect();
    assert_eq!(listed, [second.name.clone(), first.name.clone()]);

    let stats = manager.statistics();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.verified, 1);
    assert_eq!(stats.compressed, 1);
    assert_eq!(stats.last_backup, Some(second.created_at));
    assert_eq!(
        stats.total_size_bytes,
        first.total_size_bytes + second.total_size_bytes
    );
}

#[test]
fn test_config_drives_root_sources_and_retention() {
    let fixture = Fixture::new();
    let config = ConfigBuilder::new()
        .data_dir(fixture.path("data"))
        .retention_days(14)
        .build()
        .unwrap();

    let mut manager = BackupManager::from_config(&config).unwrap();
    assert_eq!(manager.root(), config.backup_root());
    assert_eq!(manager.statistics().retention_days, 14);

    let request = BackupRequest::from_config(&config, BackupKind::Database);
    assert_eq!(request.sources, vec![config.database_path()]);
    let backup = manager.create_backup(&request).unwrap();
    assert_eq!(backup.kind, BackupKind::Database);
    assert_eq!(backup.files_backed_up, 1);
}

#[test]
fn test_restore_with_missing_artifact_keeps_live_data() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(false)).unwrap();
    fs::remove_dir_all(manager.root().join(&backup.name).join("storage")).unwrap();

    let destination = fixture.path("restore");
    fs::create_dir_all(destination.join("storage")).unwrap();
    fs::write(destination.join("storage").join("live.json"), b"precious").unwrap();

    let err = manager
        .restore_backup(&backup.name, &destination, false)
        .unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert_eq!(
        fs::read(destination.join("storage").join("live.json")).unwrap(),
        b"precious"
    );
    assert!(!destination.join("gaitstore.db").exists());
}

#[test]
fn test_restore_leaves_no_staging_entries() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let backup = manager.create_backup(&fixture.request(false)).unwrap();

    let destination = fixture.path("restore");
    manager
        .restore_backup(&backup.name, &destination, true)
        .unwrap();

    let mut names: Vec<_> = fs::read_dir(&destination)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["gaitstore.db", "storage"]);
}

#[test]
fn test_compressed_size_counts_source_bytes() {
    let fixture = Fixture::new();
    let mut manager = fixture.manager();
    let compressed = manager.create_backup(&fixture.request(true)).unwrap();
    let plain = manager.create_backup(&fixture.request(false)).unwrap();

    let source_bytes = fs::metadata(&fixture.database).unwrap().len()
        + br#"{"cadence":110}"#.len() as u64
        + b"{}".len() as u64;
    assert_eq!(plain.total_size_bytes, source_bytes);
    assert_eq!(compressed.total_size_bytes, source_bytes);
}
