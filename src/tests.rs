/*!
 * Scenario tests for dirsnap scanning, persistence and comparison
 */

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use filetime::{set_file_mtime, FileTime};
use indicatif::ProgressBar;
use tempfile::tempdir;

use crate::capture::capture;
use crate::compare::{compare_files, compare_snapshots, Comparator};
use crate::config::{FailurePolicy, ScanConfig, SnapshotConfiguration};
use crate::error::SnapshotError;
use crate::fileops::{FileSystemOperations, LocalFileSystemOperations};
use crate::reader::XmlReader;
use crate::rules::{FindRule, RuleSet};
use crate::scanner::Scanner;
use crate::types::{Attribute, HashMode};
use crate::writer::XmlWriter;

const T1: i64 = 1_600_000_000;
const T2: i64 = 1_700_000_000;

fn write_file(path: &Path, content: &[u8], mtime_secs: i64) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(content)?;
    drop(file);
    set_file_mtime(path, FileTime::from_unix_time(mtime_secs, 0))
}

// Helper function to create a test directory structure
fn setup_test_directory() -> io::Result<tempfile::TempDir> {
    let temp_dir = tempdir()?;

    write_file(&temp_dir.path().join("file1.txt"), b"0123456789", T1)?;
    write_file(&temp_dir.path().join("dir1").join("file2.txt"), b"second", T1)?;
    write_file(
        &temp_dir.path().join("dir1").join("subdir").join("file3.log"),
        b"log line\n",
        T1,
    )?;
    write_file(&temp_dir.path().join("binary.bin"), &[0u8, 1, 2, 3], T1)?;

    // Ignored by default
    write_file(&temp_dir.path().join(".git").join("config"), b"[core]", T1)?;

    Ok(temp_dir)
}

fn scan(config: ScanConfig, name: &str) -> crate::Result<crate::Snapshot> {
    Scanner::new(config, Arc::new(ProgressBar::hidden())).scan(name)
}

#[test]
fn test_basic_scan() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    let snapshot = scan(ScanConfig::new(temp_dir.path()), "A")?;

    let paths: Vec<_> = snapshot.iter().map(|f| f.path().to_string()).collect();
    assert_eq!(
        paths,
        vec![
            "binary.bin",
            "dir1/file2.txt",
            "dir1/subdir/file3.log",
            "file1.txt"
        ]
    );

    let file1 = snapshot.get("file1.txt").unwrap();
    assert_eq!(file1.size(), Some(10));
    assert_eq!(file1.modified(), Some(T1 * 1000));
    assert_eq!(file1.md5(), Some("781e5e245d69b566979b86e28d23f2c7"));
    #[cfg(unix)]
    assert!(file1.permissions().is_some());

    Ok(())
}

#[test]
fn test_ignore_and_include_patterns() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;

    let mut config = ScanConfig::new(temp_dir.path());
    config.ignore_patterns = vec!["*.txt".to_string()];
    let snapshot = scan(config, "ignore")?;
    assert!(snapshot.get("file1.txt").is_none());
    assert!(snapshot.get("binary.bin").is_some());

    let mut config = ScanConfig::new(temp_dir.path());
    config.include_patterns = vec!["*.log".to_string()];
    let snapshot = scan(config, "include")?;
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot.get("dir1/subdir/file3.log").is_some());

    Ok(())
}

#[test]
fn test_respect_gitignore() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    let mut gitignore = File::create(temp_dir.path().join(".gitignore"))?;
    writeln!(gitignore, "*.log")?;
    writeln!(gitignore, "binary.bin")?;

    let mut config = ScanConfig::new(temp_dir.path());
    config.respect_gitignore = true;
    let snapshot = scan(config, "git")?;

    assert!(snapshot.get("binary.bin").is_none());
    assert!(snapshot.get("dir1/subdir/file3.log").is_none());
    assert!(snapshot.get("file1.txt").is_some());
    assert!(snapshot.get(".gitignore").is_some());

    Ok(())
}

#[test]
fn test_rules_apply_per_path() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;

    let mut config = ScanConfig::new(temp_dir.path());
    config.snapshot = SnapshotConfiguration::default().with_check(Attribute::Md5, false);
    config.rules = RuleSet::new()
        .with_rule("*.log", FindRule::new().skip(Attribute::Size))
        .with_rule("dir1/*.txt", FindRule::new().check(Attribute::Md5));
    let snapshot = scan(config, "rules")?;

    let log = snapshot.get("dir1/subdir/file3.log").unwrap();
    assert_eq!(log.size(), None);
    assert_eq!(log.md5(), None);

    let forced = snapshot.get("dir1/file2.txt").unwrap();
    assert!(forced.md5().is_some());
    assert_eq!(forced.size(), Some(6));

    assert_eq!(snapshot.get("file1.txt").unwrap().md5(), None);
    Ok(())
}

#[test]
fn test_output_file_is_not_captured() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    let output = temp_dir.path().join("snap.xml");
    File::create(&output)?;

    let mut config = ScanConfig::new(temp_dir.path());
    config.output_file = Some(output);
    let snapshot = scan(config, "A")?;

    assert!(snapshot.get("snap.xml").is_none());
    Ok(())
}

#[test]
fn test_file_named_like_output_elsewhere_is_captured() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    write_file(&temp_dir.path().join("sub/snap.xml"), b"<data/>", T1)?;
    let out_dir = tempdir()?;

    let mut config = ScanConfig::new(temp_dir.path());
    config.output_file = Some(out_dir.path().join("snap.xml"));
    let snapshot = scan(config, "A")?;

    assert!(snapshot.get("sub/snap.xml").is_some());
    Ok(())
}

#[test]
fn test_save_load_compare_identical() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    let out_dir = tempdir()?;
    let output = out_dir.path().join("before.xml");

    let before = scan(ScanConfig::new(temp_dir.path()), "before")?;
    XmlWriter::new().write_to_path(&before, &output)?;
    let loaded = XmlReader::new().read_from_path(&output)?;
    assert_eq!(loaded, before);

    let now = scan(ScanConfig::new(temp_dir.path()), "now")?;
    let report = compare_snapshots(&loaded, &now);
    assert!(report.is_equal(), "unexpected differences: {:?}", report);

    Ok(())
}

#[test]
fn test_edit_add_remove_are_reported() -> crate::Result<()> {
    let temp_dir = setup_test_directory()?;
    let before = scan(ScanConfig::new(temp_dir.path()), "before")?;

    write_file(&temp_dir.path().join("file1.txt"), b"01234567890123456789", T2)?;
    fs::remove_file(temp_dir.path().join("binary.bin"))?;
    write_file(&temp_dir.path().join("new.txt"), b"new", T2)?;
    let after = scan(ScanConfig::new(temp_dir.path()), "after")?;

    let report = compare_snapshots(&before, &after);
    assert_eq!(report.traces.len(), 1);
    assert_eq!(report.only_in_left, vec!["binary.bin".to_string()]);
    assert_eq!(report.only_in_right, vec!["new.txt".to_string()]);

    let trace = report.trace_for("file1.txt").unwrap();
    let attributes: Vec<_> = trace.differences.iter().map(|d| d.attribute).collect();
    assert_eq!(
        attributes,
        vec![Attribute::Size, Attribute::ModificationTime, Attribute::Md5]
    );

    Ok(())
}

// Capture one file, edit it, capture again: size, time and hash differ, permissions do not
#[test]
fn test_single_file_edit_scenario() -> crate::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("a.txt");
    write_file(&path, b"0123456789", T1)?;

    let config = SnapshotConfiguration::default();
    let entry_a = capture(&path, None, &config)?;
    write_file(&path, b"abcdefghijabcdefghij", T2)?;
    let entry_b = capture(&path, None, &config)?;

    assert_eq!(entry_a.size(), Some(10));
    assert_eq!(entry_b.size(), Some(20));

    let trace = compare_files("A", &entry_a, "B", &entry_b).unwrap();
    assert_eq!(trace.differences.len(), 3);
    assert_eq!(trace.difference(Attribute::Size).unwrap().left, "10");
    assert_eq!(trace.difference(Attribute::Size).unwrap().right, "20");
    assert_eq!(
        trace.difference(Attribute::ModificationTime).unwrap().right,
        (T2 * 1000).to_string()
    );
    assert!(trace.difference(Attribute::Md5).is_some());
    assert!(trace.difference(Attribute::Permissions).is_none());

    Ok(())
}

#[test]
fn test_global_disable_suppresses_hash_difference() -> crate::Result<()> {
    let temp_dir = tempdir()?;
    let left = temp_dir.path().join("left").join("f.txt");
    let right = temp_dir.path().join("right").join("f.txt");
    write_file(&left, b"aaaa", T1)?;
    write_file(&right, b"bbbb", T1)?;

    let mut config = ScanConfig::new(temp_dir.path().join("left"));
    config.snapshot = SnapshotConfiguration::default().with_check(Attribute::Md5, false);
    let left_snapshot = scan(config.clone(), "L")?;
    config.target_dir = temp_dir.path().join("right");
    let right_snapshot = scan(config, "R")?;

    assert!(compare_snapshots(&left_snapshot, &right_snapshot).is_equal());
    Ok(())
}

#[test]
fn test_rule_skip_with_live_comparison() -> crate::Result<()> {
    let temp_dir = tempdir()?;
    let left = temp_dir.path().join("left").join("data.bin");
    let right = temp_dir.path().join("right").join("data.bin");
    write_file(&left, b"aaaa", T1)?;
    write_file(&right, b"aaaaaaaa", T1)?;

    // Capture everything, compare under a policy that skips size and hash for *.bin
    let left_snapshot = scan(ScanConfig::new(temp_dir.path().join("left")), "L")?;
    let right_snapshot = scan(ScanConfig::new(temp_dir.path().join("right")), "R")?;
    assert!(!compare_snapshots(&left_snapshot, &right_snapshot).is_equal());

    let rules = RuleSet::new().with_rule(
        "*.bin",
        FindRule::new().skip(Attribute::Size).skip(Attribute::Md5),
    );
    let comparator = Comparator::new(SnapshotConfiguration::default(), rules);
    assert!(comparator
        .compare_snapshots(&left_snapshot, &right_snapshot)
        .is_equal());
    Ok(())
}

#[test]
fn test_text_mode_ignores_line_endings() -> crate::Result<()> {
    let temp_dir = tempdir()?;
    let unix = temp_dir.path().join("unix.txt");
    let dos = temp_dir.path().join("dos.txt");
    write_file(&unix, b"one\ntwo\n", T1)?;
    write_file(&dos, b"one\r\ntwo\r\n", T1)?;

    let ops = LocalFileSystemOperations::new();
    assert_ne!(
        ops.compute_hash(&unix, HashMode::Binary)?,
        ops.compute_hash(&dos, HashMode::Binary)?
    );
    assert_eq!(
        ops.compute_hash(&unix, HashMode::Text)?,
        ops.compute_hash(&dos, HashMode::Text)?
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_failure_policies() -> crate::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = setup_test_directory()?;
    let locked = temp_dir.path().join("locked.txt");
    write_file(&locked, b"secret", T1)?;
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))?;

    // Root can read anything; nothing to test then
    if File::open(&locked).is_ok() {
        return Ok(());
    }

    let err = scan(ScanConfig::new(temp_dir.path()), "abort").unwrap_err();
    assert!(matches!(err, SnapshotError::FileIo { .. }));

    let mut config = ScanConfig::new(temp_dir.path());
    config.failure_policy = FailurePolicy::Skip;
    let scanner = Scanner::new(config, Arc::new(ProgressBar::hidden()));
    let snapshot = scanner.scan("skip")?;

    assert!(snapshot.get("locked.txt").is_none());
    assert!(snapshot.get("file1.txt").is_some());
    let stats = scanner.get_statistics();
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].path, "locked.txt");
    assert_eq!(stats.files_captured, snapshot.len());

    Ok(())
}

#[test]
fn test_scan_missing_directory_fails() {
    let result = scan(ScanConfig::new("/definitely/not/a/dir"), "missing");
    assert!(matches!(result, Err(SnapshotError::Io(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn test_colliding_non_utf8_names_are_reported() -> crate::Result<()> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = tempdir()?;
    File::create(temp_dir.path().join(OsStr::from_bytes(b"name\xfe")))?;
    File::create(temp_dir.path().join(OsStr::from_bytes(b"name\xff")))?;

    let scanner = Scanner::new(
        ScanConfig::new(temp_dir.path()),
        Arc::new(ProgressBar::hidden()),
    );
    let snapshot = scanner.scan("A")?;
    let stats = scanner.get_statistics();

    assert_eq!(snapshot.len(), 1);
    assert_eq!(stats.failures.len(), 1);
    assert_eq!(stats.failures[0].path, "name\u{FFFD}");
    Ok(())
}
