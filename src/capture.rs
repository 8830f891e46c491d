/*!
 * Capturing the attributes of a single file
 */

use std::path::Path;

use tracing::debug;

use crate::config::SnapshotConfiguration;
use crate::error::Result;
use crate::fileops::{FileSystemOperations, LocalFileSystemOperations};
use crate::rules::{should_check, FindRule};
use crate::types::{Attribute, FileSnapshot};

/// Capture `path` from the local filesystem, recording it under its own normalized path
pub fn capture(
    path: &Path,
    rule: Option<&FindRule>,
    config: &SnapshotConfiguration,
) -> Result<FileSnapshot> {
    capture_with(
        &LocalFileSystemOperations,
        path,
        &path.to_string_lossy(),
        rule,
        config,
    )
}

/// Capture the file at `fs_path`, recording it as `logical_path`.
///
/// Only attributes resolved enabled are read. Unsupported permissions are
/// left unknown; any other read failure fails the capture.
pub fn capture_with<O: FileSystemOperations + ?Sized>(
    ops: &O,
    fs_path: &Path,
    logical_path: &str,
    rule: Option<&FindRule>,
    config: &SnapshotConfiguration,
) -> Result<FileSnapshot> {
    let enabled = |attribute| should_check(attribute, rule, config);
    let mut file = FileSnapshot::new(logical_path);

    if enabled(Attribute::Size) {
        file = file.with_size(Some(ops.size(fs_path)?));
    }
    if enabled(Attribute::ModificationTime) {
        file = file.with_modified(Some(ops.modification_time(fs_path)?));
    }
    if enabled(Attribute::Md5) {
        file = file.with_md5(Some(ops.compute_hash(fs_path, config.hash_mode())?));
    }
    if enabled(Attribute::Permissions) {
        match ops.permissions(fs_path) {
            Ok(permissions) => file = file.with_permissions(Some(permissions)),
            Err(e) if e.is_not_supported() => {
                debug!(
                    path = file.path(),
                    "skipping file permissions, not supported by this OS"
                );
            }
            Err(e) => return Err(e),
        }
    }

    debug!("Captured {}", file);
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::SnapshotError;
    use crate::types::HashMode;

    /// Canned attribute values with a counter for hash reads
    struct FakeOps {
        permissions_supported: bool,
        permissions_fail: bool,
        hash_calls: AtomicUsize,
    }

    impl FakeOps {
        fn new() -> Self {
            Self {
                permissions_supported: true,
                permissions_fail: false,
                hash_calls: AtomicUsize::new(0),
            }
        }
    }

    impl FileSystemOperations for FakeOps {
        fn size(&self, _: &Path) -> Result<u64> {
            Ok(10)
        }

        fn modification_time(&self, _: &Path) -> Result<i64> {
            Ok(1_700_000_000_000)
        }

        fn compute_hash(&self, _: &Path, mode: HashMode) -> Result<String> {
            self.hash_calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("abc-{}", mode))
        }

        fn permissions(&self, path: &Path) -> Result<String> {
            if self.permissions_fail {
                return Err(SnapshotError::file_io(
                    path.to_string_lossy(),
                    io::Error::from(io::ErrorKind::PermissionDenied),
                ));
            }
            if !self.permissions_supported {
                return Err(SnapshotError::AttributeNotSupported {
                    attribute: Attribute::Permissions,
                    path: path.to_string_lossy().to_string(),
                });
            }
            Ok("644".to_string())
        }
    }

    fn capture_fake(
        ops: &FakeOps,
        rule: Option<&FindRule>,
        config: &SnapshotConfiguration,
    ) -> Result<FileSnapshot> {
        capture_with(ops, Path::new("/tmp/a.txt"), "/tmp/a.txt", rule, config)
    }

    #[test]
    fn test_capture_all_attributes() -> Result<()> {
        let ops = FakeOps::new();
        let file = capture_fake(&ops, None, &SnapshotConfiguration::default())?;

        assert_eq!(file.path(), "/tmp/a.txt");
        assert_eq!(file.size(), Some(10));
        assert_eq!(file.modified(), Some(1_700_000_000_000));
        assert_eq!(file.md5(), Some("abc-binary"));
        assert_eq!(file.permissions(), Some("644"));
        Ok(())
    }

    #[test]
    fn test_disabled_hash_is_never_computed() -> Result<()> {
        let ops = FakeOps::new();
        let config = SnapshotConfiguration::default().with_check(Attribute::Md5, false);
        let file = capture_fake(&ops, None, &config)?;

        assert_eq!(file.md5(), None);
        assert_eq!(ops.hash_calls.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[test]
    fn test_rule_forces_hash_in_text_mode() -> Result<()> {
        let ops = FakeOps::new();
        let config = SnapshotConfiguration::default()
            .with_check(Attribute::Md5, false)
            .with_hash_mode(HashMode::Text);
        let rule = FindRule::new().check(Attribute::Md5).skip(Attribute::Size);
        let file = capture_fake(&ops, Some(&rule), &config)?;

        assert_eq!(file.md5(), Some("abc-text"));
        assert_eq!(file.size(), None);
        Ok(())
    }

    #[test]
    fn test_unsupported_permissions_never_fail() -> Result<()> {
        let ops = FakeOps {
            permissions_supported: false,
            ..FakeOps::new()
        };
        let file = capture_fake(&ops, None, &SnapshotConfiguration::default())?;

        assert_eq!(file.permissions(), None);
        assert_eq!(file.size(), Some(10));
        Ok(())
    }

    #[test]
    fn test_other_permission_failures_propagate() {
        let ops = FakeOps {
            permissions_fail: true,
            ..FakeOps::new()
        };
        let err = capture_fake(&ops, None, &SnapshotConfiguration::default()).unwrap_err();
        assert!(matches!(err, SnapshotError::FileIo { .. }));
    }

    #[test]
    fn test_ops_usable_through_trait_object() -> Result<()> {
        let ops: Box<dyn FileSystemOperations> = Box::new(FakeOps::new());
        let file = capture_with(
            ops.as_ref(),
            Path::new("C:\\data\\x.txt"),
            "data\\x.txt",
            None,
            &SnapshotConfiguration::default(),
        )?;
        assert_eq!(file.path(), "data/x.txt");
        Ok(())
    }

    #[test]
    fn test_capture_missing_local_file_fails() {
        let err = capture(
            Path::new("/no/such/dir/file.txt"),
            None,
            &SnapshotConfiguration::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SnapshotError::FileIo { .. }));
    }
}
