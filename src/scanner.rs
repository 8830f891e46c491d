/*!
 * Directory scanning and parallel capture
 */

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use glob_match::glob_match;
use ignore::WalkBuilder;
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::capture::capture_with;
use crate::config::{FailurePolicy, ScanConfig};
use crate::error::{Result, SnapshotError};
use crate::fileops::{FileSystemOperations, LocalFileSystemOperations};
use crate::types::{FileSnapshot, Snapshot};
use crate::utils::{relative_unix_path, DEFAULT_IGNORE};

/// A file left out of the snapshot under [`FailurePolicy::Skip`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureFailure {
    /// Normalized path relative to the scan root
    pub path: String,
    /// Why the capture failed
    pub error: String,
}

/// Scanner statistics
#[derive(Debug, Clone, Default)]
pub struct ScannerStatistics {
    /// Number of files captured
    pub files_captured: usize,
    /// Files that could not be captured and were skipped
    pub failures: Vec<CaptureFailure>,
}

/// Scanner for directory contents
pub struct Scanner {
    /// Scanner configuration
    config: ScanConfig,
    /// Filesystem reads used for every capture
    ops: Arc<dyn FileSystemOperations>,
    /// Progress bar
    pub progress: Arc<ProgressBar>,
    /// Scanner statistics
    statistics: Arc<Mutex<ScannerStatistics>>,
}

impl Scanner {
    /// Create a new scanner reading from the local filesystem
    pub fn new(config: ScanConfig, progress: Arc<ProgressBar>) -> Self {
        Self::with_operations(config, Arc::new(LocalFileSystemOperations), progress)
    }

    /// Create a scanner that reads attributes through `ops`
    pub fn with_operations(
        config: ScanConfig,
        ops: Arc<dyn FileSystemOperations>,
        progress: Arc<ProgressBar>,
    ) -> Self {
        Self {
            config,
            ops,
            progress,
            statistics: Arc::new(Mutex::new(ScannerStatistics::default())),
        }
    }

    /// Get scanner statistics
    pub fn get_statistics(&self) -> ScannerStatistics {
        self.statistics().clone()
    }

    /// Scan the target directory and return its snapshot
    pub fn scan(&self, name: &str) -> Result<Snapshot> {
        let root = fs::canonicalize(&self.config.target_dir)?;
        let output = self.canonical_output();
        let files = self.collect_files(&root, output.as_deref())?;

        self.progress.set_length(files.len() as u64);
        debug!(root = %root.display(), files = files.len(), "Collected files to capture");

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.config.num_threads)
            .build()
            .map_err(|e| SnapshotError::Config(format!("Failed to build thread pool: {}", e)))?;

        let captured: Vec<FileSnapshot> = pool.install(|| match self.config.failure_policy {
            FailurePolicy::Abort => files
                .par_iter()
                .map(|path| self.capture_file(&root, path))
                .collect::<Result<Vec<_>>>(),
            FailurePolicy::Skip => Ok(files
                .par_iter()
                .filter_map(|path| match self.capture_file(&root, path) {
                    Ok(file) => Some(file),
                    Err(e) => {
                        self.record_failure(relative_unix_path(&root, path), &e);
                        None
                    }
                })
                .collect()),
        })?;

        // Single writer: only this thread touches the snapshot
        let mut snapshot = Snapshot::new(name);
        for file in captured {
            let path = file.path().to_string();
            if snapshot.insert(file).is_some() {
                // Distinct non-UTF-8 names can normalize to the same key
                let error = SnapshotError::file_io(
                    path.clone(),
                    io::Error::new(io::ErrorKind::AlreadyExists, "path collides with another file"),
                );
                self.record_failure(path, &error);
            }
        }

        self.statistics().files_captured = snapshot.len();
        info!(
            snapshot = name,
            files = snapshot.len(),
            root = %root.display(),
            "Captured snapshot"
        );

        Ok(snapshot)
    }

    /// Capture one file under its path relative to the scan root
    fn capture_file(&self, root: &Path, path: &Path) -> Result<FileSnapshot> {
        self.progress.inc(1);

        let logical_path = relative_unix_path(root, path);
        let rule = self.config.rules.rule_for(&logical_path);
        capture_with(
            self.ops.as_ref(),
            path,
            &logical_path,
            rule,
            &self.config.snapshot,
        )
    }

    fn record_failure(&self, path: String, error: &SnapshotError) {
        warn!(path = %path, "Skipping file that could not be captured: {}", error);
        self.statistics().failures.push(CaptureFailure {
            path,
            error: error.to_string(),
        });
    }

    fn statistics(&self) -> MutexGuard<'_, ScannerStatistics> {
        self.statistics.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The output file as an absolute path, resolved against its existing parent
    fn canonical_output(&self) -> Option<PathBuf> {
        let output = self.config.output_file.as_ref()?;
        let file_name = output.file_name()?;
        let parent = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let parent = fs::canonicalize(parent).ok()?;
        Some(parent.join(file_name))
    }

    /// Walk the tree and return the regular files to capture, sorted
    fn collect_files(&self, root: &Path, output: Option<&Path>) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        if self.config.respect_gitignore {
            // Use ignore crate's Walk to handle .gitignore patterns
            let walker = WalkBuilder::new(root)
                .hidden(false)
                .require_git(false)
                .filter_entry(|e| !is_default_ignored(e.path()))
                .build();

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().map_or(false, |ft| ft.is_file()) {
                            files.push(entry.into_path());
                        }
                    }
                    Err(e) => self.walk_error(root, None, e.to_string())?,
                }
            }
        } else {
            // Use walkdir when not respecting .gitignore
            let walker = WalkDir::new(root)
                .min_depth(1)
                .into_iter()
                .filter_entry(|e| !is_default_ignored(e.path()));

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() {
                            files.push(entry.into_path());
                        }
                    }
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf);
                        self.walk_error(root, path.as_deref(), e.to_string())?
                    }
                }
            }
        }

        // Never capture the snapshot file being written
        files.retain(|p| {
            Some(p.as_path()) != output && !self.should_ignore(p) && self.should_include(p)
        });
        files.sort();
        Ok(files)
    }

    /// Apply the failure policy to an entry the walker could not read
    fn walk_error(&self, root: &Path, path: Option<&Path>, message: String) -> Result<()> {
        let path = path
            .map(|p| relative_unix_path(root, p))
            .unwrap_or_default();
        let error =
            SnapshotError::file_io(path.clone(), io::Error::new(io::ErrorKind::Other, message));
        match self.config.failure_policy {
            FailurePolicy::Abort => Err(error),
            FailurePolicy::Skip => {
                self.record_failure(path, &error);
                Ok(())
            }
        }
    }

    /// Check if a file should be ignored based on patterns
    pub fn should_ignore(&self, path: &Path) -> bool {
        let file_name = path.file_name().unwrap_or_default().to_string_lossy();

        // Check custom ignore patterns
        if self
            .config
            .ignore_patterns
            .iter()
            .any(|pattern| glob_match(pattern, &file_name))
        {
            return true;
        }

        false
    }

    /// Check if a file should be included based on patterns
    pub fn should_include(&self, path: &Path) -> bool {
        // If no include patterns, include everything
        if self.config.include_patterns.is_empty() {
            return true;
        }

        let file_name = path.file_name().unwrap_or_default().to_string_lossy();
        self.config
            .include_patterns
            .iter()
            .any(|pattern| glob_match(pattern, &file_name))
    }
}

fn is_default_ignored(path: &Path) -> bool {
    let file_name = path.file_name().unwrap_or_default().to_string_lossy();
    DEFAULT_IGNORE
        .iter()
        .any(|pattern| glob_match(pattern, &file_name))
}
