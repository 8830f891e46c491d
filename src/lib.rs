/*!
 * dirsnap - Capture, persist and compare file attribute snapshots
 *
 * This library records a configurable set of attributes (size, modification
 * time, MD5 checksum, permissions) for every file under a directory, stores
 * the capture as XML and reports which files differ between two captures.
 */

pub mod capture;
pub mod compare;
pub mod config;
pub mod error;
pub mod fileops;
pub mod reader;
pub mod report;
pub mod rules;
pub mod scanner;
pub mod types;
pub mod utils;
pub mod writer;

#[cfg(test)]
mod tests;

// Re-export main components for easier access
pub use capture::{capture, capture_with};
pub use compare::{compare_files, compare_snapshots, Comparator};
pub use config::{FailurePolicy, ScanConfig, SnapshotConfiguration};
pub use error::{Result, SnapshotError};
pub use fileops::{FileSystemOperations, LocalFileSystemOperations};
pub use reader::XmlReader;
pub use report::{ReportFormat, Reporter};
pub use rules::{should_check, FindRule, RuleDecision, RuleSet};
pub use scanner::{CaptureFailure, Scanner, ScannerStatistics};
pub use types::{
    Attribute, Difference, EqualityReport, FileSnapshot, FileTrace, HashMode, Snapshot,
};
pub use writer::XmlWriter;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
