/*!
 * Utility functions for dirsnap
 */

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;

use crate::error::{Result, SnapshotError};

/// Normalize a path to forward slashes with no duplicate or trailing separators
pub fn normalize_unix_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len());
    let mut last_was_slash = false;

    for c in path.chars() {
        let c = if c == '\\' { '/' } else { c };
        if c == '/' {
            if last_was_slash {
                continue;
            }
            last_was_slash = true;
        } else {
            last_was_slash = false;
        }
        normalized.push(c);
    }

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }
    normalized
}

/// Normalized path of `path` relative to `root`
pub fn relative_unix_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    normalize_unix_path(&relative.to_string_lossy())
}

/// Render epoch milliseconds in the snapshot timestamp format
///
/// Values chrono cannot represent fall back to the plain integer, which
/// [`parse_timestamp`] also accepts.
pub fn format_timestamp(millis: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => millis.to_string(),
    }
}

/// Parse a snapshot timestamp back to epoch milliseconds
pub fn parse_timestamp(value: &str) -> Result<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp_millis());
    }
    value.parse::<i64>().map_err(|_| SnapshotError::Timestamp {
        value: value.to_string(),
    })
}

/// Default file and directory names skipped by directory scans
pub static DEFAULT_IGNORE: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        // Version Control
        ".git",
        ".svn",
        ".hg",
        ".bzr",
        // OS Files
        ".DS_Store",
        "Thumbs.db",
        "desktop.ini",
        "ehthumbs.db",
        // Editor swap files
        "*.swp",
        "*.swo",
        "*~",
    ]
});
