/*!
 * Core types and data structures for dirsnap
 */

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumProperty, EnumString, IntoEnumIterator};

use crate::utils::{format_timestamp, normalize_unix_path};

/// The file attributes a snapshot can capture.
///
/// Declaration order is the order differences are reported in.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    EnumString,
    Display,
    EnumProperty,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum Attribute {
    #[strum(to_string = "size", props(label = "Size"))]
    Size,

    #[strum(
        to_string = "modified",
        serialize = "mtime",
        props(label = "Modification time")
    )]
    #[serde(rename = "modified")]
    ModificationTime,

    #[strum(to_string = "md5", serialize = "hash", props(label = "MD5 checksum"))]
    Md5,

    #[strum(
        to_string = "permissions",
        serialize = "perms",
        props(label = "Permissions")
    )]
    Permissions,
}

impl Attribute {
    /// Human readable attribute name used in reports
    pub fn label(&self) -> &'static str {
        self.get_str("label").unwrap_or("Unknown")
    }

    /// All attributes in reporting order
    pub fn all() -> impl Iterator<Item = Attribute> {
        Attribute::iter()
    }
}

/// How file content is read before hashing
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, ValueEnum, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HashMode {
    /// Hash the raw bytes
    #[default]
    Binary,
    /// Hash the content with line endings normalized to LF
    Text,
}

/// The captured attributes of one file.
///
/// A field is `Some` only if its check was enabled when the file was
/// captured; `None` means "not captured", never a default value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnapshot {
    path: String,
    size: Option<u64>,
    modified: Option<i64>,
    md5: Option<String>,
    permissions: Option<String>,
}

impl FileSnapshot {
    /// Create an entity with no captured attributes
    pub fn new(path: impl AsRef<str>) -> Self {
        Self {
            path: normalize_unix_path(path.as_ref()),
            size: None,
            modified: None,
            md5: None,
            permissions: None,
        }
    }

    /// Set the size in bytes
    pub fn with_size(mut self, size: Option<u64>) -> Self {
        self.size = size;
        self
    }

    /// Set the modification time in epoch milliseconds
    pub fn with_modified(mut self, modified: Option<i64>) -> Self {
        self.modified = modified;
        self
    }

    /// Set the content hash
    pub fn with_md5(mut self, md5: Option<String>) -> Self {
        self.md5 = md5;
        self
    }

    /// Set the permission string
    pub fn with_permissions(mut self, permissions: Option<String>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Normalized forward-slash path
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Modification time in epoch milliseconds
    pub fn modified(&self) -> Option<i64> {
        self.modified
    }

    pub fn md5(&self) -> Option<&str> {
        self.md5.as_deref()
    }

    pub fn permissions(&self) -> Option<&str> {
        self.permissions.as_deref()
    }

    /// Whether the attribute holds a captured value
    pub fn is_known(&self, attribute: Attribute) -> bool {
        match attribute {
            Attribute::Size => self.size.is_some(),
            Attribute::ModificationTime => self.modified.is_some(),
            Attribute::Md5 => self.md5.is_some(),
            Attribute::Permissions => self.permissions.is_some(),
        }
    }

    /// String form of an attribute value, `None` when not captured
    pub fn value(&self, attribute: Attribute) -> Option<String> {
        match attribute {
            Attribute::Size => self.size.map(|s| s.to_string()),
            Attribute::ModificationTime => self.modified.map(|m| m.to_string()),
            Attribute::Md5 => self.md5.clone(),
            Attribute::Permissions => self.permissions.clone(),
        }
    }

    /// Copy of this entity with the given attribute dropped to unknown
    pub fn without(&self, attribute: Attribute) -> Self {
        let mut copy = self.clone();
        match attribute {
            Attribute::Size => copy.size = None,
            Attribute::ModificationTime => copy.modified = None,
            Attribute::Md5 => copy.md5 = None,
            Attribute::Permissions => copy.permissions = None,
        }
        copy
    }
}

impl fmt::Display for FileSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "file: {}", self.path)?;
        if let Some(size) = self.size {
            write!(f, ", size: {}", size)?;
        }
        if let Some(modified) = self.modified {
            write!(f, ", modified: {}", format_timestamp(modified))?;
        }
        if let Some(md5) = &self.md5 {
            write!(f, ", md5: {}", md5)?;
        }
        if let Some(permissions) = &self.permissions {
            write!(f, ", permissions: {}", permissions)?;
        }
        Ok(())
    }
}

/// A named set of file entities, keyed by normalized path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Free-form label used on this side of a comparison
    pub name: String,
    /// Captured files
    pub files: BTreeMap<String, FileSnapshot>,
}

impl Snapshot {
    /// Create an empty snapshot
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: BTreeMap::new(),
        }
    }

    /// Add an entity, returning the previous entity for the same path
    pub fn insert(&mut self, file: FileSnapshot) -> Option<FileSnapshot> {
        self.files.insert(file.path().to_string(), file)
    }

    pub fn get(&self, path: &str) -> Option<&FileSnapshot> {
        self.files.get(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Entities in path order
    pub fn iter(&self) -> impl Iterator<Item = &FileSnapshot> {
        self.files.values()
    }
}

/// One attribute that differs between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difference {
    pub attribute: Attribute,
    /// Left value, `"null"` when not captured
    pub left: String,
    /// Right value, `"null"` when not captured
    pub right: String,
}

/// All differences found for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTrace {
    pub path: String,
    pub left_label: String,
    pub right_label: String,
    pub differences: Vec<Difference>,
}

impl FileTrace {
    /// Differences for a single attribute, if any
    pub fn difference(&self, attribute: Attribute) -> Option<&Difference> {
        self.differences.iter().find(|d| d.attribute == attribute)
    }
}

impl fmt::Display for FileTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "[{}] file \"{}\" differs from [{}]:",
            self.left_label, self.path, self.right_label
        )?;
        for d in &self.differences {
            writeln!(f, "    {}: {} vs {}", d.attribute.label(), d.left, d.right)?;
        }
        Ok(())
    }
}

/// Aggregate result of comparing two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityReport {
    pub left_label: String,
    pub right_label: String,
    /// Paths that differ, sorted by path
    pub traces: Vec<FileTrace>,
    /// Paths present only in the left snapshot
    pub only_in_left: Vec<String>,
    /// Paths present only in the right snapshot
    pub only_in_right: Vec<String>,
}

impl EqualityReport {
    pub fn new(left_label: impl Into<String>, right_label: impl Into<String>) -> Self {
        Self {
            left_label: left_label.into(),
            right_label: right_label.into(),
            ..Default::default()
        }
    }

    /// No difference was detected under the active rule set
    pub fn is_equal(&self) -> bool {
        self.traces.is_empty() && self.only_in_left.is_empty() && self.only_in_right.is_empty()
    }

    pub fn trace_for(&self, path: &str) -> Option<&FileTrace> {
        self.traces.iter().find(|t| t.path == path)
    }
}
