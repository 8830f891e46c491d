//! Global error handling for dirsnap
//!
//! Every fallible operation in the crate reports through [`SnapshotError`].
//! Capture failures carry the path they happened on so a caller scanning a
//! whole tree can decide to abort or to skip the file and continue.

use std::io;
use thiserror::Error;

use crate::types::Attribute;

/// Global error type for dirsnap operations
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The host platform cannot read this attribute
    #[error("Attribute {attribute} is not supported on this platform (file {path})")]
    AttributeNotSupported {
        /// Attribute that could not be read
        attribute: Attribute,
        /// File the read was attempted on
        path: String,
    },

    /// Reading a single file failed
    #[error("Failed to capture {path}: {source}")]
    FileIo {
        /// File the capture was attempted on
        path: String,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// Stream level errors (opening or writing a snapshot document)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// XML processing errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A persisted snapshot violates the document contract
    #[error("Malformed snapshot at file node {node}: {reason}")]
    MalformedSnapshot {
        /// 1-based index of the offending file node, 0 for the document itself
        node: usize,
        /// What was wrong with it
        reason: String,
    },

    /// A modification time that does not use the snapshot timestamp format
    #[error("Invalid timestamp: {value}")]
    Timestamp {
        /// The rejected text
        value: String,
    },

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A per-path rule that could not be parsed
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

impl SnapshotError {
    /// Wrap an I/O error raised while reading `path`
    pub fn file_io(path: impl Into<String>, source: io::Error) -> Self {
        Self::FileIo {
            path: path.into(),
            source,
        }
    }

    /// Whether this is the recoverable "attribute unsupported" condition
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::AttributeNotSupported { .. })
    }
}

/// Specialized Result type for dirsnap operations
pub type Result<T> = std::result::Result<T, SnapshotError>;

/// Creates a SnapshotError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::SnapshotError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

// Allow converting SnapshotError to io::Error for the binary's io::Result main
impl From<SnapshotError> for io::Error {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io(e) => e,
            SnapshotError::FileIo { source, .. } => source,
            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
        }
    }
}
