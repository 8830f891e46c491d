/*!
 * Filesystem reads needed to capture file attributes
 */

use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use chrono::{DateTime, Utc};
use md5::{Digest, Md5};

use crate::error::{Result, SnapshotError};
use crate::types::HashMode;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Attribute reads a capture needs from the filesystem.
///
/// `permissions` fails with [`SnapshotError::AttributeNotSupported`] when the
/// host cannot provide them; every other failure is a [`SnapshotError::FileIo`].
pub trait FileSystemOperations: Send + Sync {
    /// Size in bytes
    fn size(&self, path: &Path) -> Result<u64>;

    /// Modification time in epoch milliseconds
    fn modification_time(&self, path: &Path) -> Result<i64>;

    /// Lowercase hex MD5 of the file content read in `mode`
    fn compute_hash(&self, path: &Path, mode: HashMode) -> Result<String>;

    /// Platform permission string
    fn permissions(&self, path: &Path) -> Result<String>;
}

/// [`FileSystemOperations`] backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystemOperations;

impl LocalFileSystemOperations {
    pub fn new() -> Self {
        Self
    }

    fn metadata(&self, path: &Path) -> Result<fs::Metadata> {
        fs::metadata(path).map_err(|e| io_error(path, e))
    }
}

impl FileSystemOperations for LocalFileSystemOperations {
    fn size(&self, path: &Path) -> Result<u64> {
        Ok(self.metadata(path)?.len())
    }

    fn modification_time(&self, path: &Path) -> Result<i64> {
        let modified = self
            .metadata(path)?
            .modified()
            .map_err(|e| io_error(path, e))?;
        Ok(DateTime::<Utc>::from(modified).timestamp_millis())
    }

    fn compute_hash(&self, path: &Path, mode: HashMode) -> Result<String> {
        let file = File::open(path).map_err(|e| io_error(path, e))?;
        hash_reader(BufReader::new(file), mode).map_err(|e| io_error(path, e))
    }

    #[cfg(unix)]
    fn permissions(&self, path: &Path) -> Result<String> {
        use std::os::unix::fs::PermissionsExt;

        let mode = self.metadata(path)?.permissions().mode();
        Ok(format!("{:o}", mode & 0o777))
    }

    #[cfg(not(unix))]
    fn permissions(&self, path: &Path) -> Result<String> {
        Err(SnapshotError::AttributeNotSupported {
            attribute: crate::types::Attribute::Permissions,
            path: crate::utils::normalize_unix_path(&path.to_string_lossy()),
        })
    }
}

fn io_error(path: &Path, source: io::Error) -> SnapshotError {
    SnapshotError::file_io(path.to_string_lossy(), source)
}

/// Hash everything `reader` yields.
///
/// In text mode CRLF and lone CR are hashed as LF, so the same text file
/// hashes identically whatever platform wrote it.
pub fn hash_reader<R: Read>(mut reader: R, mode: HashMode) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];
    let mut normalized = Vec::new();
    let mut pending_cr = false;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buffer[..read];

        match mode {
            HashMode::Binary => hasher.update(chunk),
            HashMode::Text => {
                normalized.clear();
                for &byte in chunk {
                    if pending_cr {
                        pending_cr = false;
                        normalized.push(b'\n');
                        if byte == b'\n' {
                            continue;
                        }
                    }
                    if byte == b'\r' {
                        pending_cr = true;
                    } else {
                        normalized.push(byte);
                    }
                }
                hasher.update(&normalized);
            }
        }
    }

    if pending_cr {
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    // MD5 of "hello\nworld\n"
    const HELLO_WORLD_MD5: &str = "0f723ae7f9bf07744445e93ac5595156";

    fn md5_of(bytes: &[u8], mode: HashMode) -> String {
        hash_reader(Cursor::new(bytes.to_vec()), mode).unwrap()
    }

    #[test]
    fn test_binary_hash_known_value() {
        assert_eq!(md5_of(b"", HashMode::Binary), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_of(b"abc", HashMode::Binary), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_text_hash_normalizes_line_endings() {
        let lf = md5_of(b"hello\nworld\n", HashMode::Text);
        assert_eq!(md5_of(b"hello\r\nworld\r\n", HashMode::Text), lf);
        assert_eq!(md5_of(b"hello\rworld\r", HashMode::Text), lf);
        assert_eq!(md5_of(b"hello\nworld\n", HashMode::Binary), lf);
        assert_eq!(lf, HELLO_WORLD_MD5);
    }

    #[test]
    fn test_binary_hash_keeps_line_endings() {
        assert_ne!(
            md5_of(b"hello\r\nworld\r\n", HashMode::Binary),
            md5_of(b"hello\nworld\n", HashMode::Binary)
        );
    }

    #[test]
    fn test_crlf_split_across_reads() {
        // A reader that yields one byte at a time
        struct OneByte(Cursor<Vec<u8>>);
        impl Read for OneByte {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                let limit = buf.len().min(1);
                self.0.read(&mut buf[..limit])
            }
        }

        let slow = hash_reader(OneByte(Cursor::new(b"a\r\nb".to_vec())), HashMode::Text).unwrap();
        assert_eq!(slow, md5_of(b"a\nb", HashMode::Binary));
    }

    #[test]
    fn test_local_operations() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"abc")?;
        file.flush()?;

        let ops = LocalFileSystemOperations::new();
        assert_eq!(ops.size(file.path())?, 3);
        assert_eq!(
            ops.compute_hash(file.path(), HashMode::Binary)?,
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert!(ops.modification_time(file.path())? > 0);
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_local_permissions() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let file = NamedTempFile::new()?;
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o640))?;
        assert_eq!(LocalFileSystemOperations::new().permissions(file.path())?, "640");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_file_io_error() {
        let ops = LocalFileSystemOperations::new();
        let err = ops.size(Path::new("/no/such/file.bin")).unwrap_err();
        assert!(matches!(err, SnapshotError::FileIo { ref path, .. } if path == "/no/such/file.bin"));
    }
}
