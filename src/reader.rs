/*!
 * XML reader for snapshots
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, info};

use crate::error::{Result, SnapshotError};
use crate::types::{Attribute, FileSnapshot, Snapshot};
use crate::utils::parse_timestamp;
use crate::writer::{FILE_ELEMENT, PATH_ATTRIBUTE, SNAPSHOT_ELEMENT};

/// XML reader for snapshots.
///
/// Attributes missing from a `<file>` element load as unknown. Unrecognized
/// attributes and elements are ignored so newer documents stay readable.
#[derive(Debug, Clone, Default)]
pub struct XmlReader;

impl XmlReader {
    pub fn new() -> Self {
        Self
    }

    /// Load a snapshot from an XML file
    pub fn read_from_path(&self, path: &Path) -> Result<Snapshot> {
        let file = File::open(path)?;
        let snapshot = self.read(BufReader::new(file))?;
        info!(
            files = snapshot.len(),
            input = %path.display(),
            "Loaded snapshot {}",
            snapshot.name
        );
        Ok(snapshot)
    }

    /// Load a snapshot from an XML string
    pub fn from_xml_str(&self, xml: &str) -> Result<Snapshot> {
        self.read(xml.as_bytes())
    }

    /// Load a snapshot from any buffered source
    pub fn read<R: BufRead>(&self, input: R) -> Result<Snapshot> {
        let mut reader = Reader::from_reader(input);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut snapshot: Option<Snapshot> = None;
        let mut depth = 0usize;
        let mut closed = false;
        let mut node = 0usize;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => {
                    self.open_element(&e, depth, &mut snapshot, &mut node)?;
                    depth += 1;
                }
                Event::Empty(e) => {
                    self.open_element(&e, depth, &mut snapshot, &mut node)?;
                    if depth == 0 {
                        closed = true;
                    }
                }
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        closed = true;
                    }
                }
                Event::Eof => break,
                _ => (),
            }
            buf.clear();
        }

        let snapshot = snapshot.ok_or_else(|| malformed(0, "document has no root element"))?;
        if !closed {
            return Err(malformed(0, "document is truncated"));
        }
        Ok(snapshot)
    }

    fn open_element(
        &self,
        element: &BytesStart<'_>,
        depth: usize,
        snapshot: &mut Option<Snapshot>,
        node: &mut usize,
    ) -> Result<()> {
        match (depth, snapshot.as_mut()) {
            (0, None) => {
                if element.name().as_ref() != SNAPSHOT_ELEMENT.as_bytes() {
                    return Err(malformed(
                        0,
                        format!(
                            "root element is <{}>, expected <{}>",
                            String::from_utf8_lossy(element.name().as_ref()),
                            SNAPSHOT_ELEMENT
                        ),
                    ));
                }
                let name = attribute_value(element, "name")?.unwrap_or_default();
                *snapshot = Some(Snapshot::new(name));
            }
            (0, Some(_)) => return Err(malformed(0, "document has more than one root element")),
            (1, Some(snapshot)) if element.name().as_ref() == FILE_ELEMENT.as_bytes() => {
                *node += 1;
                let file = parse_file(element, *node)?;
                if snapshot.get(file.path()).is_some() {
                    return Err(malformed(*node, format!("duplicate path '{}'", file.path())));
                }
                debug!("Add {}", file);
                snapshot.insert(file);
            }
            _ => (),
        }
        Ok(())
    }
}

/// Build one entity from a `<file>` element
fn parse_file(element: &BytesStart<'_>, node: usize) -> Result<FileSnapshot> {
    let mut path = None;
    let mut size = None;
    let mut modified = None;
    let mut md5 = None;
    let mut permissions = None;

    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(quick_xml::Error::from)?
            .into_owned();

        if key == PATH_ATTRIBUTE {
            path = Some(value);
            continue;
        }
        // Exact on-disk names only; aliases and other casings are unknown attributes
        match Attribute::all().find(|attribute| attribute.to_string() == key) {
            Some(Attribute::Size) => {
                let parsed = value
                    .parse::<u64>()
                    .map_err(|_| malformed(node, format!("invalid size '{}'", value)))?;
                size = Some(parsed);
            }
            Some(Attribute::ModificationTime) => {
                let parsed =
                    parse_timestamp(&value).map_err(|e| malformed(node, e.to_string()))?;
                modified = Some(parsed);
            }
            Some(Attribute::Md5) => md5 = Some(value),
            Some(Attribute::Permissions) => permissions = Some(value),
            None => (),
        }
    }

    let path = path.ok_or_else(|| malformed(node, "missing required 'path' attribute"))?;
    Ok(FileSnapshot::new(path)
        .with_size(size)
        .with_modified(modified)
        .with_md5(md5)
        .with_permissions(permissions))
}

fn attribute_value(element: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    let attr = element
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?;
    match attr {
        Some(attr) => Ok(Some(
            attr.unescape_value()
                .map_err(quick_xml::Error::from)?
                .into_owned(),
        )),
        None => Ok(None),
    }
}

fn malformed(node: usize, reason: impl Into<String>) -> SnapshotError {
    SnapshotError::MalformedSnapshot {
        node,
        reason: reason.into(),
    }
}
