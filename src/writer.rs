/*!
 * XML writer for snapshots
 */

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::info;

use crate::error::Result;
use crate::types::{Attribute, FileSnapshot, Snapshot};
use crate::utils::format_timestamp;

/// Root element of a snapshot document
pub const SNAPSHOT_ELEMENT: &str = "snapshot";
/// Element holding one file entity
pub const FILE_ELEMENT: &str = "file";
/// Attribute holding the normalized path of a file entity
pub const PATH_ATTRIBUTE: &str = "path";

/// XML writer for snapshots.
///
/// Only captured attributes are written; an unknown attribute is left out
/// of its `<file>` element entirely.
#[derive(Debug, Clone, Default)]
pub struct XmlWriter;

impl XmlWriter {
    /// Create a new XML writer
    pub fn new() -> Self {
        Self
    }

    /// Write the snapshot to an XML file, replacing it if present
    pub fn write_to_path(&self, snapshot: &Snapshot, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        self.write(snapshot, BufWriter::new(file))?;
        info!(
            files = snapshot.len(),
            output = %path.display(),
            "Saved snapshot {}",
            snapshot.name
        );
        Ok(())
    }

    /// Render the snapshot as an XML string
    pub fn to_xml_string(&self, snapshot: &Snapshot) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(snapshot, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the snapshot document to `output` and flush it
    pub fn write<W: Write>(&self, snapshot: &Snapshot, output: W) -> Result<()> {
        let mut xml_writer = Writer::new_with_indent(output, b' ', 2);

        // Write XML declaration
        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        // Start snapshot element with origin details
        let mut start_tag = BytesStart::new(SNAPSHOT_ELEMENT);
        start_tag.push_attribute(("name", snapshot.name.as_str()));
        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        start_tag.push_attribute(("host", hostname.as_str()));
        start_tag.push_attribute(("os", std::env::consts::OS));
        let created = format_timestamp(Utc::now().timestamp_millis());
        start_tag.push_attribute(("created", created.as_str()));
        xml_writer.write_event(Event::Start(start_tag))?;

        for file in snapshot.iter() {
            self.write_file(file, &mut xml_writer)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new(SNAPSHOT_ELEMENT)))?;

        xml_writer.into_inner().flush()?;
        Ok(())
    }

    /// Write one file entity as an empty element carrying its known attributes
    fn write_file<W: Write>(&self, file: &FileSnapshot, writer: &mut Writer<W>) -> Result<()> {
        let mut tag = BytesStart::new(FILE_ELEMENT);
        tag.push_attribute((PATH_ATTRIBUTE, file.path()));

        for attribute in Attribute::all() {
            let value = match attribute {
                Attribute::ModificationTime => file.modified().map(format_timestamp),
                other => file.value(other),
            };
            if let Some(value) = value {
                tag.push_attribute((attribute.to_string().as_str(), value.as_str()));
            }
        }

        writer.write_event(Event::Empty(tag))?;
        Ok(())
    }
}
