//! Build-time manifest recording where every table landed in a file.
//!
//! A GXT image carries no table directory and no block sizes, so it cannot be parsed back on
//! its own. The builder therefore records each table's absolute location in a JSON sidecar;
//! the replacer and the listing tools consume it to find the blocks again.

use derive_more::derive::Constructor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

use crate::error::Result;
use crate::types::GxtVersion;

/// Absolute location of one table's blocks inside the file
#[derive(Serialize, Deserialize, Constructor, Debug, Copy, Clone, PartialEq, Eq)]
pub struct TableLocation {
    /// Absolute byte offset of the table's entry block
    pub offset: u32,

    /// Number of entry records in the block
    pub entries: u32,

    /// Size in bytes of the content blob that follows the entry block
    pub content_size: u32,
}

impl TableLocation {
    /// Size in bytes of the entry block.
    pub fn entry_block_size(&self, version: GxtVersion) -> u32 {
        self.entries * version.entry_size() as u32
    }

    /// Absolute byte offset of the content blob.
    pub fn content_offset(&self, version: GxtVersion) -> u32 {
        self.offset + self.entry_block_size(version)
    }

    /// Absolute byte offset of the first byte past this table.
    pub fn end_offset(&self, version: GxtVersion) -> u32 {
        self.content_offset(version) + self.content_size
    }
}

/// Sidecar manifest describing one built GXT file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileManifest {
    /// Version the file was built for
    pub version: GxtVersion,

    /// Language the file holds, carried as metadata
    pub language: String,

    /// Name of the main table
    pub main_table: String,

    /// Every table's location, keyed by table name
    pub tables: BTreeMap<String, TableLocation>,
}

impl FileManifest {
    /// Serialize as pretty-printed JSON.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserialize from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<FileManifest> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// The recorded location of one table.
    pub fn location_of(&self, table: &str) -> Option<TableLocation> {
        self.tables.get(table).copied()
    }
}
