//! Tables, packed content blobs, and the table collection.

use binrw::BinWrite;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};
use widestring::U16String;

use crate::charmap::CharacterMap;
use crate::error::Result;
use crate::types::{CodeUnitWidth, EntryKey, GxtVersion, HashEntry, NameEntry};

/// Name of the main table as the builder produces it
pub const MAIN_TABLE: &str = "MAIN";

/// Packed character data for one table
///
/// An append-only run of code units at the owning version's width; each entry's characters
/// are terminated by one zero unit. Narrow units always fit a byte because the character map
/// holds at most 224 slots shifted by 32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormattedContent {
    /// 16-bit code units
    Wide(U16String),

    /// 8-bit code units
    Narrow(Vec<u8>),
}

impl FormattedContent {
    /// An empty blob at the given width.
    pub fn for_width(width: CodeUnitWidth) -> FormattedContent {
        match width {
            CodeUnitWidth::Wide => FormattedContent::Wide(U16String::new()),
            CodeUnitWidth::Narrow => FormattedContent::Narrow(Vec::new()),
        }
    }

    /// The width this blob packs at.
    pub fn width(&self) -> CodeUnitWidth {
        match self {
            FormattedContent::Wide(_) => CodeUnitWidth::Wide,
            FormattedContent::Narrow(_) => CodeUnitWidth::Narrow,
        }
    }

    /// Number of code units held.
    pub fn len_units(&self) -> usize {
        match self {
            FormattedContent::Wide(units) => units.len(),
            FormattedContent::Narrow(bytes) => bytes.len(),
        }
    }

    /// Size in bytes once serialized.
    pub fn size_bytes(&self) -> usize {
        self.len_units() * self.width().bytes()
    }

    /// Append one code unit.
    pub fn push(&mut self, unit: u16) {
        match self {
            FormattedContent::Wide(units) => units.push_slice(&[unit]),
            FormattedContent::Narrow(bytes) => {
                debug_assert!(unit <= u16::from(u8::MAX));
                bytes.push(unit as u8);
            }
        }
    }

    /// The code unit at `index`, if in bounds.
    pub fn unit(&self, index: usize) -> Option<u16> {
        match self {
            FormattedContent::Wide(units) => units.as_slice().get(index).copied(),
            FormattedContent::Narrow(bytes) => bytes.get(index).map(|b| u16::from(*b)),
        }
    }

    /// Code units of the entry starting at `offset`, up to (not including) its zero
    /// terminator.
    pub fn entry_units(&self, offset: u32) -> Vec<u16> {
        let mut units = Vec::new();
        let mut index = offset as usize;
        while let Some(unit) = self.unit(index) {
            if unit == 0 {
                break;
            }
            units.push(unit);
            index += 1;
        }
        units
    }

    /// Write the blob verbatim, units little endian.
    pub fn write_out<W: Write>(&self, writer: &mut W) -> Result<u64> {
        match self {
            FormattedContent::Wide(units) => {
                for &unit in units.as_slice() {
                    writer.write_u16::<LittleEndian>(unit)?;
                }
            }
            FormattedContent::Narrow(bytes) => writer.write_all(bytes)?,
        }
        Ok(self.size_bytes() as u64)
    }

    /// Read a blob of `size_bytes` back at the given width.
    pub fn read_exact_units<R: Read>(
        reader: &mut R,
        width: CodeUnitWidth,
        size_bytes: usize,
    ) -> Result<FormattedContent> {
        match width {
            CodeUnitWidth::Wide => {
                let count = size_bytes / 2;
                let mut units = Vec::with_capacity(count);
                for _ in 0..count {
                    units.push(reader.read_u16::<LittleEndian>()?);
                }
                Ok(FormattedContent::Wide(U16String::from_vec(units)))
            }
            CodeUnitWidth::Narrow => {
                let mut bytes = vec![0u8; size_bytes];
                reader.read_exact(&mut bytes)?;
                Ok(FormattedContent::Narrow(bytes))
            }
        }
    }
}

/// A single named table: an entry index plus the packed content blob
///
/// Entries map a key to the offset, in code units, where the entry's characters start inside
/// the blob. The index is a `BTreeMap`, so serialization in ascending key order is structural
/// rather than a separate sorting step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GxtTable {
    version: GxtVersion,
    entries: BTreeMap<EntryKey, u32>,
    content: FormattedContent,
}

impl GxtTable {
    /// An empty table for the given version.
    pub fn new(version: GxtVersion) -> GxtTable {
        GxtTable {
            version,
            entries: BTreeMap::new(),
            content: FormattedContent::for_width(version.code_unit_width()),
        }
    }

    /// The version this table serializes for.
    pub fn version(&self) -> GxtVersion {
        self.version
    }

    /// Insert a key at a content offset (in code units).
    ///
    /// Returns false and leaves the table untouched when the key already exists; reporting
    /// the duplicate is the caller's job.
    pub fn insert_entry(&mut self, key: EntryKey, offset: u32) -> bool {
        debug_assert_eq!(
            matches!(key, EntryKey::Hash(_)),
            self.version.uses_hash_keys()
        );

        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, offset);
        true
    }

    /// Append one code unit to the content blob.
    ///
    /// The caller is responsible for pushing the zero terminator after each entry's
    /// characters; [`GxtTable::append_entry`] does both.
    pub fn push_formatted_char(&mut self, unit: u16) {
        self.content.push(unit);
    }

    /// Insert a key at the current end of the blob and append its characters plus the zero
    /// terminator. Returns false (appending nothing) on a duplicate key.
    pub fn append_entry(&mut self, key: EntryKey, units: &[u16]) -> bool {
        let offset = self.content.len_units() as u32;
        if !self.insert_entry(key, offset) {
            return false;
        }
        for &unit in units {
            self.push_formatted_char(unit);
        }
        self.push_formatted_char(0);
        true
    }

    /// Number of entries held.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Whether this table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Size in bytes of the content blob once serialized.
    pub fn formatted_content_size(&self) -> usize {
        self.content.size_bytes()
    }

    /// Size in bytes of one on-disk entry record.
    pub fn entry_size(&self) -> usize {
        self.version.entry_size()
    }

    /// The entry index, ascending by key.
    pub fn entries(&self) -> impl Iterator<Item = (&EntryKey, &u32)> {
        self.entries.iter()
    }

    /// The content offset (in code units) recorded for a key.
    pub fn offset_of(&self, key: &EntryKey) -> Option<u32> {
        self.entries.get(key).copied()
    }

    /// The content blob.
    pub fn content(&self) -> &FormattedContent {
        &self.content
    }

    /// Serialize the entry block: fixed-width records in ascending key order.
    ///
    /// Name-keyed records store the offset in code units; hash-keyed records store it in
    /// bytes.
    pub fn write_entries<W: Write + Seek>(&self, writer: &mut W) -> Result<u64> {
        let unit_bytes = self.version.code_unit_width().bytes() as u32;
        for (key, &offset) in &self.entries {
            match *key {
                EntryKey::Name(name) => NameEntry { name, offset }.write(writer)?,
                EntryKey::Hash(hash) => HashEntry {
                    hash,
                    offset: offset * unit_bytes,
                }
                .write(writer)?,
            }
        }
        Ok((self.num_entries() * self.entry_size()) as u64)
    }

    /// Serialize the content block verbatim.
    pub fn write_content<W: Write>(&self, writer: &mut W) -> Result<u64> {
        self.content.write_out(writer)
    }

    /// Replace the content blob with one read back from an existing file.
    pub fn read_content<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        offset: u64,
        size_bytes: usize,
    ) -> Result<()> {
        reader.seek(SeekFrom::Start(offset))?;
        self.content = FormattedContent::read_exact_units(
            reader,
            self.version.code_unit_width(),
            size_bytes,
        )?;
        Ok(())
    }

    /// Decode every entry back to text, in ascending key order.
    pub fn decoded_entries(&self, charmap: &CharacterMap) -> Result<Vec<(EntryKey, String)>> {
        self.entries
            .iter()
            .map(|(key, &offset)| Ok((*key, charmap.decode(&self.content.entry_units(offset))?)))
            .collect()
    }
}

/// A table plus the absolute offset of its entry block within an existing file
///
/// The offset is only recorded when the table was read back for patching; freshly built
/// tables have not landed anywhere yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    /// Where the table's entry block starts in the file, if known
    pub absolute_offset: Option<u32>,

    /// The table itself
    pub table: GxtTable,
}

impl TableBlock {
    /// A block for a freshly built table.
    pub fn new(table: GxtTable) -> TableBlock {
        TableBlock {
            absolute_offset: None,
            table,
        }
    }

    /// A block read back from an existing file.
    pub fn at_offset(table: GxtTable, offset: u32) -> TableBlock {
        TableBlock {
            absolute_offset: Some(offset),
            table,
        }
    }
}

/// One main table plus zero or more mission tables
///
/// Mission tables live in a `BTreeMap`, giving the deterministic ascending name order the
/// file layout requires. Consumed by [`crate::write::produce_gxt_file`] to produce a file
/// image, or patched through [`crate::replace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCollection {
    main_name: String,
    main: TableBlock,
    missions: BTreeMap<String, TableBlock>,
}

impl TableCollection {
    /// A collection holding only a main table.
    pub fn new(main_name: impl Into<String>, main: TableBlock) -> TableCollection {
        TableCollection {
            main_name: main_name.into(),
            main,
            missions: BTreeMap::new(),
        }
    }

    /// A collection holding a main table and mission tables.
    pub fn with_missions(
        main_name: impl Into<String>,
        main: TableBlock,
        missions: BTreeMap<String, TableBlock>,
    ) -> TableCollection {
        TableCollection {
            main_name: main_name.into(),
            main,
            missions,
        }
    }

    /// The version every table in this collection serializes for.
    pub fn version(&self) -> GxtVersion {
        self.main.table.version()
    }

    /// The main table and its name.
    pub fn main(&self) -> (&str, &TableBlock) {
        (&self.main_name, &self.main)
    }

    /// The mission tables, ascending by name.
    pub fn missions(&self) -> &BTreeMap<String, TableBlock> {
        &self.missions
    }

    /// Number of tables, the main table included.
    pub fn num_tables(&self) -> usize {
        1 + self.missions.len()
    }

    /// Every table in file order: main first, then missions ascending by name.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableBlock)> {
        std::iter::once((self.main_name.as_str(), &self.main))
            .chain(self.missions.iter().map(|(name, block)| (name.as_str(), block)))
    }

    /// Look a table up by name.
    pub fn get(&self, name: &str) -> Option<&TableBlock> {
        if name == self.main_name {
            Some(&self.main)
        } else {
            self.missions.get(name)
        }
    }

    /// Look a table up by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut TableBlock> {
        if name == self.main_name {
            Some(&mut self.main)
        } else {
            self.missions.get_mut(name)
        }
    }
}
