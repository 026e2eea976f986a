//! Reading tables back out of an existing file.
//!
//! The wire image is not self-describing, so every read is driven by the locations a
//! [`FileManifest`](crate::manifest::FileManifest) recorded at build time.

use binrw::BinRead;
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::manifest::{FileManifest, TableLocation};
use crate::table::{GxtTable, TableBlock, TableCollection};
use crate::types::{EntryKey, GxtVersion, HashEntry, NameEntry};

/// Read one table at its recorded location.
///
/// Reads `location.entries` fixed-width records, then the whole content blob. Stored hash
/// offsets are in bytes and are converted back to code-unit indices.
#[instrument(skip(reader), err)]
pub fn read_table<R: Read + Seek>(
    reader: &mut R,
    version: GxtVersion,
    location: TableLocation,
) -> Result<GxtTable> {
    reader.seek(SeekFrom::Start(u64::from(location.offset)))?;

    let unit_bytes = version.code_unit_width().bytes() as u32;
    let mut table = GxtTable::new(version);
    for _ in 0..location.entries {
        let (key, offset_units) = if version.uses_hash_keys() {
            let record = HashEntry::read(reader)?;
            (EntryKey::Hash(record.hash), record.offset / unit_bytes)
        } else {
            let record = NameEntry::read(reader)?;
            (EntryKey::Name(record.name), record.offset)
        };

        if !table.insert_entry(key, offset_units) {
            return Err(Error::ManifestMismatch {
                reason: format!("duplicate key {key} in entry block"),
            });
        }
    }

    table.read_content(
        reader,
        u64::from(location.content_offset(version)),
        location.content_size as usize,
    )?;

    Ok(table)
}

/// Rebuild the full collection of an existing file from its manifest.
///
/// Every block comes back with its absolute offset recorded, ready for in-place patching.
#[instrument(skip(reader, manifest), err)]
pub fn read_collection<R: Read + Seek>(
    reader: &mut R,
    manifest: &FileManifest,
) -> Result<TableCollection> {
    let version = manifest.version;
    let file_len = reader.seek(SeekFrom::End(0))?;

    let mut main: Option<TableBlock> = None;
    let mut missions: BTreeMap<String, TableBlock> = BTreeMap::new();
    for (name, location) in &manifest.tables {
        if u64::from(location.end_offset(version)) > file_len {
            return Err(Error::ManifestMismatch {
                reason: format!("table {name} extends past the end of the file"),
            });
        }

        let table = read_table(reader, version, *location)?;
        let block = TableBlock::at_offset(table, location.offset);
        if *name == manifest.main_table {
            main = Some(block);
        } else {
            missions.insert(name.clone(), block);
        }
    }

    let main = main.ok_or_else(|| Error::TableNotFound(manifest.main_table.clone()))?;
    Ok(TableCollection::with_missions(
        manifest.main_table.clone(),
        main,
        missions,
    ))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    use crate::error::{Error, Result};
    use crate::manifest::TableLocation;
    use crate::read::read_table;
    use crate::table::GxtTable;
    use crate::types::{EntryKey, GxtVersion};

    #[test]
    fn read_table_converts_byte_offsets_back_to_units() -> Result<()> {
        #[rustfmt::skip]
        let image = vec![
            // two 16-bit hash records, offsets 0 and 6 bytes
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x02, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00,
            // content: Hi\0Yo\0
            0x48, 0x00, 0x69, 0x00, 0x00, 0x00,
            0x59, 0x00, 0x6F, 0x00, 0x00, 0x00,
        ];

        let mut reader = Cursor::new(image);
        let table = read_table(
            &mut reader,
            GxtVersion::SanAndreasMobile,
            TableLocation::new(0, 2, 12),
        )?;

        assert_eq!(table.offset_of(&EntryKey::Hash(1)), Some(0));
        assert_eq!(table.offset_of(&EntryKey::Hash(2)), Some(3));
        assert_eq!(table.content().entry_units(3), vec![0x59, 0x6F]);

        Ok(())
    }

    #[test]
    fn read_table_round_trips_a_written_table() -> Result<()> {
        let mut table = GxtTable::new(GxtVersion::ViceCity);
        table.append_entry(EntryKey::name("AAA"), &[0x48, 0x69]);
        table.append_entry(EntryKey::name("BBB"), &[0x59, 0x6F]);

        let mut image = Cursor::new(Vec::new());
        table.write_entries(&mut image)?;
        table.write_content(&mut image)?;

        let mut reader = Cursor::new(image.into_inner());
        let read_back = read_table(
            &mut reader,
            GxtVersion::ViceCity,
            TableLocation::new(0, 2, 12),
        )?;

        assert_eq!(read_back, table);

        Ok(())
    }

    #[test]
    fn read_table_rejects_duplicate_records() {
        #[rustfmt::skip]
        let image = vec![
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00, 0x00,
            0x48, 0x69, 0x00,
        ];

        let mut reader = Cursor::new(image);
        let result = read_table(
            &mut reader,
            GxtVersion::SanAndreas,
            TableLocation::new(0, 2, 3),
        );

        assert!(matches!(result, Err(Error::ManifestMismatch { .. })));
    }
}
