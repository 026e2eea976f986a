//! Producing complete GXT file images.

use binrw::BinWrite;
use std::io::{Seek, Write};
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::manifest::{FileManifest, TableLocation};
use crate::table::TableCollection;

/// Compute every table's absolute location before a single byte is written.
///
/// Entry records carry offsets computed against the final layout, so block sizes have to be
/// known up front. Returns locations in file order: main table first, then missions
/// ascending by name.
pub fn plan_layout(collection: &TableCollection) -> Vec<(String, TableLocation)> {
    let version = collection.version();

    let mut cursor = version.header_size() as u32;
    let mut locations = Vec::with_capacity(collection.num_tables());
    for (name, block) in collection.tables() {
        let location = TableLocation::new(
            cursor,
            block.table.num_entries() as u32,
            block.table.formatted_content_size() as u32,
        );
        cursor = location.end_offset(version);
        locations.push((name.to_owned(), location));
    }
    locations
}

/// The manifest a build of this collection would record.
pub fn build_manifest(language: &str, collection: &TableCollection) -> FileManifest {
    FileManifest {
        version: collection.version(),
        language: language.to_owned(),
        main_table: collection.main().0.to_owned(),
        tables: plan_layout(collection).into_iter().collect(),
    }
}

/// Serialize a collection into a complete GXT file image.
///
/// A pure function of its inputs: the version header (if the version carries one), then per
/// table the entry block followed by the content blob, main table first and missions in
/// ascending name order, no padding anywhere. Returns the number of bytes written.
///
/// A table with no entries fails the whole build: an empty block is far more likely a
/// missing input than an intentionally blank table.
#[instrument(skip(collection, writer), err)]
pub fn produce_gxt_file<W: Write + Seek>(
    language: &str,
    collection: &TableCollection,
    writer: &mut W,
) -> Result<u64> {
    let version = collection.version();

    for (name, block) in collection.tables() {
        if block.table.is_empty() {
            return Err(Error::EmptyTable(name.to_owned()));
        }
    }

    let mut written = 0u64;
    if let Some(header) = version.header() {
        header.write(writer)?;
        written += version.header_size() as u64;
    }

    for (name, block) in collection.tables() {
        info!(
            "writing table {} ({} entries)",
            name,
            block.table.num_entries()
        );
        written += block.table.write_entries(writer)?;
        written += block.table.write_content(writer)?;
    }

    info!("produced {language} image, {written} bytes");
    Ok(written)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::manifest::TableLocation;
    use crate::table::{GxtTable, TableBlock, TableCollection, MAIN_TABLE};
    use crate::types::{EntryKey, GxtVersion};
    use crate::write::{plan_layout, produce_gxt_file};
    use std::collections::BTreeMap;
    use std::io::Cursor;

    fn sa_collection() -> TableCollection {
        let mut main = GxtTable::new(GxtVersion::SanAndreas);
        main.append_entry(EntryKey::Hash(1), &[0x48, 0x69]);
        main.append_entry(EntryKey::Hash(2), &[0x59, 0x6F]);

        let mut intro = GxtTable::new(GxtVersion::SanAndreas);
        intro.append_entry(EntryKey::Hash(3), &[0x4F, 0x6B]);

        TableCollection::with_missions(
            MAIN_TABLE,
            TableBlock::new(main),
            BTreeMap::from([("INTRO".to_owned(), TableBlock::new(intro))]),
        )
    }

    #[test]
    fn layout_places_blocks_back_to_back() {
        let layout = plan_layout(&sa_collection());

        assert_eq!(
            layout,
            vec![
                // header is 4 bytes; MAIN holds 2 records and 6 content bytes
                ("MAIN".to_owned(), TableLocation::new(4, 2, 6)),
                ("INTRO".to_owned(), TableLocation::new(26, 1, 3)),
            ]
        );
    }

    #[test]
    fn empty_table_fails_the_build() {
        let collection = TableCollection::new(
            MAIN_TABLE,
            TableBlock::new(GxtTable::new(GxtVersion::SanAndreas)),
        );

        let mut writer = Cursor::new(Vec::new());
        let result = produce_gxt_file("american", &collection, &mut writer);
        assert!(matches!(result, Err(Error::EmptyTable(name)) if name == "MAIN"));
    }

    #[test]
    fn written_length_matches_layout_end() -> Result<()> {
        let collection = sa_collection();
        let layout = plan_layout(&collection);
        let end = layout.last().unwrap().1.end_offset(collection.version());

        let mut writer = Cursor::new(Vec::new());
        let written = produce_gxt_file("american", &collection, &mut writer)?;

        assert_eq!(written, u64::from(end));
        assert_eq!(writer.into_inner().len() as u64, written);

        Ok(())
    }
}
