//! Two-phase replacement of entry texts in an existing file.
//!
//! Patching never interleaves reading and writing: [`plan_replace`] mutates tables in memory
//! and decides what has to happen to the file, [`apply_replace`] then executes that decision.
//! A dirty table whose blocks kept their exact sizes is rewritten in place at its recorded
//! offset; once any block changes size, everything behind it would have to move, so the whole
//! image is regenerated instead.

use std::collections::BTreeMap;
use std::io::{Seek, SeekFrom, Write};
use tracing::{info, instrument};

use crate::charmap::CharacterMap;
use crate::error::{Error, Result};
use crate::load::TableSource;
use crate::manifest::FileManifest;
use crate::table::{GxtTable, TableCollection};
use crate::types::{CodeUnitWidth, EntryKey};
use crate::write::{build_manifest, produce_gxt_file};

/// Change tracking for one existing entry during a patch run
///
/// Pairs the CRC-32 of the entry's packed content with a flag recording whether a
/// replacement re-linked the entry this run. Equal hashes mean the replacement text packs to
/// the very same units, so rewriting the entry would change nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VersionControlMap {
    /// CRC-32 of the entry's packed content
    pub text_hash: u32,

    /// Whether a replacement matched this entry during the current run
    pub linked: bool,
}

impl VersionControlMap {
    /// Track an existing entry's packed content.
    pub fn new(units: &[u16], width: CodeUnitWidth) -> VersionControlMap {
        VersionControlMap {
            text_hash: unit_hash(units, width),
            linked: false,
        }
    }
}

/// CRC-32 over the little-endian serialization of a unit run at the table's width.
fn unit_hash(units: &[u16], width: CodeUnitWidth) -> u32 {
    let crc = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);
    let mut digest = crc.digest();
    match width {
        CodeUnitWidth::Wide => {
            for &unit in units {
                digest.update(&unit.to_le_bytes());
            }
        }
        CodeUnitWidth::Narrow => {
            for &unit in units {
                digest.update(&[unit as u8]);
            }
        }
    }
    digest.finalize()
}

/// Per-table outcome counts for one patch run
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    /// Entries whose content actually changed
    pub replaced: usize,

    /// Entries the table did not hold before
    pub added: usize,

    /// Replacements whose packed content matched the file already
    pub unchanged: usize,

    /// Existing entries no replacement touched
    pub untouched: usize,
}

/// Outcome counts per table, for the whole run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaceReport {
    /// Outcomes keyed by table name; only tables with replacement sources appear
    pub tables: BTreeMap<String, TableOutcome>,
}

/// One block rewrite at an absolute offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePatch {
    /// Table name, for reporting
    pub name: String,

    /// Absolute byte offset of the table's entry block
    pub offset: u32,

    /// The rebuilt table to serialize there
    pub table: GxtTable,
}

/// What [`apply_replace`] has to do to the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplacePlan {
    /// Every replacement matched the file's content; nothing to write
    Unchanged,

    /// Every dirty table kept its block sizes; rewrite just those blocks
    InPlace {
        /// The blocks to rewrite, each at its recorded offset
        patches: Vec<TablePatch>,
    },

    /// Some block changed size; the whole image is regenerated
    Rewrite {
        /// The merged collection the new image is produced from
        collection: TableCollection,
    },
}

/// Phase one: fold replacement texts into the collection and decide what must be written.
///
/// Consumes the collection read back from the existing file (offsets recorded). Every
/// replacement source must name a table the manifest knows.
#[instrument(skip_all, err)]
pub fn plan_replace(
    mut existing: TableCollection,
    replacements: &[TableSource],
    charmap: &CharacterMap,
) -> Result<(ReplacePlan, ReplaceReport)> {
    let version = existing.version();
    let width = version.code_unit_width();

    let mut report = ReplaceReport::default();
    let mut dirty: Vec<String> = Vec::new();
    let mut resized = false;

    for source in replacements {
        let block = existing
            .get_mut(&source.name)
            .ok_or_else(|| Error::TableNotFound(source.name.clone()))?;

        let old_entry_block = block.table.num_entries() * block.table.entry_size();
        let old_content = block.table.formatted_content_size();

        let mut control: BTreeMap<EntryKey, VersionControlMap> = {
            let table = &block.table;
            table
                .entries()
                .map(|(key, &offset)| {
                    (
                        *key,
                        VersionControlMap::new(&table.content().entry_units(offset), width),
                    )
                })
                .collect()
        };

        let mut outcome = TableOutcome::default();
        let mut changed: BTreeMap<EntryKey, Vec<u16>> = BTreeMap::new();
        for (key, text) in &source.entries {
            let units = charmap.encode(text)?;
            match control.get_mut(key) {
                Some(entry) => {
                    entry.linked = true;
                    if entry.text_hash == unit_hash(&units, width) {
                        outcome.unchanged += 1;
                    } else {
                        changed.insert(*key, units);
                        outcome.replaced += 1;
                    }
                }
                None => {
                    changed.insert(*key, units);
                    outcome.added += 1;
                }
            }
        }
        outcome.untouched = control.values().filter(|entry| !entry.linked).count();

        if !changed.is_empty() {
            let mut merged: BTreeMap<EntryKey, Vec<u16>> = {
                let table = &block.table;
                table
                    .entries()
                    .map(|(key, &offset)| (*key, table.content().entry_units(offset)))
                    .collect()
            };
            merged.extend(changed);

            let mut rebuilt = GxtTable::new(version);
            for (key, units) in &merged {
                rebuilt.append_entry(*key, units);
            }

            block.table = rebuilt;
            if block.table.num_entries() * block.table.entry_size() != old_entry_block
                || block.table.formatted_content_size() != old_content
            {
                resized = true;
            }
            dirty.push(source.name.clone());
        }

        report.tables.insert(source.name.clone(), outcome);
    }

    if dirty.is_empty() {
        return Ok((ReplacePlan::Unchanged, report));
    }

    if !resized {
        let mut patches = Vec::with_capacity(dirty.len());
        for name in &dirty {
            let Some(block) = existing.get(name) else {
                return Err(Error::TableNotFound(name.clone()));
            };
            match block.absolute_offset {
                Some(offset) => patches.push(TablePatch {
                    name: name.clone(),
                    offset,
                    table: block.table.clone(),
                }),
                // a dirty table that never landed anywhere cannot be patched in place
                None => {
                    resized = true;
                    break;
                }
            }
        }
        if !resized {
            info!("{} table(s) fit in place", patches.len());
            return Ok((ReplacePlan::InPlace { patches }, report));
        }
    }

    info!("block sizes changed, planning a full rewrite");
    Ok((ReplacePlan::Rewrite { collection: existing }, report))
}

/// Phase two: execute the plan against the file.
///
/// In-place patches seek to each recorded offset and rewrite that table's two blocks. A
/// rewrite regenerates the image from offset zero and returns the new length together with
/// the refreshed manifest; the caller truncates the file to that length and replaces the old
/// manifest.
#[instrument(skip_all, err)]
pub fn apply_replace<W: Write + Seek>(
    plan: &ReplacePlan,
    language: &str,
    file: &mut W,
) -> Result<Option<(u64, FileManifest)>> {
    match plan {
        ReplacePlan::Unchanged => {
            info!("no content changed, nothing to write");
            Ok(None)
        }
        ReplacePlan::InPlace { patches } => {
            for patch in patches {
                info!(
                    "patching table {} in place at offset {}",
                    patch.name, patch.offset
                );
                file.seek(SeekFrom::Start(u64::from(patch.offset)))?;
                patch.table.write_entries(file)?;
                patch.table.write_content(file)?;
            }
            Ok(None)
        }
        ReplacePlan::Rewrite { collection } => {
            file.seek(SeekFrom::Start(0))?;
            let written = produce_gxt_file(language, collection, file)?;
            Ok(Some((written, build_manifest(language, collection))))
        }
    }
}

#[cfg(test)]
mod test {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use crate::charmap::{CharacterMap, CHARACTER_MAP_SIZE};
    use crate::error::Result;
    use crate::load::TableSource;
    use crate::replace::{plan_replace, ReplacePlan};
    use crate::table::{GxtTable, TableBlock, TableCollection, MAIN_TABLE};
    use crate::types::{EntryKey, GxtVersion};

    fn latin_map() -> CharacterMap {
        let mut cells = ['\0'; CHARACTER_MAP_SIZE];
        for (index, cell) in cells.iter_mut().enumerate() {
            *cell = char::from_u32(32 + index as u32).unwrap();
        }
        CharacterMap::new(cells)
    }

    fn existing_collection() -> TableCollection {
        let mut main = GxtTable::new(GxtVersion::SanAndreas);
        main.append_entry(EntryKey::Hash(1), &[0x48, 0x69]); // Hi
        main.append_entry(EntryKey::Hash(2), &[0x59, 0x6F]); // Yo
        TableCollection::new(MAIN_TABLE, TableBlock::at_offset(main, 4))
    }

    fn source(entries: &[(u32, &str)]) -> TableSource {
        TableSource {
            name: MAIN_TABLE.to_owned(),
            entries: entries
                .iter()
                .map(|(hash, text)| (EntryKey::Hash(*hash), (*text).to_owned()))
                .collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn matching_content_plans_nothing() -> Result<()> {
        let (plan, report) =
            plan_replace(existing_collection(), &[source(&[(1, "Hi")])], &latin_map())?;

        assert_eq!(plan, ReplacePlan::Unchanged);
        let outcome = report.tables[MAIN_TABLE];
        assert_eq!(outcome.unchanged, 1);
        assert_eq!(outcome.untouched, 1);
        assert_eq!(outcome.replaced, 0);

        Ok(())
    }

    #[test]
    fn same_size_replacement_patches_in_place() -> Result<()> {
        let (plan, report) =
            plan_replace(existing_collection(), &[source(&[(1, "Ha")])], &latin_map())?;

        let ReplacePlan::InPlace { patches } = plan else {
            panic!("expected an in-place plan, got {plan:?}");
        };
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].offset, 4);
        assert_eq!(
            patches[0].table.content().entry_units(0),
            vec![0x48, 0x61]
        );
        // the untouched entry keeps its content
        assert_eq!(
            patches[0].table.content().entry_units(3),
            vec![0x59, 0x6F]
        );
        assert_eq!(report.tables[MAIN_TABLE].replaced, 1);

        Ok(())
    }

    #[test]
    fn growing_replacement_plans_a_rewrite() -> Result<()> {
        let (plan, report) = plan_replace(
            existing_collection(),
            &[source(&[(1, "Howdy")])],
            &latin_map(),
        )?;

        let ReplacePlan::Rewrite { collection } = plan else {
            panic!("expected a rewrite plan, got {plan:?}");
        };
        let (_, block) = collection.main();
        assert_eq!(block.table.num_entries(), 2);
        assert_eq!(
            block.table.content().entry_units(0),
            vec![0x48, 0x6F, 0x77, 0x64, 0x79]
        );
        assert_eq!(report.tables[MAIN_TABLE].replaced, 1);

        Ok(())
    }

    #[test]
    fn new_keys_are_appended() -> Result<()> {
        let (plan, report) =
            plan_replace(existing_collection(), &[source(&[(9, "New")])], &latin_map())?;

        let ReplacePlan::Rewrite { collection } = plan else {
            panic!("expected a rewrite plan, got {plan:?}");
        };
        let (_, block) = collection.main();
        assert_eq!(block.table.num_entries(), 3);
        assert!(block.table.offset_of(&EntryKey::Hash(9)).is_some());
        assert_eq!(report.tables[MAIN_TABLE].added, 1);

        Ok(())
    }

    #[test]
    fn unknown_table_is_an_error() {
        let mut bad = source(&[(1, "Hi")]);
        bad.name = "NOPE".to_owned();

        let result = plan_replace(existing_collection(), &[bad], &latin_map());
        assert!(result.is_err());
    }
}
