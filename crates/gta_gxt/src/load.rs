//! Loading entry text files into tables.
//!
//! One UTF-8 text file per table, named after its table: `MAIN.txt` plus one file per
//! mission table. Each line is `name<TAB>text`; `#` starts a comment line. Hash-keyed
//! versions additionally accept a `0x`-prefixed hex literal as a verbatim key.
//!
//! Per-line problems never abort a load: they are collected into a [`LoadReport`] and the
//! first occurrence of a key wins. Only structural problems (an unreadable file, a table
//! name that cannot be a GXT table name, a character missing from the map) are fatal.

use derive_more::derive::Display;
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::charmap::CharacterMap;
use crate::error::{Error, Result};
use crate::table::{GxtTable, TableBlock, TableCollection, MAIN_TABLE};
use crate::types::{EntryKey, GxtVersion, ENTRY_NAME_LEN, TABLE_NAME_LEN};

/// A recoverable problem found while loading entry texts
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum LoadIssue {
    /// A key that already exists in the table; the first occurrence wins
    #[display("entry {name} duplicated in table {table} (line {line})")]
    DuplicateEntry {
        /// Table being loaded
        table: String,
        /// Entry name as written in the file
        name: String,
        /// One-based source line
        line: u64,
    },

    /// An entry name of 8 or more characters
    #[display("entry name {name} at line {line} is too long, entry names must be shorter than {ENTRY_NAME_LEN} characters")]
    NameTooLong {
        /// Table being loaded
        table: String,
        /// Entry name as written in the file
        name: String,
        /// One-based source line
        line: u64,
    },

    /// An entry name holding non-ASCII characters
    #[display("entry name {name} at line {line} contains non-ASCII characters, only ASCII can be used for entry names")]
    NameNotAscii {
        /// Table being loaded
        table: String,
        /// Entry name as written in the file
        name: String,
        /// One-based source line
        line: u64,
    },

    /// A `0x` key that is not a valid 32-bit hex literal
    #[display("entry name {name} at line {line} has an invalid hex value")]
    InvalidHexLiteral {
        /// Table being loaded
        table: String,
        /// Entry name as written in the file
        name: String,
        /// One-based source line
        line: u64,
    },

    /// A file that is not valid UTF-8; the whole file is skipped
    #[display("{path:?} contains invalid UTF-8 characters, skipping the file")]
    InvalidUtf8File {
        /// The offending file
        path: PathBuf,
    },

    /// A table name appearing more than once across the inputs; the first wins
    #[display("table {name} appears more than once, keeping the first")]
    DuplicateTable {
        /// The duplicated table name
        name: String,
    },
}

/// Diagnostics collected across one load run
///
/// The log sink handed to loader operations: every recorded issue is also surfaced through
/// `tracing::warn!` as it happens.
#[derive(Debug, Default)]
pub struct LoadReport {
    issues: Vec<LoadIssue>,
}

impl LoadReport {
    /// Record one issue, surfacing it on the warning log.
    pub fn record(&mut self, issue: LoadIssue) {
        warn!("{issue}");
        self.issues.push(issue);
    }

    /// Every issue recorded so far, in the order found.
    pub fn issues(&self) -> &[LoadIssue] {
        &self.issues
    }

    /// Whether the run saw no issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// One table's decoded entry texts, in source order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    /// Table name, uppercased
    pub name: String,

    /// Entry key to decoded text, first occurrence wins
    pub entries: IndexMap<EntryKey, String>,
}

impl TableSource {
    /// Parse one table's entry lines.
    ///
    /// Lines without a tab separator are skipped silently; everything else that fails a
    /// check lands in the report and the line is dropped.
    pub fn parse(
        name: impl Into<String>,
        text: &str,
        version: GxtVersion,
        report: &mut LoadReport,
    ) -> TableSource {
        let name = name.into();
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);

        let mut entries = IndexMap::new();
        for (index, line) in text.lines().enumerate() {
            let line_number = index as u64 + 1;

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(tab) = line.find('\t') else {
                continue;
            };

            let raw_name = &line[..tab];
            let content = line[tab..].trim_start_matches('\t');
            if raw_name.is_empty() {
                continue;
            }

            let hex_literal = version.uses_hash_keys()
                && raw_name.len() >= 3
                && (raw_name.starts_with("0x") || raw_name.starts_with("0X"));

            let key = if hex_literal {
                match u32::from_str_radix(&raw_name[2..], 16) {
                    Ok(hash) => EntryKey::Hash(hash),
                    Err(_) => {
                        report.record(LoadIssue::InvalidHexLiteral {
                            table: name.clone(),
                            name: raw_name.to_owned(),
                            line: line_number,
                        });
                        continue;
                    }
                }
            } else {
                if !raw_name.is_ascii() {
                    report.record(LoadIssue::NameNotAscii {
                        table: name.clone(),
                        name: raw_name.to_owned(),
                        line: line_number,
                    });
                    continue;
                }
                if raw_name.len() >= ENTRY_NAME_LEN {
                    report.record(LoadIssue::NameTooLong {
                        table: name.clone(),
                        name: raw_name.to_owned(),
                        line: line_number,
                    });
                    continue;
                }
                EntryKey::for_version(version, raw_name)
            };

            if entries.contains_key(&key) {
                report.record(LoadIssue::DuplicateEntry {
                    table: name.clone(),
                    name: raw_name.to_owned(),
                    line: line_number,
                });
                continue;
            }
            entries.insert(key, content.to_owned());
        }

        TableSource { name, entries }
    }
}

/// Read one entry text file; the table is named after the uppercased file stem.
///
/// Returns `None` (with the problem recorded) when the file is not valid UTF-8; that skips
/// the file without poisoning the run.
#[instrument(skip(report), err)]
pub fn read_entry_file(
    path: &Path,
    version: GxtVersion,
    report: &mut LoadReport,
) -> Result<Option<TableSource>> {
    let raw = fs::read(path)?;
    let Ok(text) = std::str::from_utf8(&raw) else {
        report.record(LoadIssue::InvalidUtf8File {
            path: path.to_path_buf(),
        });
        return Ok(None);
    };

    let name = table_name_of(path)?;
    info!("reading entries from {}", path.display());

    Ok(Some(TableSource::parse(name, text, version, report)))
}

fn table_name_of(path: &Path) -> Result<String> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    if stem.is_empty() || stem.len() > TABLE_NAME_LEN || !stem.is_ascii() {
        return Err(Error::InvalidTableName(stem.to_owned()));
    }
    Ok(stem.to_ascii_uppercase())
}

/// Encode loaded sources into a table collection.
///
/// Fails when no `MAIN` source is present or when any text holds a character the map does
/// not; a duplicated table name keeps the first source and records the issue.
#[instrument(skip_all, err)]
pub fn build_collection(
    sources: Vec<TableSource>,
    version: GxtVersion,
    charmap: &CharacterMap,
    report: &mut LoadReport,
) -> Result<TableCollection> {
    let mut main: Option<TableBlock> = None;
    let mut missions: BTreeMap<String, TableBlock> = BTreeMap::new();

    for source in sources {
        let duplicate = (source.name == MAIN_TABLE && main.is_some())
            || missions.contains_key(&source.name);
        if duplicate {
            report.record(LoadIssue::DuplicateTable { name: source.name });
            continue;
        }

        let mut table = GxtTable::new(version);
        for (key, text) in &source.entries {
            let units = charmap.encode(text)?;
            table.append_entry(*key, &units);
        }

        if source.name == MAIN_TABLE {
            main = Some(TableBlock::new(table));
        } else {
            missions.insert(source.name, TableBlock::new(table));
        }
    }

    let main = main.ok_or(Error::MissingMainTable)?;
    Ok(TableCollection::with_missions(MAIN_TABLE, main, missions))
}
