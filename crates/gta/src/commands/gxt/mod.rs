pub mod build;
pub mod list;
pub mod replace;

use clap::ValueEnum;
use gta_gxt::load::{read_entry_file, LoadReport, TableSource};
use gta_gxt::GxtVersion;
use miette::{miette, Result};
use std::path::Path;
use walkdir::WalkDir;

#[derive(clap::Subcommand)]
pub enum GxtCommands {
    /// Build a GXT file from a directory of entry texts
    Build(build::BuildArgs),
    /// Patch entry texts inside an existing GXT file
    Replace(replace::ReplaceArgs),
    /// List the entries of an existing GXT file
    List(list::ListArgs),
}

impl GxtCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            GxtCommands::Build(build) => build.handle(),
            GxtCommands::Replace(replace) => replace.handle(),
            GxtCommands::List(list) => list.handle(),
        }
    }
}

/// Game version selector shared by the subcommands
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Version {
    /// Vice City: headerless, name-keyed, 16-bit characters
    Vc,
    /// San Andreas: hash-keyed, 8-bit characters
    Sa,
    /// San Andreas mobile: hash-keyed, 16-bit characters
    SaMobile,
}

impl From<Version> for GxtVersion {
    fn from(value: Version) -> Self {
        match value {
            Version::Vc => GxtVersion::ViceCity,
            Version::Sa => GxtVersion::SanAndreas,
            Version::SaMobile => GxtVersion::SanAndreasMobile,
        }
    }
}

/// Load every `.txt` table file directly under a directory, in name order.
pub(crate) fn load_sources(
    directory: &Path,
    version: GxtVersion,
    report: &mut LoadReport,
) -> Result<Vec<TableSource>> {
    let files = WalkDir::new(directory)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
        })
        .collect::<Vec<_>>();

    if files.is_empty() {
        return Err(miette!(
            "{} contains no entry text files",
            directory.display()
        ));
    }

    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        if let Some(source) = read_entry_file(file.path(), version, report)? {
            sources.push(source);
        }
    }
    Ok(sources)
}
