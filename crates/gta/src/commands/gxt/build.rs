use clap::Args;
use gta_gxt::charmap::CharacterMap;
use gta_gxt::load::{build_collection, LoadReport};
use gta_gxt::write::{build_manifest, produce_gxt_file};
use gta_gxt::GxtVersion;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, path::PathBuf};
use tracing::{info, warn};

use super::{load_sources, Version};

#[derive(Args)]
pub struct BuildArgs {
    /// Game version to target
    #[arg(short, long, value_enum)]
    version: Version,

    /// A directory of entry text files, MAIN.txt included
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// The character map file
    #[arg(short, long, value_name = "FILE")]
    charmap: PathBuf,

    /// A target GXT file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Where to record the table manifest
    #[arg(short, long, value_name = "FILE")]
    manifest: Option<PathBuf>,

    /// Language recorded in the manifest
    #[arg(short, long, default_value = "american")]
    language: String,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl BuildArgs {
    pub fn handle(&self) -> Result<()> {
        let version: GxtVersion = self.version.into();
        info!("building a {} file from {}", version, self.directory.display());

        let map_file = File::open(&self.charmap)
            .into_diagnostic()
            .context(format!("path: {}", &self.charmap.display()))?;
        let charmap = CharacterMap::parse(map_file)?;

        let mut report = LoadReport::default();
        let sources = load_sources(&self.directory, version, &mut report)?;
        let collection = build_collection(sources, version, &charmap, &mut report)?;

        let mut out = if !self.overwrite {
            File::create_new(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        } else {
            File::create(&self.output)
                .into_diagnostic()
                .context(format!("creating {}", &self.output.display()))?
        };

        let written = produce_gxt_file(&self.language, &collection, &mut out)?;
        info!("wrote {} bytes to {}", written, self.output.display());

        if let Some(path) = &self.manifest {
            let manifest_out = File::create(path)
                .into_diagnostic()
                .context(format!("creating {}", &path.display()))?;
            build_manifest(&self.language, &collection).to_writer(manifest_out)?;
            info!("recorded manifest at {}", path.display());
        }

        if !report.is_clean() {
            warn!(
                "{} line(s) were skipped, see the warnings above",
                report.issues().len()
            );
        }

        Ok(())
    }
}
