use clap::Args;
use gta_gxt::charmap::CharacterMap;
use gta_gxt::load::LoadReport;
use gta_gxt::manifest::FileManifest;
use gta_gxt::read::read_collection;
use gta_gxt::replace::{apply_replace, plan_replace, ReplacePlan};
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use tracing::info;

use super::load_sources;

#[derive(Args)]
pub struct ReplaceArgs {
    /// The GXT file to patch
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The manifest recorded when the file was built
    #[arg(short, long, value_name = "FILE")]
    manifest: PathBuf,

    /// A directory of replacement entry texts
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// The character map file
    #[arg(short, long, value_name = "FILE")]
    charmap: PathBuf,
}

impl ReplaceArgs {
    pub fn handle(&self) -> Result<()> {
        let manifest_file = File::open(&self.manifest)
            .into_diagnostic()
            .context(format!("path: {}", &self.manifest.display()))?;
        let manifest = FileManifest::from_reader(manifest_file)?;

        let map_file = File::open(&self.charmap)
            .into_diagnostic()
            .context(format!("path: {}", &self.charmap.display()))?;
        let charmap = CharacterMap::parse(map_file)?;

        let mut gxt = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;

        let existing = read_collection(&mut gxt, &manifest)?;

        let mut report = LoadReport::default();
        let sources = load_sources(&self.directory, manifest.version, &mut report)?;

        let (plan, outcome) = plan_replace(existing, &sources, &charmap)?;

        for (table, counts) in &outcome.tables {
            println!(
                "{}: {} replaced, {} added, {} unchanged, {} untouched",
                table.bold(),
                counts.replaced.green(),
                counts.added.blue(),
                counts.unchanged.dimmed(),
                counts.untouched.dimmed(),
            );
        }

        match apply_replace(&plan, &manifest.language, &mut gxt)? {
            Some((written, refreshed)) => {
                gxt.set_len(written).into_diagnostic()?;

                let manifest_out = File::create(&self.manifest)
                    .into_diagnostic()
                    .context(format!("creating {}", &self.manifest.display()))?;
                refreshed.to_writer(manifest_out)?;

                info!(
                    "rewrote {} ({} bytes) and refreshed the manifest",
                    self.file.display(),
                    written
                );
            }
            None => match plan {
                ReplacePlan::Unchanged => {
                    info!("{} already matches the replacements", self.file.display())
                }
                _ => info!("patched {} in place", self.file.display()),
            },
        }

        Ok(())
    }
}
