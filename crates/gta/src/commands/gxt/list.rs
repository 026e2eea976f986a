use clap::Args;
use gta_gxt::charmap::CharacterMap;
use gta_gxt::manifest::FileManifest;
use gta_gxt::read::read_collection;
use gta_gxt::table::TableBlock;
use miette::{miette, Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use std::fs::File;
use std::path::PathBuf;

#[derive(Args)]
pub struct ListArgs {
    /// An input GXT file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// The manifest recorded when the file was built
    #[arg(short, long, value_name = "FILE")]
    manifest: PathBuf,

    /// The character map file
    #[arg(short, long, value_name = "FILE")]
    charmap: PathBuf,

    /// Only list this table
    #[arg(short, long, value_name = "NAME")]
    table: Option<String>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let manifest_file = File::open(&self.manifest)
            .into_diagnostic()
            .context(format!("path: {}", &self.manifest.display()))?;
        let manifest = FileManifest::from_reader(manifest_file)?;

        let map_file = File::open(&self.charmap)
            .into_diagnostic()
            .context(format!("path: {}", &self.charmap.display()))?;
        let charmap = CharacterMap::parse(map_file)?;

        let mut gxt = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let collection = read_collection(&mut gxt, &manifest)?;

        if let Some(wanted) = &self.table {
            let block = collection.get(wanted).ok_or_else(|| {
                miette!("table {} is not present in {}", wanted, self.file.display())
            })?;
            print_table(wanted, block, &charmap)?;
        } else {
            for (name, block) in collection.tables() {
                print_table(name, block, &charmap)?;
            }
        }

        Ok(())
    }
}

fn print_table(name: &str, block: &TableBlock, charmap: &CharacterMap) -> Result<()> {
    println!("[{}]", name.bold());
    for (key, text) in block.table.decoded_entries(charmap)? {
        println!("{key}\t{text}");
    }
    Ok(())
}
