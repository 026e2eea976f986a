pub mod gxt;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle GXT files
    Gxt {
        #[command(subcommand)]
        command: gxt::GxtCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Gxt { command } => command.handle(),
        }
    }
}
