mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stowage",
    about = "Package directory trees into reproducible deployment archives"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package a directory into a deterministic zip archive
    Pack {
        /// Source directory to package
        source: PathBuf,
        /// Output archive path (default: stowage.toml [pack].output, then <source>.zip)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Store entries uncompressed instead of deflating
        #[arg(long)]
        store: bool,
    },
    /// Extract a zip or tar archive into a directory
    Unpack {
        /// Archive to extract (.zip, .tar, .tar.gz)
        archive: PathBuf,
        /// Destination directory
        dest: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Pack {
            source,
            output,
            store,
        } => commands::pack(&source, output.as_deref(), store)?,
        Commands::Unpack { archive, dest } => commands::unpack(&archive, &dest)?,
    }

    Ok(())
}
