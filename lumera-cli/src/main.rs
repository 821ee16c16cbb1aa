use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod login;
mod sync;

use commands::backup::BackupArgs;
use commands::create_gallery::CreateGalleryArgs;
use commands::create_group::CreateGroupArgs;
use commands::upload::UploadArgs;

#[derive(Debug, Parser)]
#[command(name = "lumera", version, about = "Mirror local photo directories to Lumera")]
struct Cli {
    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mirror a local directory tree onto a remote group
    Backup(BackupArgs),
    /// Upload images to a gallery
    Upload(UploadArgs),
    /// Create a gallery under an existing group
    CreateGallery(CreateGalleryArgs),
    /// Create a group under an existing group
    CreateGroup(CreateGroupArgs),
}

fn default_directives(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(cli.verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match cli.command {
        Command::Backup(args) => commands::backup::run(args).await,
        Command::Upload(args) => commands::upload::run(args).await,
        Command::CreateGallery(args) => commands::create_gallery::run(args).await,
        Command::CreateGroup(args) => commands::create_group::run(args).await,
    }
}
