mod commands;

use clap::Parser;
use commands::{execute_command, Commands};
use std::path::PathBuf;

/// Local index of your Last.fm album play history
#[derive(Parser)]
#[command(
    name = "scrobble-index",
    about = "Local index of your Last.fm album play history",
    long_about = None
)]
struct Cli {
    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    /// Directory holding history_index.json and sync_settings.json
    /// (defaults to the XDG data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = execute_command(args.command, args.data_dir).await {
        eprintln!("❌ Command failed: {e}");
        std::process::exit(1);
    }

    Ok(())
}
