// premerge/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries the command's own progress output
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    match cli.command {
        Commands::Profile {
            project_dir,
            nrows,
            emit_samples,
        } => commands::profile::execute(project_dir, nrows, emit_samples).await,

        Commands::Merge {
            project_dir,
            nrows,
            force,
        } => commands::merge::execute(project_dir, nrows, force).await,
    }
}
