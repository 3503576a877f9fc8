// premerge/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "premerge")]
#[command(about = "Pre-merge integrity profiler and light ETL for linked public CSV datasets", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Log debug events to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🔎 Profiles the raw tables and writes the integrity reports
    Profile {
        /// Project directory (holds premerge.yaml and data/raw)
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Read at most N data rows per file
        #[arg(long)]
        nrows: Option<usize>,

        /// Include literal row values of offending records in the reports
        #[arg(long)]
        emit_samples: bool,
    },

    /// 🔗 Cleans the tables and writes enriched Parquet files
    Merge {
        /// Project directory (holds premerge.yaml and data/raw)
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Read at most N data rows per file
        #[arg(long)]
        nrows: Option<usize>,

        /// Merge even if the last profile flagged duplicate root keys
        #[arg(long)]
        force: bool,
    },
}
