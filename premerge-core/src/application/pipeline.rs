// premerge-core/src/application/pipeline.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::application::load::load_tables;
use crate::application::merge::{MergeSummary, check_merge_gate, merge_tables};
use crate::application::profiler::profile;
use crate::application::report::{ReportBundle, emit_report};
use crate::domain::project::ProjectConfig;
use crate::domain::table::RawTable;
use crate::error::PremergeError;
use crate::infrastructure::adapters::{CsvSource, ParquetSink};
use crate::infrastructure::config::load_project_config;
use crate::infrastructure::discovery::{locate_sources, resolve_data_root};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileOptions {
    /// Read at most this many data rows per file.
    pub row_limit: Option<usize>,
    /// Include literal row values in the written report.
    pub emit_samples: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub row_limit: Option<usize>,
    /// Merge even when the last profiling run flagged blocking failures.
    pub force: bool,
}

#[derive(Debug)]
pub struct ProfileRun {
    pub data_root: PathBuf,
    pub bundle: ReportBundle,
}

#[derive(Debug)]
pub struct MergeRun {
    pub data_root: PathBuf,
    pub summary: MergeSummary,
}

/// Config, discovery and the parallel load shared by both commands.
async fn load_project(
    project_dir: &Path,
    row_limit: Option<usize>,
) -> Result<(ProjectConfig, PathBuf, Vec<RawTable>), PremergeError> {
    let config = load_project_config(project_dir)?;
    let data_root = resolve_data_root(project_dir, &config)?;
    let located = locate_sources(&data_root, &config.tables)?;
    for l in &located {
        info!(table = %l.table.name, path = ?l.path, "Source located");
    }

    let tables = load_tables(Arc::new(CsvSource), &config, located, row_limit).await?;
    Ok((config, data_root, tables))
}

/// Load, check, report. Findings never fail the run; only load and
/// configuration problems do, and then nothing is written.
pub async fn run_profile(
    project_dir: &Path,
    options: ProfileOptions,
) -> Result<ProfileRun, PremergeError> {
    let (config, data_root, tables) = load_project(project_dir, options.row_limit).await?;
    let findings = profile(&tables, &config)?;

    let out_dir = project_dir.join(&config.output_path);
    let bundle = emit_report(&findings, &out_dir, options.emit_samples)?;
    Ok(ProfileRun { data_root, bundle })
}

pub async fn run_merge(project_dir: &Path, options: MergeOptions) -> Result<MergeRun, PremergeError> {
    let config = load_project_config(project_dir)?;
    let report_path = project_dir
        .join(&config.output_path)
        .join("profile_report.json");
    check_merge_gate(&report_path, options.force)?;

    let (config, data_root, tables) = load_project(project_dir, options.row_limit).await?;
    let sink = ParquetSink::new(&project_dir.join(&config.processed_path));
    let summary = merge_tables(tables, &config, &sink)?;
    Ok(MergeRun { data_root, summary })
}
