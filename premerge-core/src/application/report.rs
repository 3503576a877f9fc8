// premerge-core/src/application/report.rs

use std::path::{Path, PathBuf};
use tracing::info;

use crate::application::ports::renderer::ReportRenderer;
use crate::domain::report::{Findings, ProfilingReport};
use crate::error::PremergeError;
use crate::infrastructure::fs::atomic_write_all;
use crate::infrastructure::report::default_renderers;

/// Paths of the files written by one profiling run.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub report: ProfilingReport,
    pub files: Vec<PathBuf>,
}

impl ReportBundle {
    pub fn file(&self, name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|p| p.file_name().is_some_and(|f| f == name))
            .map(PathBuf::as_path)
    }
}

/// Writes the Markdown, JSON and per-column CSV views of `findings` into
/// `out_dir`. Same findings, same bytes. The views replace the previous run's
/// as one set, so the merge gate never reads a JSON older than its Markdown.
pub fn emit_report(
    findings: &Findings,
    out_dir: &Path,
    emit_samples: bool,
) -> Result<ReportBundle, PremergeError> {
    emit_report_with(findings, out_dir, emit_samples, &default_renderers())
}

pub fn emit_report_with(
    findings: &Findings,
    out_dir: &Path,
    emit_samples: bool,
    renderers: &[Box<dyn ReportRenderer>],
) -> Result<ReportBundle, PremergeError> {
    let report = ProfilingReport::from_findings(findings, emit_samples);

    // Render everything before touching the disk
    let rendered = renderers
        .iter()
        .map(|r| Ok((out_dir.join(r.file_name()), r.render(&report)?)))
        .collect::<Result<Vec<_>, PremergeError>>()?;

    atomic_write_all(&rendered)?;
    let files: Vec<PathBuf> = rendered.into_iter().map(|(path, _)| path).collect();
    for path in &files {
        info!(path = ?path, "Report written");
    }

    Ok(ReportBundle { report, files })
}
