// premerge-core/src/application/ports/renderer.rs

use crate::domain::report::ProfilingReport;
use crate::error::PremergeError;

/// One view of the canonical report. Rendering must be a pure function of
/// the report so that two runs on the same findings produce identical bytes.
pub trait ReportRenderer: Send + Sync {
    fn file_name(&self) -> &'static str;
    fn render(&self, report: &ProfilingReport) -> Result<String, PremergeError>;
}
