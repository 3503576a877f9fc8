// premerge-core/src/infrastructure/report/json.rs

use crate::application::ports::renderer::ReportRenderer;
use crate::domain::report::ProfilingReport;
use crate::error::PremergeError;
use crate::infrastructure::error::InfrastructureError;

/// Machine-readable view, read back by `premerge merge`. Checks live in a
/// `BTreeMap`, so key order is stable across runs.
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn file_name(&self) -> &'static str {
        "profile_report.json"
    }

    fn render(&self, report: &ProfilingReport) -> Result<String, PremergeError> {
        let mut json = serde_json::to_string_pretty(report).map_err(InfrastructureError::from)?;
        json.push('\n');
        Ok(json)
    }
}

pub fn parse_report(content: &str) -> Result<ProfilingReport, InfrastructureError> {
    Ok(serde_json::from_str(content)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::report::Findings;

    #[test]
    fn test_json_has_documented_top_level_sections() {
        let report = ProfilingReport::from_findings(
            &Findings {
                project: "p".into(),
                ..Default::default()
            },
            false,
        );
        let json = JsonRenderer.render(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        for key in ["project", "samples_included", "summary", "tables", "checks", "years_present", "columns"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(parse_report(&json).unwrap(), report);
    }
}
