// premerge-core/src/infrastructure/report/columns.rs

use crate::application::ports::renderer::ReportRenderer;
use crate::domain::report::ProfilingReport;
use crate::domain::table::render_number;
use crate::error::PremergeError;
use crate::infrastructure::error::InfrastructureError;

const HEADER: [&str; 15] = [
    "table",
    "column",
    "kind",
    "row_count",
    "null_count",
    "null_rate",
    "distinct_count",
    "sentinel_count",
    "malformed_count",
    "min",
    "max",
    "mean",
    "earliest",
    "latest",
    "top_values",
];

/// `column_profiles.csv`: one row per (table, column).
pub struct ColumnProfilesRenderer;

impl ReportRenderer for ColumnProfilesRenderer {
    fn file_name(&self) -> &'static str {
        "column_profiles.csv"
    }

    fn render(&self, report: &ProfilingReport) -> Result<String, PremergeError> {
        Ok(render_column_profiles(report)?)
    }
}

fn render_column_profiles(report: &ProfilingReport) -> Result<String, InfrastructureError> {
    let writer_err = |e: csv::Error| InfrastructureError::ReportWriter(e.to_string());
    let opt = |n: Option<f64>| n.map(render_number).unwrap_or_default();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).map_err(writer_err)?;

    for p in &report.columns {
        let top = p
            .top_values
            .iter()
            .map(|v| format!("{}:{}", v.value, v.count))
            .collect::<Vec<_>>()
            .join("; ");
        writer
            .write_record([
                p.table.clone(),
                p.column.clone(),
                p.kind.as_str().to_string(),
                p.row_count.to_string(),
                p.null_count.to_string(),
                format!("{:.6}", p.null_rate),
                p.distinct_count.to_string(),
                p.sentinel_count.to_string(),
                p.malformed_count.to_string(),
                opt(p.min),
                opt(p.max),
                p.mean.map(|m| format!("{m:.6}")).unwrap_or_default(),
                p.earliest.clone().unwrap_or_default(),
                p.latest.clone().unwrap_or_default(),
                top,
            ])
            .map_err(writer_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| InfrastructureError::ReportWriter(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| InfrastructureError::ReportWriter(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::quality::profile_columns;
    use crate::domain::report::Findings;
    use crate::domain::table::{Column, ColumnKind, RawTable, Value};

    #[test]
    fn test_one_row_per_column_with_quoted_top_values() {
        let table = RawTable::new(
            "collisions",
            vec![
                Column::new(
                    "speed_limit",
                    ColumnKind::Numeric,
                    vec![Value::Number(30.0), Value::Number(70.0), Value::Missing],
                ),
                Column::new(
                    "weather",
                    ColumnKind::Categorical,
                    vec![
                        Value::Text("Fine, no wind".into()),
                        Value::Text("Fine, no wind".into()),
                        Value::Text("Rain".into()),
                    ],
                ),
            ],
        );
        let findings = Findings {
            project: "p".into(),
            columns: profile_columns(&table, 5),
            ..Default::default()
        };
        let csv = ColumnProfilesRenderer
            .render(&ProfilingReport::from_findings(&findings, false))
            .unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("table,column,kind,row_count"));
        assert!(lines[1].starts_with("collisions,speed_limit,numeric,3,1,0.333333,2,0,0,30,70,50.000000,"));
        assert!(lines[2].ends_with("\"Fine, no wind:2; Rain:1\""));
    }
}
