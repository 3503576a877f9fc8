// premerge-core/src/infrastructure/report/markdown.rs

use comfy_table::{Table, presets::ASCII_MARKDOWN};
use std::fmt::Write;

use crate::application::ports::renderer::ReportRenderer;
use crate::domain::report::{CheckOutcome, CheckResult, CheckStatus, ProfilingReport};
use crate::domain::table::render_number;
use crate::error::PremergeError;

pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn file_name(&self) -> &'static str {
        "profile_report.md"
    }

    fn render(&self, report: &ProfilingReport) -> Result<String, PremergeError> {
        render_markdown(report).map_err(|e| PremergeError::InternalError(e.to_string()))
    }
}

fn render_markdown(report: &ProfilingReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "# Pre-merge integrity profile: {}", report.project)?;
    writeln!(out)?;

    // --- SUMMARY ---
    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(
        out,
        "- Checks: {} total, {} passed, {} failed",
        report.summary.checks_total, report.summary.checks_passed, report.summary.checks_failed
    )?;
    if report.summary.blocking_failures.is_empty() {
        writeln!(out, "- Blocking failures: none")?;
    } else {
        writeln!(
            out,
            "- Blocking failures: {}",
            report.summary.blocking_failures.join(", ")
        )?;
    }
    writeln!(
        out,
        "- Row samples: {}",
        if report.samples_included {
            "included"
        } else {
            "omitted (re-run with --emit-samples)"
        }
    )?;
    writeln!(out)?;

    // --- TABLES ---
    writeln!(out, "## Tables")?;
    writeln!(out)?;
    let mut tables = Table::new();
    tables
        .load_preset(ASCII_MARKDOWN)
        .set_header(vec!["Table", "Source", "Rows", "Columns", "Row limit"]);
    for t in &report.tables {
        let limit = match (t.row_limit, t.truncated) {
            (Some(n), true) => format!("{n} (truncated)"),
            (Some(n), false) => n.to_string(),
            (None, _) => "-".to_string(),
        };
        tables.add_row(vec![
            t.name.clone(),
            t.source.clone(),
            t.row_count.to_string(),
            t.column_count.to_string(),
            limit,
        ]);
    }
    writeln!(out, "{tables}")?;
    writeln!(out)?;

    // --- CHECKS ---
    writeln!(out, "## Checks")?;
    writeln!(out)?;
    writeln!(out, "{}", render_check_list(report))?;
    writeln!(out)?;

    let failing: Vec<(&String, &CheckResult)> = report
        .checks
        .iter()
        .filter(|(_, c)| c.status == CheckStatus::Fail)
        .collect();
    if !failing.is_empty() {
        writeln!(out, "## Failing checks")?;
        for (name, check) in failing {
            writeln!(out)?;
            writeln!(out, "### {name}")?;
            writeln!(out)?;
            write_details(&mut out, &check.outcome)?;
        }
        writeln!(out)?;
    }

    // --- YEARS ---
    if !report.years_present.is_empty() {
        writeln!(out, "## Years present")?;
        writeln!(out)?;
        for (column, years) in &report.years_present {
            let years: Vec<String> = years.iter().map(|y| y.to_string()).collect();
            writeln!(out, "- {column}: {}", years.join(", "))?;
        }
        writeln!(out)?;
    }

    // --- COLUMNS ---
    writeln!(out, "## Column profiles")?;
    writeln!(out)?;
    let mut columns = Table::new();
    columns.load_preset(ASCII_MARKDOWN).set_header(vec![
        "Table",
        "Column",
        "Kind",
        "Nulls",
        "Null rate",
        "Distinct",
        "Sentinels",
        "Malformed",
        "Range",
        "Top values",
    ]);
    for p in &report.columns {
        let range = match (p.min, p.max, &p.earliest, &p.latest) {
            (Some(min), Some(max), _, _) => {
                format!("{} .. {}", render_number(min), render_number(max))
            }
            (_, _, Some(first), Some(last)) => format!("{first} .. {last}"),
            _ => "-".to_string(),
        };
        let top: Vec<String> = p
            .top_values
            .iter()
            .map(|v| format!("{} ({})", v.value, v.count))
            .collect();
        columns.add_row(vec![
            p.table.clone(),
            p.column.clone(),
            p.kind.as_str().to_string(),
            p.null_count.to_string(),
            format!("{:.2}%", p.null_rate * 100.0),
            p.distinct_count.to_string(),
            p.sentinel_count.to_string(),
            p.malformed_count.to_string(),
            range,
            top.join(", "),
        ]);
    }
    writeln!(out, "{columns}")?;

    Ok(out)
}

/// One line per check, in name order.
pub fn render_check_list(report: &ProfilingReport) -> String {
    report
        .checks
        .iter()
        .map(|(name, check)| {
            let status = match check.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
            };
            let blocking = if check.blocking && check.status == CheckStatus::Fail {
                " (blocks merge)"
            } else {
                ""
            };
            format!(
                "- [{status}] {name}: {}{blocking}",
                check.outcome.headline()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn write_details(out: &mut String, outcome: &CheckOutcome) -> std::fmt::Result {
    match outcome {
        CheckOutcome::PrimaryKey(f) => {
            writeln!(
                out,
                "{} of {} rows repeat a key; {} distinct key(s), {} row(s) with a missing key part.",
                f.duplicate_count, f.row_count, f.distinct_keys, f.missing_key_count
            )?;
            for example in &f.duplicate_examples {
                let rows: Vec<String> = example.rows.iter().map(|r| r.row.to_string()).collect();
                writeln!(
                    out,
                    "- key `{}` x{} at rows {}",
                    example.key,
                    example.occurrences,
                    rows.join(", ")
                )?;
            }
        }
        CheckOutcome::ForeignKey(f) => {
            writeln!(
                out,
                "{}.({}) -> {}.({}): {} of {} rows unmatched, {} with a missing key.",
                f.dependent,
                f.foreign_key.join(", "),
                f.root,
                f.primary_key.join(", "),
                f.unmatched_count,
                f.total_rows,
                f.missing_key_count
            )?;
            for example in &f.unmatched_examples {
                let key = example.key.as_deref().unwrap_or("<missing>");
                writeln!(out, "- row {}: key `{}`", example.row.row, key)?;
            }
        }
        CheckOutcome::Domain(f) => {
            writeln!(
                out,
                "{}.{} must be {}: {} violation(s), {} missing value(s) skipped.",
                f.table, f.column, f.constraint, f.violation_count, f.missing_count
            )?;
            for sample in &f.sample_violations {
                writeln!(out, "- row {}: `{}`", sample.row.row, sample.value)?;
            }
        }
        CheckOutcome::Years(f) => {
            let missing: Vec<String> = f.missing_years.iter().map(|y| y.to_string()).collect();
            writeln!(
                out,
                "{}.{} has no rows for: {}",
                f.table,
                f.column,
                missing.join(", ")
            )?;
        }
        CheckOutcome::Parity(f) => {
            writeln!(
                out,
                "{}.{} disagrees with distinct {}.{} on {} of {} row(s).",
                f.root,
                f.count_column,
                f.dependent,
                f.distinct_column,
                f.mismatch_count,
                f.checked_rows
            )?;
            for m in &f.sample_mismatches {
                writeln!(
                    out,
                    "- key `{}`: declared {}, observed {}",
                    m.key,
                    render_number(m.declared),
                    m.observed
                )?;
            }
        }
    }
    Ok(())
}
