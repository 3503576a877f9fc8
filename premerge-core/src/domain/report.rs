// premerge-core/src/domain/report.rs
//
// Canonical in-memory report. The Markdown, JSON and per-column CSV views are
// all rendered from `ProfilingReport`; none of them re-reads the findings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::quality::{
    ColumnProfile, CoverageFinding, DomainFinding, ParityFinding, UniquenessFinding,
    YearWindowFinding,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    pub fn from_passed(passed: bool) -> Self {
        if passed {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckOutcome {
    PrimaryKey(UniquenessFinding),
    ForeignKey(CoverageFinding),
    Domain(DomainFinding),
    Years(YearWindowFinding),
    Parity(ParityFinding),
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        match self {
            CheckOutcome::PrimaryKey(f) => f.passed(),
            CheckOutcome::ForeignKey(f) => f.passed(),
            CheckOutcome::Domain(f) => f.passed(),
            CheckOutcome::Years(f) => f.passed(),
            CheckOutcome::Parity(f) => f.passed(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CheckOutcome::PrimaryKey(_) => "primary_key",
            CheckOutcome::ForeignKey(_) => "foreign_key",
            CheckOutcome::Domain(_) => "domain",
            CheckOutcome::Years(_) => "years",
            CheckOutcome::Parity(_) => "parity",
        }
    }

    /// One-line metric for summaries.
    pub fn headline(&self) -> String {
        match self {
            CheckOutcome::PrimaryKey(f) => format!(
                "{} duplicate row(s) on ({}) across {} rows",
                f.duplicate_count,
                f.key_columns.join(", "),
                f.row_count
            ),
            CheckOutcome::ForeignKey(f) => format!(
                "coverage {:.4} ({} of {} rows unmatched, min {:.4})",
                f.coverage_ratio, f.unmatched_count, f.total_rows, f.min_coverage
            ),
            CheckOutcome::Domain(f) => format!(
                "{} violation(s) of {} {} in {} evaluated value(s), rate {:.4}",
                f.violation_count, f.column, f.constraint, f.evaluated_count, f.violation_rate
            ),
            CheckOutcome::Years(f) => {
                let present: Vec<String> = f.years_present.iter().map(|y| y.to_string()).collect();
                if f.missing_years.is_empty() {
                    format!("years present: {}", present.join(", "))
                } else {
                    let missing: Vec<String> =
                        f.missing_years.iter().map(|y| y.to_string()).collect();
                    format!(
                        "years present: {}; missing: {}",
                        present.join(", "),
                        missing.join(", ")
                    )
                }
            }
            CheckOutcome::Parity(f) => format!(
                "{} of {} root row(s) disagree on {}",
                f.mismatch_count, f.checked_rows, f.count_column
            ),
        }
    }

    fn strip_samples(&mut self) {
        match self {
            CheckOutcome::PrimaryKey(f) => {
                for example in &mut f.duplicate_examples {
                    example.rows.iter_mut().for_each(|r| r.values.clear());
                }
            }
            CheckOutcome::ForeignKey(f) => {
                for example in &mut f.unmatched_examples {
                    example.row.values.clear();
                }
            }
            CheckOutcome::Domain(f) => f.sample_violations.clear(),
            CheckOutcome::Years(_) => {}
            CheckOutcome::Parity(f) => f.sample_mismatches.clear(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CheckResult {
    pub status: CheckStatus,
    /// A failing blocking check tells the merge stage not to proceed.
    pub blocking: bool,
    pub outcome: CheckOutcome,
}

impl CheckResult {
    pub fn new(outcome: CheckOutcome, blocking: bool) -> Self {
        Self {
            status: CheckStatus::from_passed(outcome.passed()),
            blocking,
            outcome,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub source: String,
    pub row_count: usize,
    pub column_count: usize,
    pub row_limit: Option<usize>,
    pub truncated: bool,
}

/// Everything the profiler measured, samples included.
#[derive(Debug, Clone, Default)]
pub struct Findings {
    pub project: String,
    pub tables: Vec<TableSummary>,
    pub checks: BTreeMap<String, CheckResult>,
    pub columns: Vec<ColumnProfile>,
    pub years_present: BTreeMap<String, Vec<i32>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct ReportSummary {
    pub checks_total: usize,
    pub checks_passed: usize,
    pub checks_failed: usize,
    pub blocking_failures: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfilingReport {
    pub project: String,
    pub samples_included: bool,
    pub summary: ReportSummary,
    pub tables: Vec<TableSummary>,
    pub checks: BTreeMap<String, CheckResult>,
    pub years_present: BTreeMap<String, Vec<i32>>,
    pub columns: Vec<ColumnProfile>,
}

impl ProfilingReport {
    pub fn from_findings(findings: &Findings, emit_samples: bool) -> Self {
        let mut checks = findings.checks.clone();
        if !emit_samples {
            checks.values_mut().for_each(|c| c.outcome.strip_samples());
        }

        let checks_passed = checks
            .values()
            .filter(|c| c.status == CheckStatus::Pass)
            .count();
        let blocking_failures = checks
            .iter()
            .filter(|(_, c)| c.blocking && c.status == CheckStatus::Fail)
            .map(|(name, _)| name.clone())
            .collect();

        let mut columns = findings.columns.clone();
        columns.sort_by(|a, b| (&a.table, &a.column).cmp(&(&b.table, &b.column)));

        Self {
            project: findings.project.clone(),
            samples_included: emit_samples,
            summary: ReportSummary {
                checks_total: checks.len(),
                checks_passed,
                checks_failed: checks.len() - checks_passed,
                blocking_failures,
            },
            tables: findings.tables.clone(),
            checks,
            years_present: findings.years_present.clone(),
            columns,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.checks_failed > 0
    }

    pub fn should_block_merge(&self) -> bool {
        !self.summary.blocking_failures.is_empty()
    }
}
