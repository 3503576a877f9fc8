// premerge-core/src/domain/quality/field.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::error::DomainError;
use crate::domain::quality::RowSample;
use crate::domain::quality::rule::{Constraint, FieldRule, Literal};
use crate::domain::table::{RawTable, Value};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ViolationSample {
    /// Offending value, empty when a non-nullable rule hit a missing cell.
    pub value: String,
    pub row: RowSample,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DomainFinding {
    pub rule: String,
    pub table: String,
    pub column: String,
    pub constraint: String,
    pub evaluated_count: usize,
    pub missing_count: usize,
    pub violation_count: usize,
    pub violation_rate: f64,
    pub max_violation_rate: f64,
    pub sample_violations: Vec<ViolationSample>,
}

impl DomainFinding {
    pub fn passed(&self) -> bool {
        self.violation_rate <= self.max_violation_rate
    }
}

enum Matcher {
    Range { min: f64, max: f64 },
    Allowed(HashSet<String>),
}

impl Matcher {
    fn from_constraint(constraint: &Constraint) -> Self {
        match constraint {
            Constraint::Range { min, max } => Matcher::Range {
                min: *min,
                max: *max,
            },
            Constraint::Allowed { values } => {
                Matcher::Allowed(values.iter().map(Literal::render).collect())
            }
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            // Present but non-numeric cells cannot satisfy a numeric range.
            Matcher::Range { min, max } => value.as_f64().is_some_and(|v| v >= *min && v <= *max),
            Matcher::Allowed(set) => set.contains(&value.render()),
        }
    }
}

/// Applies one rule without touching the table. Missing cells are skipped
/// unless the rule is non-nullable.
pub fn check_domain(
    table: &RawTable,
    rule: &FieldRule,
    sample_limit: usize,
) -> Result<DomainFinding, DomainError> {
    let column = table.require_column(&rule.column)?;
    let matcher = Matcher::from_constraint(&rule.constraint);

    let mut evaluated_count = 0;
    let mut missing_count = 0;
    let mut violation_count = 0;
    let mut sample_violations = Vec::new();

    for (row, value) in column.values.iter().enumerate() {
        let violated = if value.is_missing() {
            missing_count += 1;
            if rule.nullable {
                continue;
            }
            true
        } else {
            !matcher.accepts(value)
        };

        evaluated_count += 1;
        if violated {
            violation_count += 1;
            if sample_violations.len() < sample_limit {
                sample_violations.push(ViolationSample {
                    value: value.render(),
                    row: RowSample::capture(table, row),
                });
            }
        }
    }

    let violation_rate = if evaluated_count == 0 {
        0.0
    } else {
        violation_count as f64 / evaluated_count as f64
    };

    Ok(DomainFinding {
        rule: rule.name.clone(),
        table: table.name.clone(),
        column: rule.column.clone(),
        constraint: rule.constraint.to_string(),
        evaluated_count,
        missing_count,
        violation_count,
        violation_rate,
        max_violation_rate: rule.max_violation_rate,
        sample_violations,
    })
}
