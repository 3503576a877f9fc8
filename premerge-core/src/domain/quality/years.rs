// premerge-core/src/domain/quality/years.rs

use chrono::Datelike;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

use crate::domain::error::DomainError;
use crate::domain::quality::rule::{YEAR_BOUNDS, YearWindow};
use crate::domain::table::{RawTable, Value, coercion::parse_date};

fn re_year() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(1[89]\d{2}|2\d{3})\b")
            .unwrap_or_else(|_| Regex::new("$^").unwrap_or_else(|_| unreachable!()))
    })
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct YearWindowFinding {
    pub table: String,
    pub column: String,
    pub years_present: Vec<i32>,
    pub expected_from: Option<i32>,
    pub expected_to: Option<i32>,
    /// Years of the expected window with no rows.
    pub missing_years: Vec<i32>,
    /// Years present outside the expected window.
    pub unexpected_years: Vec<i32>,
}

impl YearWindowFinding {
    pub fn passed(&self) -> bool {
        self.missing_years.is_empty()
    }
}

fn year_of(value: &Value) -> Option<i32> {
    match value {
        Value::Date(d) => Some(d.year()),
        Value::Number(n)
            if n.fract() == 0.0
                && (f64::from(YEAR_BOUNDS.0)..=f64::from(YEAR_BOUNDS.1)).contains(n) =>
        {
            Some(*n as i32)
        }
        Value::Text(s) => parse_date(s).map(|d| d.year()).or_else(|| {
            re_year()
                .captures(s)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        }),
        _ => None,
    }
}

/// Distinct years found in a date or year column, ascending.
pub fn summarize_years_present(
    table: &RawTable,
    column: &str,
) -> Result<BTreeSet<i32>, DomainError> {
    let column = table.require_column(column)?;
    Ok(column.values.iter().filter_map(year_of).collect())
}

pub fn check_year_window(
    table: &RawTable,
    window: &YearWindow,
) -> Result<YearWindowFinding, DomainError> {
    let present = summarize_years_present(table, &window.column)?;

    let missing_years = match (window.from, window.to) {
        (Some(from), Some(to)) => (from..=to).filter(|y| !present.contains(y)).collect(),
        _ => Vec::new(),
    };
    let unexpected_years = present
        .iter()
        .copied()
        .filter(|y| window.from.is_some_and(|f| *y < f) || window.to.is_some_and(|t| *y > t))
        .collect();

    Ok(YearWindowFinding {
        table: table.name.clone(),
        column: window.column.clone(),
        years_present: present.into_iter().collect(),
        expected_from: window.from,
        expected_to: window.to,
        missing_years,
        unexpected_years,
    })
}
