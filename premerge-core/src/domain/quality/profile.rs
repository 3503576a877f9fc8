// premerge-core/src/domain/quality/profile.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::table::{Column, ColumnKind, RawTable, Value};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ColumnProfile {
    pub table: String,
    pub column: String,
    pub kind: ColumnKind,
    pub row_count: usize,
    pub null_count: usize,
    /// 1.0 for an empty table: there is nothing present to describe.
    pub null_rate: f64,
    pub distinct_count: usize,
    pub sentinel_count: usize,
    pub malformed_count: usize,
    #[serde(default)]
    pub top_values: Vec<ValueCount>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

/// Descriptive statistics for every column, in table order. Never fails.
pub fn profile_columns(table: &RawTable, top_n: usize) -> Vec<ColumnProfile> {
    table
        .columns
        .iter()
        .map(|column| profile_column(&table.name, column, top_n))
        .collect()
}

fn profile_column(table: &str, column: &Column, top_n: usize) -> ColumnProfile {
    let row_count = column.values.len();
    let null_count = column.null_count();
    let null_rate = if row_count == 0 {
        1.0
    } else {
        null_count as f64 / row_count as f64
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in column.values.iter().filter(|v| !v.is_missing()) {
        *counts.entry(value.render()).or_insert(0) += 1;
    }
    let distinct_count = counts.len();

    let mut profile = ColumnProfile {
        table: table.to_string(),
        column: column.name.clone(),
        kind: column.kind,
        row_count,
        null_count,
        null_rate,
        distinct_count,
        sentinel_count: column.sentinel_count,
        malformed_count: column.malformed_count,
        top_values: Vec::new(),
        min: None,
        max: None,
        mean: None,
        earliest: None,
        latest: None,
    };

    match column.kind {
        ColumnKind::Numeric => {
            let numbers: Vec<f64> = column.values.iter().filter_map(Value::as_f64).collect();
            if !numbers.is_empty() {
                profile.min = numbers.iter().copied().reduce(f64::min);
                profile.max = numbers.iter().copied().reduce(f64::max);
                profile.mean = Some(numbers.iter().sum::<f64>() / numbers.len() as f64);
            }
        }
        ColumnKind::Date => {
            let mut dates = column.values.iter().filter_map(|v| match v {
                Value::Date(d) => Some(*d),
                _ => None,
            });
            if let Some(first) = dates.next() {
                let (lo, hi) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
                profile.earliest = Some(lo.format("%Y-%m-%d").to_string());
                profile.latest = Some(hi.format("%Y-%m-%d").to_string());
            }
        }
        ColumnKind::Key | ColumnKind::Categorical => {
            profile.top_values = top_values(counts, top_n);
        }
    }

    profile
}

/// Most frequent first, ties broken by value so the output is stable.
fn top_values(counts: HashMap<String, usize>, top_n: usize) -> Vec<ValueCount> {
    let mut ranked: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    ranked.truncate(top_n);
    ranked
}
