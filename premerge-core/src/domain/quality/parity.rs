// premerge-core/src/domain/quality/parity.rs
//
// Declared child counts on the root table vs. what the child table holds.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::error::DomainError;
use crate::domain::quality::rule::CountParityRule;
use crate::domain::table::{RawTable, Value};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParityMismatch {
    pub key: String,
    pub declared: f64,
    pub observed: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ParityFinding {
    pub rule: String,
    pub root: String,
    pub count_column: String,
    pub dependent: String,
    pub distinct_column: String,
    pub checked_rows: usize,
    /// Root rows skipped because the key or the declared count is missing.
    pub skipped_rows: usize,
    pub mismatch_count: usize,
    pub sample_mismatches: Vec<ParityMismatch>,
}

impl ParityFinding {
    pub fn passed(&self) -> bool {
        self.mismatch_count == 0
    }
}

pub fn check_count_parity(
    root: &RawTable,
    dependent: &RawTable,
    rule: &CountParityRule,
    sample_limit: usize,
) -> Result<ParityFinding, DomainError> {
    let root_key = root.require_column(&rule.key)?;
    let declared = root.require_column(&rule.count_column)?;
    let dep_key = dependent.require_column(&rule.key)?;
    let dep_values = dependent.require_column(&rule.distinct_column)?;

    let mut observed: HashMap<String, HashSet<String>> = HashMap::new();
    for (key, value) in dep_key.values.iter().zip(&dep_values.values) {
        if key.is_missing() {
            continue;
        }
        let entry = observed.entry(key.render()).or_default();
        if !value.is_missing() {
            entry.insert(value.render());
        }
    }

    let mut checked_rows = 0;
    let mut skipped_rows = 0;
    let mut mismatch_count = 0;
    let mut sample_mismatches = Vec::new();

    for (key, count) in root_key.values.iter().zip(&declared.values) {
        let (Value::Text(_) | Value::Number(_), Some(expected)) = (key, count.as_f64()) else {
            skipped_rows += 1;
            continue;
        };
        checked_rows += 1;

        let key = key.render();
        let seen = observed.get(&key).map(HashSet::len).unwrap_or(0);
        if (seen as f64 - expected).abs() > f64::EPSILON {
            mismatch_count += 1;
            if sample_mismatches.len() < sample_limit {
                sample_mismatches.push(ParityMismatch {
                    key,
                    declared: expected,
                    observed: seen,
                });
            }
        }
    }

    Ok(ParityFinding {
        rule: rule.name.clone(),
        root: root.name.clone(),
        count_column: rule.count_column.clone(),
        dependent: dependent.name.clone(),
        distinct_column: rule.distinct_column.clone(),
        checked_rows,
        skipped_rows,
        mismatch_count,
        sample_mismatches,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::table::{Column, ColumnKind};

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|s| Value::Text(s.to_string())).collect()
    }

    #[test]
    fn test_vehicle_count_parity() {
        let collisions = RawTable::new(
            "collisions",
            vec![
                Column::new("collision_index", ColumnKind::Key, text(&["a", "b", "c", "d"])),
                Column::new(
                    "number_of_vehicles",
                    ColumnKind::Numeric,
                    vec![
                        Value::Number(2.0),
                        Value::Number(1.0),
                        Value::Number(1.0),
                        Value::Missing,
                    ],
                ),
            ],
        );
        let vehicles = RawTable::new(
            "vehicles",
            vec![
                Column::new("collision_index", ColumnKind::Key, text(&["a", "a", "a", "b"])),
                Column::new("vehicle_reference", ColumnKind::Key, text(&["1", "2", "2", "1"])),
            ],
        );
        let rule = CountParityRule {
            name: "vehicle_count".into(),
            root: "collisions".into(),
            count_column: "number_of_vehicles".into(),
            dependent: "vehicles".into(),
            distinct_column: "vehicle_reference".into(),
            key: "collision_index".into(),
        };

        let f = check_count_parity(&collisions, &vehicles, &rule, 5).unwrap();
        // a: 2 declared / 2 distinct, b: 1 / 1, c: 1 / 0, d: skipped
        assert_eq!(f.checked_rows, 3);
        assert_eq!(f.skipped_rows, 1);
        assert_eq!(f.mismatch_count, 1);
        assert_eq!(
            f.sample_mismatches[0],
            ParityMismatch {
                key: "c".into(),
                declared: 1.0,
                observed: 0
            }
        );
    }
}
