// premerge-core/src/domain/quality/keys.rs
//
// Primary-key uniqueness and foreign-key coverage. Both are one grouped pass
// over a table; the root key set is hashed once and shared by every coverage
// check that points at it.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::error::DomainError;
use crate::domain::quality::RowSample;
use crate::domain::table::{RawTable, RowKey, key_at};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DuplicateExample {
    pub key: String,
    pub occurrences: usize,
    pub rows: Vec<RowSample>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UniquenessFinding {
    pub table: String,
    pub key_columns: Vec<String>,
    pub row_count: usize,
    pub distinct_keys: usize,
    /// Rows whose key already appeared earlier in the table.
    pub duplicate_count: usize,
    /// Rows with a missing key part; excluded from the duplicate count.
    pub missing_key_count: usize,
    pub duplicate_examples: Vec<DuplicateExample>,
}

impl UniquenessFinding {
    pub fn passed(&self) -> bool {
        self.duplicate_count == 0
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UnmatchedExample {
    /// `None` when the foreign key itself is missing.
    pub key: Option<String>,
    pub row: RowSample,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CoverageFinding {
    pub dependent: String,
    pub foreign_key: Vec<String>,
    pub root: String,
    pub primary_key: Vec<String>,
    pub total_rows: usize,
    pub matched_rows: usize,
    /// Includes rows with a missing foreign key, which cannot match.
    pub unmatched_count: usize,
    pub missing_key_count: usize,
    pub coverage_ratio: f64,
    pub min_coverage: f64,
    pub unmatched_examples: Vec<UnmatchedExample>,
}

impl CoverageFinding {
    pub fn passed(&self) -> bool {
        self.coverage_ratio >= self.min_coverage
    }
}

/// Hashed primary-key set of a root table.
#[derive(Debug, Clone)]
pub struct KeyIndex {
    pub table: String,
    pub columns: Vec<String>,
    keys: HashSet<RowKey>,
}

impl KeyIndex {
    pub fn build(table: &RawTable, key_columns: &[String]) -> Result<Self, DomainError> {
        let columns = table.key_columns(key_columns)?;
        let keys = (0..table.row_count())
            .filter_map(|row| key_at(&columns, row))
            .collect();
        Ok(Self {
            table: table.name.clone(),
            columns: key_columns.to_vec(),
            keys,
        })
    }

    pub fn contains(&self, key: &RowKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

pub fn check_primary_key_uniqueness(
    table: &RawTable,
    key_columns: &[String],
    sample_limit: usize,
) -> Result<UniquenessFinding, DomainError> {
    let columns = table.key_columns(key_columns)?;

    // Group rows by key, remembering first-seen order for stable examples.
    let mut groups: HashMap<RowKey, Vec<usize>> = HashMap::new();
    let mut order: Vec<RowKey> = Vec::new();
    let mut missing_key_count = 0;

    for row in 0..table.row_count() {
        match key_at(&columns, row) {
            Some(key) => {
                let rows = groups.entry(key.clone()).or_default();
                if rows.is_empty() {
                    order.push(key);
                }
                rows.push(row);
            }
            None => missing_key_count += 1,
        }
    }

    let duplicate_count = groups.values().map(|rows| rows.len() - 1).sum();

    let duplicate_examples = order
        .iter()
        .filter_map(|key| groups.get(key).map(|rows| (key, rows)))
        .filter(|(_, rows)| rows.len() > 1)
        .take(sample_limit)
        .map(|(key, rows)| DuplicateExample {
            key: key.to_string(),
            occurrences: rows.len(),
            rows: rows
                .iter()
                .take(sample_limit.max(2))
                .map(|&r| RowSample::capture(table, r))
                .collect(),
        })
        .collect();

    Ok(UniquenessFinding {
        table: table.name.clone(),
        key_columns: key_columns.to_vec(),
        row_count: table.row_count(),
        distinct_keys: groups.len(),
        duplicate_count,
        missing_key_count,
        duplicate_examples,
    })
}

/// Coverage against a prebuilt root index. Use this when several dependent
/// tables point at the same root.
pub fn check_foreign_key_coverage_with_index(
    dependent: &RawTable,
    foreign_key: &[String],
    root: &KeyIndex,
    min_coverage: f64,
    sample_limit: usize,
) -> Result<CoverageFinding, DomainError> {
    let columns = dependent.key_columns(foreign_key)?;
    let total_rows = dependent.row_count();

    let mut matched_rows = 0;
    let mut missing_key_count = 0;
    let mut unmatched_examples = Vec::new();

    for row in 0..total_rows {
        let key = key_at(&columns, row);
        let matched = match &key {
            Some(k) => root.contains(k),
            None => {
                missing_key_count += 1;
                false
            }
        };
        if matched {
            matched_rows += 1;
        } else if unmatched_examples.len() < sample_limit {
            unmatched_examples.push(UnmatchedExample {
                key: key.map(|k| k.to_string()),
                row: RowSample::capture(dependent, row),
            });
        }
    }

    // An empty dependent table is vacuously covered.
    let coverage_ratio = if total_rows == 0 {
        1.0
    } else {
        matched_rows as f64 / total_rows as f64
    };

    Ok(CoverageFinding {
        dependent: dependent.name.clone(),
        foreign_key: foreign_key.to_vec(),
        root: root.table.clone(),
        primary_key: root.columns.clone(),
        total_rows,
        matched_rows,
        unmatched_count: total_rows - matched_rows,
        missing_key_count,
        coverage_ratio,
        min_coverage,
        unmatched_examples,
    })
}

pub fn check_foreign_key_coverage(
    dependent: &RawTable,
    foreign_key: &[String],
    root: &RawTable,
    primary_key: &[String],
    sample_limit: usize,
) -> Result<CoverageFinding, DomainError> {
    let index = KeyIndex::build(root, primary_key)?;
    check_foreign_key_coverage_with_index(dependent, foreign_key, &index, 1.0, sample_limit)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::table::{Column, ColumnKind, Value};

    fn keyed(name: &str, column: &str, keys: &[Option<&str>]) -> RawTable {
        let values = keys
            .iter()
            .map(|k| match k {
                Some(s) => Value::Text(s.to_string()),
                None => Value::Missing,
            })
            .collect();
        RawTable::new(name, vec![Column::new(column, ColumnKind::Key, values)])
    }

    fn key(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn test_duplicate_key_is_counted_once_per_extra_row() {
        let t = keyed("collisions", "id", &[Some("1"), Some("1"), Some("2"), Some("3")]);
        let f = check_primary_key_uniqueness(&t, &key("id"), 5).unwrap();

        assert_eq!(f.duplicate_count, 1);
        assert_eq!(f.distinct_keys, 3);
        assert!(!f.passed());
        assert_eq!(f.duplicate_examples.len(), 1);
        assert_eq!(f.duplicate_examples[0].key, "1");
        let rows: Vec<usize> = f.duplicate_examples[0].rows.iter().map(|r| r.row).collect();
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn test_distinct_keys_pass_and_missing_keys_are_separate() {
        let t = keyed("c", "id", &[Some("1"), None, Some("2"), None]);
        let f = check_primary_key_uniqueness(&t, &key("id"), 5).unwrap();
        assert_eq!(f.duplicate_count, 0);
        assert_eq!(f.missing_key_count, 2);
        assert!(f.passed());
    }

    #[test]
    fn test_duplicate_count_matches_pairwise_distinctness() {
        let cases: [&[&str]; 4] = [&[], &["a"], &["a", "b", "c"], &["a", "b", "a", "b", "a"]];
        for keys in cases {
            let t = keyed("c", "id", &keys.iter().map(|k| Some(*k)).collect::<Vec<_>>());
            let f = check_primary_key_uniqueness(&t, &key("id"), 5).unwrap();
            let distinct: HashSet<&&str> = keys.iter().collect();
            assert_eq!(f.duplicate_count == 0, distinct.len() == keys.len());
            assert_eq!(f.duplicate_count, keys.len() - distinct.len());
        }
    }

    fn pairs(rows: &[(&str, &str)]) -> RawTable {
        let a = rows.iter().map(|(a, _)| Value::Text(a.to_string())).collect();
        let b = rows.iter().map(|(_, b)| Value::Text(b.to_string())).collect();
        RawTable::new(
            "t",
            vec![
                Column::new("a", ColumnKind::Key, a),
                Column::new("b", ColumnKind::Key, b),
            ],
        )
    }

    #[test]
    fn test_composite_keys_with_separator_in_values_stay_distinct() {
        let t = pairs(&[("x|y", "z"), ("x", "y|z")]);
        let cols = vec!["a".to_string(), "b".to_string()];

        let f = check_primary_key_uniqueness(&t, &cols, 5).unwrap();
        assert_eq!(f.duplicate_count, 0);
        assert_eq!(f.distinct_keys, 2);

        let root = pairs(&[("x|y", "z")]);
        let dep = pairs(&[("x", "y|z")]);
        let cov = check_foreign_key_coverage(&dep, &cols, &root, &cols, 5).unwrap();
        assert_eq!(cov.matched_rows, 0);
        assert_eq!(cov.unmatched_examples[0].key.as_deref(), Some("x|y|z"));
    }

    #[test]
    fn test_coverage_with_one_orphan() {
        let root = keyed("collisions", "id", &[Some("1"), Some("2"), Some("3")]);
        let dep = keyed("vehicles", "id", &[Some("1"), Some("2"), Some("2"), Some("9")]);
        let f = check_foreign_key_coverage(&dep, &key("id"), &root, &key("id"), 5).unwrap();

        assert!((f.coverage_ratio - 0.75).abs() < f64::EPSILON);
        assert_eq!(f.unmatched_count, 1);
        assert_eq!(f.unmatched_examples[0].key.as_deref(), Some("9"));
        assert!(!f.passed());
    }

    #[test]
    fn test_empty_dependent_is_fully_covered() {
        let root = keyed("collisions", "id", &[Some("1")]);
        let dep = keyed("vehicles", "id", &[]);
        let f = check_foreign_key_coverage(&dep, &key("id"), &root, &key("id"), 5).unwrap();
        assert_eq!(f.coverage_ratio, 1.0);
        assert_eq!(f.unmatched_count, 0);
        assert!(f.passed());
    }

    #[test]
    fn test_missing_foreign_key_counts_as_unmatched() {
        let root = keyed("collisions", "id", &[Some("1")]);
        let dep = keyed("vehicles", "id", &[Some("1"), None]);
        let f = check_foreign_key_coverage(&dep, &key("id"), &root, &key("id"), 5).unwrap();
        assert_eq!(f.missing_key_count, 1);
        assert_eq!(f.unmatched_count, 1);
        assert_eq!(f.unmatched_examples[0].key, None);
        assert!((0.0..=1.0).contains(&f.coverage_ratio));
    }

    #[test]
    fn test_index_is_reusable_across_dependents() {
        let root = keyed("collisions", "id", &[Some("1"), Some("2")]);
        let index = KeyIndex::build(&root, &key("id")).unwrap();
        assert_eq!(index.len(), 2);

        let vehicles = keyed("vehicles", "id", &[Some("1"), Some("2")]);
        let casualties = keyed("casualties", "id", &[Some("2"), Some("5")]);
        let fv = check_foreign_key_coverage_with_index(&vehicles, &key("id"), &index, 1.0, 5).unwrap();
        let fc = check_foreign_key_coverage_with_index(&casualties, &key("id"), &index, 0.5, 5).unwrap();
        assert_eq!(fv.coverage_ratio, 1.0);
        assert_eq!(fc.coverage_ratio, 0.5);
        assert!(fc.passed());
    }

    #[test]
    fn test_missing_key_column_is_a_schema_error() {
        let t = keyed("c", "id", &[Some("1")]);
        let err = check_primary_key_uniqueness(&t, &key("collision_index"), 5).unwrap_err();
        assert!(matches!(err, DomainError::UnknownColumn { .. }));
    }
}
