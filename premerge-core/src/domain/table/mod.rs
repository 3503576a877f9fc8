// premerge-core/src/domain/table/mod.rs
//
// Column-major in-memory table. Every cell has already been through the
// coercion pass (see `coercion.rs`), so checks never re-interpret raw text.

pub mod coercion;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::domain::error::DomainError;

pub use coercion::{SentinelPolicy, coerce_column};

/// Declared semantic type of a column.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Join key. Kept as trimmed text, never sentinel-coerced.
    Key,
    Numeric,
    #[default]
    Categorical,
    Date,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Key => "key",
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Date => "date",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Canonical text form. Integral numbers render without a decimal part so
    /// that `30.0` read from a CSV compares equal to a configured `30`.
    pub fn render(&self) -> String {
        match self {
            Value::Missing => String::new(),
            Value::Number(n) => render_number(*n),
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

pub fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Value>,
    /// Cells replaced by `Missing` because they held a sentinel code.
    pub sentinel_count: usize,
    /// Cells that could not be parsed as the declared kind.
    pub malformed_count: usize,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            kind,
            values,
            sentinel_count: 0,
            malformed_count: 0,
        }
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub source: PathBuf,
    pub columns: Vec<Column>,
    /// Row cap requested at load time, if any.
    pub row_limit: Option<usize>,
    /// True when the file had more rows than the cap allowed.
    pub truncated: bool,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            source: PathBuf::new(),
            columns,
            row_limit: None,
            truncated: false,
        }
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<&Column, DomainError> {
        self.column(name).ok_or_else(|| DomainError::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    /// Resolves a (possibly composite) key to its columns.
    pub fn key_columns(&self, names: &[String]) -> Result<Vec<&Column>, DomainError> {
        names.iter().map(|n| self.require_column(n)).collect()
    }

    /// Literal values of one row, keyed by column name.
    pub fn row(&self, index: usize) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .filter_map(|c| c.values.get(index).map(|v| (c.name.clone(), v.render())))
            .collect()
    }

    /// Keeps only the rows whose index is flagged `true`.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column
                .values
                .retain(|_| flags.next().copied().unwrap_or(false));
        }
    }
}

/// Key of one row, one rendered part per key column. Parts are compared
/// as a tuple, so a separator inside a value cannot merge two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(Vec<String>);

impl RowKey {
    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

/// Display form used in reports and errors: parts joined with `|`.
impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("|"))
    }
}

/// Composite key of one row, `None` when any part is missing.
pub fn key_at(columns: &[&Column], row: usize) -> Option<RowKey> {
    let mut parts = Vec::with_capacity(columns.len());
    for column in columns {
        match column.values.get(row) {
            Some(Value::Missing) | None => return None,
            Some(v) => parts.push(v.render()),
        }
    }
    Some(RowKey(parts))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn table() -> RawTable {
        RawTable::new(
            "t",
            vec![
                Column::new(
                    "a",
                    ColumnKind::Key,
                    vec![Value::Text("1".into()), Value::Missing, Value::Text("3".into())],
                ),
                Column::new(
                    "b",
                    ColumnKind::Numeric,
                    vec![Value::Number(30.0), Value::Number(2.5), Value::Missing],
                ),
            ],
        )
    }

    #[test]
    fn test_render_integral_numbers_without_fraction() {
        assert_eq!(Value::Number(30.0).render(), "30");
        assert_eq!(Value::Number(-1.0).render(), "-1");
        assert_eq!(Value::Number(2.5).render(), "2.5");
    }

    #[test]
    fn test_composite_key_is_none_when_a_part_is_missing() {
        let t = table();
        let cols = t.key_columns(&["a".into(), "b".into()]).unwrap();
        let first = key_at(&cols, 0).unwrap();
        assert_eq!(first.parts(), ["1", "30"]);
        assert_eq!(first.to_string(), "1|30");
        assert_eq!(key_at(&cols, 1), None);
        assert_eq!(key_at(&cols, 2), None);
    }

    #[test]
    fn test_separator_inside_a_value_keeps_keys_apart() {
        let t = RawTable::new(
            "t",
            vec![
                Column::new(
                    "a",
                    ColumnKind::Key,
                    vec![Value::Text("x|y".into()), Value::Text("x".into())],
                ),
                Column::new(
                    "b",
                    ColumnKind::Key,
                    vec![Value::Text("z".into()), Value::Text("y|z".into())],
                ),
            ],
        );
        let cols = t.key_columns(&["a".into(), "b".into()]).unwrap();
        let (k0, k1) = (key_at(&cols, 0).unwrap(), key_at(&cols, 1).unwrap());
        assert_eq!(k0.to_string(), k1.to_string());
        assert_ne!(k0, k1);
    }

    #[test]
    fn test_require_column_reports_table_and_column() {
        let t = table();
        match t.require_column("zzz") {
            Err(DomainError::UnknownColumn { table, column }) => {
                assert_eq!(table, "t");
                assert_eq!(column, "zzz");
            }
            other => panic!("Expected UnknownColumn, got {:?}", other.map(|c| &c.name)),
        }
    }

    #[test]
    fn test_retain_rows_filters_every_column() {
        let mut t = table();
        t.retain_rows(&[true, false, true]);
        assert_eq!(t.row_count(), 2);
        assert_eq!(t.row(1).get("a"), Some(&"3".to_string()));
        assert_eq!(t.row(1).get("b"), Some(&String::new()));
    }
}
