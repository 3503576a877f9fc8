// premerge-core/src/domain/table/coercion.rs
//
// The single coercion pass applied at load time: raw CSV text -> typed values.
// Sentinel codes become `Value::Missing` here and nowhere else.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Column, ColumnKind, Value};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SentinelPolicy {
    /// Integer codes meaning "missing / not applicable" in DfT extracts.
    #[serde(default = "default_numeric_sentinels")]
    pub numeric: Vec<i64>,

    /// Text placeholders ("NK" = not known).
    #[serde(default = "default_text_sentinels")]
    pub text: Vec<String>,

    /// Columns left untouched by sentinel replacement.
    #[serde(default)]
    pub exempt: Vec<String>,
}

impl Default for SentinelPolicy {
    fn default() -> Self {
        Self {
            numeric: default_numeric_sentinels(),
            text: default_text_sentinels(),
            exempt: Vec::new(),
        }
    }
}

fn default_numeric_sentinels() -> Vec<i64> {
    vec![-1, 97, 98, 99, 997, 998, 999]
}

fn default_text_sentinels() -> Vec<String> {
    vec!["NK".to_string(), "NULL".to_string()]
}

impl SentinelPolicy {
    pub fn is_exempt(&self, column: &str) -> bool {
        self.exempt.iter().any(|c| c == column)
    }

    fn is_text_sentinel(&self, raw: &str) -> bool {
        self.text.iter().any(|s| s == raw)
    }
}

/// Infers a kind for columns the config does not declare: numeric when every
/// present cell parses as a number, categorical otherwise.
pub fn infer_kind(raw: &[String], policy: &SentinelPolicy) -> ColumnKind {
    let mut seen_value = false;
    for cell in raw {
        let cell = cell.trim();
        if cell.is_empty() || policy.is_text_sentinel(cell) {
            continue;
        }
        seen_value = true;
        if parse_number(cell).is_none() {
            return ColumnKind::Categorical;
        }
    }
    if seen_value {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    }
}

pub fn coerce_column(
    name: &str,
    raw: Vec<String>,
    declared: Option<ColumnKind>,
    policy: &SentinelPolicy,
) -> Column {
    let kind = declared.unwrap_or_else(|| infer_kind(&raw, policy));
    let exempt = policy.is_exempt(name);
    let mut column = Column::new(name, kind, Vec::with_capacity(raw.len()));

    for cell in raw {
        let cell = cell.trim();
        if cell.is_empty() {
            column.values.push(Value::Missing);
            continue;
        }
        if kind != ColumnKind::Key && !exempt && policy.is_text_sentinel(cell) {
            column.sentinel_count += 1;
            column.values.push(Value::Missing);
            continue;
        }

        let value = match kind {
            ColumnKind::Key | ColumnKind::Categorical => Some(Value::Text(cell.to_string())),
            ColumnKind::Numeric => parse_number(cell).map(Value::Number),
            ColumnKind::Date => parse_date(cell).map(Value::Date),
        };

        match value {
            Some(v) => column.values.push(v),
            None => {
                column.malformed_count += 1;
                column.values.push(Value::Missing);
            }
        }
    }

    if kind == ColumnKind::Numeric && !exempt {
        replace_numeric_sentinels(&mut column, policy);
    }

    column
}

/// Integer sentinels only apply to integer-valued columns: a latitude of
/// `-1.0` is a coordinate, a `speed_limit` of `-1` is a code.
fn replace_numeric_sentinels(column: &mut Column, policy: &SentinelPolicy) {
    let integer_valued = column.values.iter().all(|v| match v {
        Value::Number(n) => n.fract() == 0.0,
        _ => true,
    });
    if !integer_valued {
        return;
    }

    let codes: HashSet<i64> = policy.numeric.iter().copied().collect();
    for value in &mut column.values {
        if let Value::Number(n) = value
            && codes.contains(&(*n as i64))
        {
            *value = Value::Missing;
            column.sentinel_count += 1;
        }
    }
}

pub fn parse_number(cell: &str) -> Option<f64> {
    cell.parse::<f64>().ok().filter(|n| n.is_finite())
}

pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let date_part = cell.split([' ', 'T']).next().unwrap_or(cell);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn raw(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_integer_sentinels_become_missing() {
        let col = coerce_column(
            "speed_limit",
            raw(&["30", "-1", "99", "70"]),
            None,
            &SentinelPolicy::default(),
        );
        assert_eq!(col.kind, ColumnKind::Numeric);
        assert_eq!(col.sentinel_count, 2);
        assert_eq!(
            col.values,
            vec![
                Value::Number(30.0),
                Value::Missing,
                Value::Missing,
                Value::Number(70.0)
            ]
        );
    }

    #[test]
    fn test_fractional_columns_keep_sentinel_like_values() {
        let col = coerce_column(
            "longitude",
            raw(&["-1", "-0.12"]),
            Some(ColumnKind::Numeric),
            &SentinelPolicy::default(),
        );
        assert_eq!(col.sentinel_count, 0);
        assert_eq!(col.values[0], Value::Number(-1.0));
    }

    #[test]
    fn test_text_sentinel_and_malformed_counts() {
        let col = coerce_column(
            "age_of_driver",
            raw(&["34", "NK", "abc", ""]),
            Some(ColumnKind::Numeric),
            &SentinelPolicy::default(),
        );
        assert_eq!(col.sentinel_count, 1);
        assert_eq!(col.malformed_count, 1);
        assert_eq!(col.null_count(), 3);
    }

    #[test]
    fn test_exempt_column_is_not_touched() {
        let policy = SentinelPolicy {
            exempt: vec!["vehicle_reference".into()],
            ..Default::default()
        };
        let col = coerce_column("vehicle_reference", raw(&["1", "99"]), None, &policy);
        assert_eq!(col.sentinel_count, 0);
        assert_eq!(col.values[1], Value::Number(99.0));
    }

    #[test]
    fn test_keys_stay_text_and_trimmed() {
        let col = coerce_column(
            "collision_index",
            raw(&[" 2023010001 ", "-1"]),
            Some(ColumnKind::Key),
            &SentinelPolicy::default(),
        );
        assert_eq!(col.values[0], Value::Text("2023010001".into()));
        assert_eq!(col.values[1], Value::Text("-1".into()));
    }

    #[test]
    fn test_inference_falls_back_to_categorical() {
        let policy = SentinelPolicy::default();
        assert_eq!(infer_kind(&raw(&["1", "2.5", "NK"]), &policy), ColumnKind::Numeric);
        assert_eq!(infer_kind(&raw(&["1", "Dry"]), &policy), ColumnKind::Categorical);
        assert_eq!(infer_kind(&raw(&["", ""]), &policy), ColumnKind::Categorical);
    }

    #[test]
    fn test_dates_accept_uk_and_iso_formats() {
        assert_eq!(
            parse_date("05/01/2023"),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(
            parse_date("2023-01-05 17:30"),
            NaiveDate::from_ymd_opt(2023, 1, 5)
        );
        assert_eq!(parse_date("not a date"), None);
    }
}
