// premerge-core/src/domain/quality/rule.rs

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

use crate::domain::table::render_number;

/// A configured literal. YAML `[20, 30]` and `["Dry", "Wet"]` both work.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    pub fn render(&self) -> String {
        match self {
            Literal::Number(n) => render_number(*n),
            Literal::Text(s) => s.clone(),
        }
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::Text(value.to_string())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Constraint {
    /// Inclusive numeric bounds.
    Range { min: f64, max: f64 },
    /// Membership in a closed set. Matching is case-sensitive.
    Allowed { values: Vec<Literal> },
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Range { min, max } => {
                write!(f, "in [{}, {}]", render_number(*min), render_number(*max))
            }
            Constraint::Allowed { values } => {
                let rendered: Vec<String> = values.iter().map(Literal::render).collect();
                write!(f, "in {{{}}}", rendered.join(", "))
            }
        }
    }
}

fn default_true() -> bool {
    true
}

/// One declarative rule: name -> table.column -> constraint.
#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct FieldRule {
    #[validate(length(min = 1, message = "Rule name cannot be empty"))]
    pub name: String,
    pub table: String,
    pub column: String,

    #[validate(custom(function = "validate_constraint"))]
    pub constraint: Constraint,

    /// When false, missing values count as violations.
    #[serde(default = "default_true")]
    pub nullable: bool,

    /// Tolerated share of violating values before the check fails.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default)]
    pub max_violation_rate: f64,
}

impl FieldRule {
    pub fn new(name: &str, table: &str, column: &str, constraint: Constraint) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            column: column.to_string(),
            constraint,
            nullable: true,
            max_violation_rate: 0.0,
        }
    }
}

fn validate_constraint(constraint: &Constraint) -> Result<(), ValidationError> {
    match constraint {
        Constraint::Range { min, max } if min.is_nan() || max.is_nan() || min > max => {
            Err(ValidationError::new("inverted_range")
                .with_message("min is greater than max".into()))
        }
        Constraint::Allowed { values } if values.is_empty() => {
            Err(ValidationError::new("empty_allowed_set")
                .with_message("allowed set is empty".into()))
        }
        _ => Ok(()),
    }
}

fn default_min_coverage() -> f64 {
    1.0
}

/// Dependent table FK -> root table PK.
#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
#[validate(schema(function = "validate_key_arity"))]
pub struct KeyRelationship {
    pub name: String,
    pub dependent: String,

    #[validate(length(min = 1, message = "Foreign key needs at least one column"))]
    pub foreign_key: Vec<String>,
    pub root: String,

    #[validate(length(min = 1, message = "Primary key needs at least one column"))]
    pub primary_key: Vec<String>,

    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_min_coverage")]
    pub min_coverage: f64,
}

fn validate_key_arity(rel: &KeyRelationship) -> Result<(), ValidationError> {
    if rel.foreign_key.len() != rel.primary_key.len() {
        return Err(ValidationError::new("key_arity").with_message(
            format!("'{}': foreign_key and primary_key differ in arity", rel.name).into(),
        ));
    }
    Ok(())
}

/// Root count column vs. distinct dependent values per key,
/// e.g. `number_of_vehicles` vs. distinct `vehicle_reference`.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CountParityRule {
    pub name: String,
    pub root: String,
    pub count_column: String,
    pub dependent: String,
    pub distinct_column: String,
    pub key: String,
}

/// Years a date column can carry; matches what the year scan recognises.
pub const YEAR_BOUNDS: (i32, i32) = (1000, 9999);

#[derive(Debug, Deserialize, Serialize, Validate, Clone, PartialEq, Eq)]
#[validate(schema(function = "validate_year_window"))]
pub struct YearWindow {
    pub table: String,
    pub column: String,
    #[serde(default)]
    pub from: Option<i32>,
    #[serde(default)]
    pub to: Option<i32>,
}

fn validate_year_window(window: &YearWindow) -> Result<(), ValidationError> {
    let (lo, hi) = YEAR_BOUNDS;
    for year in [window.from, window.to].into_iter().flatten() {
        if !(lo..=hi).contains(&year) {
            return Err(ValidationError::new("year_out_of_bounds").with_message(
                format!("year {year} is outside {lo}..={hi}").into(),
            ));
        }
    }
    if let (Some(from), Some(to)) = (window.from, window.to)
        && from > to
    {
        return Err(ValidationError::new("inverted_window")
            .with_message(format!("from {from} is after to {to}").into()));
    }
    Ok(())
}
