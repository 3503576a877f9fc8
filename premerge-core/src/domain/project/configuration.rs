// src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use validator::{Validate, ValidationError};

use crate::domain::error::DomainError;
use crate::domain::quality::{
    Constraint, CountParityRule, FieldRule, KeyRelationship, Literal, YearWindow,
};
use crate::domain::table::{ColumnKind, SentinelPolicy};

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct TableConfig {
    #[validate(length(min = 1, message = "Table name cannot be empty"))]
    pub name: String,

    /// Candidate file names; exact match first, then stem substring.
    #[validate(length(min = 1, message = "At least one candidate file is required"))]
    pub files: Vec<String>,

    #[serde(default)]
    pub primary_key: Vec<String>,

    /// Declared kinds; undeclared columns are inferred at load time.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnKind>,
}

impl TableConfig {
    pub fn declared_kind(&self, column: &str) -> Option<ColumnKind> {
        if let Some(kind) = self.columns.get(column) {
            return Some(*kind);
        }
        self.primary_key
            .iter()
            .any(|k| k == column)
            .then_some(ColumnKind::Key)
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
pub struct MergeConfig {
    /// Root columns carried into every dependent table.
    #[serde(default)]
    pub context_columns: Vec<String>,

    /// Attribute of an intermediate table (vehicles) carried into the table
    /// keyed beneath it (casualties), joined on the intermediate's key.
    #[serde(default)]
    pub vehicle_attribute: Option<String>,

    #[serde(default = "default_latitude_column")]
    pub latitude_column: String,

    #[serde(default = "default_longitude_column")]
    pub longitude_column: String,

    #[serde(default = "default_speed_column")]
    pub speed_column: String,

    #[validate(custom(function = "validate_bounds"))]
    #[serde(default = "default_lat_bounds")]
    pub latitude_bounds: (f64, f64),

    #[validate(custom(function = "validate_bounds"))]
    #[serde(default = "default_lon_bounds")]
    pub longitude_bounds: (f64, f64),

    #[validate(length(min = 1, message = "At least one speed limit must be allowed"))]
    #[serde(default = "default_allowed_speeds")]
    pub allowed_speeds: Vec<i64>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            context_columns: Vec::new(),
            vehicle_attribute: None,
            latitude_column: default_latitude_column(),
            longitude_column: default_longitude_column(),
            speed_column: default_speed_column(),
            latitude_bounds: default_lat_bounds(),
            longitude_bounds: default_lon_bounds(),
            allowed_speeds: default_allowed_speeds(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate, Clone)]
#[validate(schema(function = "validate_unique_names"))]
pub struct ProjectConfig {
    #[validate(length(min = 1, message = "Project name cannot be empty"))]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,

    #[serde(rename = "output-path", default = "default_output_path")]
    pub output_path: String,

    #[serde(rename = "processed-path", default = "default_processed_path")]
    pub processed_path: String,

    #[serde(rename = "sample-limit", default = "default_sample_limit")]
    pub sample_limit: usize,

    #[serde(rename = "top-n", default = "default_top_n")]
    pub top_n: usize,

    #[serde(default)]
    pub sentinels: SentinelPolicy,

    #[validate(length(min = 1, message = "At least one table is required"))]
    #[validate(nested)]
    pub tables: Vec<TableConfig>,

    #[validate(nested)]
    #[serde(default)]
    pub relationships: Vec<KeyRelationship>,

    #[validate(nested)]
    #[serde(default)]
    pub rules: Vec<FieldRule>,

    #[validate(nested)]
    #[serde(default)]
    pub years: Vec<YearWindow>,

    #[serde(default)]
    pub parity: Vec<CountParityRule>,

    #[validate(nested)]
    #[serde(default)]
    pub merge: MergeConfig,
}

impl ProjectConfig {
    pub fn table(&self, name: &str) -> Result<&TableConfig, DomainError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| DomainError::UnknownTable(name.to_string()))
    }

    /// Tables referenced as the root of at least one relationship.
    pub fn root_tables(&self) -> HashSet<&str> {
        self.relationships.iter().map(|r| r.root.as_str()).collect()
    }

    /// Columns each table must expose: its own primary key plus every key it
    /// participates in through a relationship. Values are (column, role).
    pub fn required_columns(&self, table: &str) -> Vec<(String, String)> {
        let mut required: Vec<(String, String)> = Vec::new();
        if let Ok(t) = self.table(table) {
            for k in &t.primary_key {
                required.push((k.clone(), "its primary key".to_string()));
            }
        }
        for rel in &self.relationships {
            if rel.dependent == table {
                for k in &rel.foreign_key {
                    required.push((k.clone(), format!("foreign key of '{}'", rel.name)));
                }
            }
            if rel.root == table {
                for k in &rel.primary_key {
                    required.push((k.clone(), format!("referenced key of '{}'", rel.name)));
                }
            }
        }
        let mut seen = HashSet::new();
        required.retain(|(column, _)| seen.insert(column.clone()));
        required
    }

    /// Every table named by a relationship, rule, year window or parity
    /// check must be declared. Field-level constraints live on the derive.
    pub fn validate_references(&self) -> Result<(), DomainError> {
        for rel in &self.relationships {
            self.table(&rel.dependent)?;
            self.table(&rel.root)?;
        }
        for rule in &self.rules {
            self.table(&rule.table)?;
        }
        for window in &self.years {
            self.table(&window.table)?;
        }
        for parity in &self.parity {
            self.table(&parity.root)?;
            self.table(&parity.dependent)?;
        }
        Ok(())
    }

    /// The UK road-safety (DfT STATS19) layout: Collisions -> Vehicles ->
    /// Casualties, keyed on `collision_index`.
    pub fn road_safety_defaults() -> Self {
        let key = |cols: &[&str]| cols.iter().map(|c| c.to_string()).collect::<Vec<_>>();
        let kinds = |cols: &[(&str, ColumnKind)]| {
            cols.iter()
                .map(|(c, k)| (c.to_string(), *k))
                .collect::<BTreeMap<_, _>>()
        };
        let range = |name: &str, table: &str, column: &str, min: f64, max: f64| {
            FieldRule::new(name, table, column, Constraint::Range { min, max })
        };

        let merge = MergeConfig {
            context_columns: key(&[
                "collision_index",
                "collision_year",
                "collision_ref_no",
                "latitude",
                "longitude",
                "police_force",
                "collision_severity",
                "number_of_vehicles",
                "number_of_casualties",
                "speed_limit",
                "light_conditions",
                "weather_conditions",
                "urban_or_rural_area",
            ]),
            vehicle_attribute: Some("vehicle_type".into()),
            ..Default::default()
        };

        Self {
            name: "uk_road_safety".into(),
            version: default_version(),
            data_dir: default_data_dir(),
            output_path: default_output_path(),
            processed_path: default_processed_path(),
            sample_limit: default_sample_limit(),
            top_n: default_top_n(),
            sentinels: SentinelPolicy {
                // Reference numbers are identifiers, 99 is a real vehicle.
                exempt: key(&["vehicle_reference", "casualty_reference", "collision_year"]),
                ..Default::default()
            },
            tables: vec![
                TableConfig {
                    name: "collisions".into(),
                    files: key(&["Collisions.csv"]),
                    primary_key: key(&["collision_index"]),
                    columns: kinds(&[
                        ("collision_index", ColumnKind::Key),
                        ("date", ColumnKind::Date),
                        ("latitude", ColumnKind::Numeric),
                        ("longitude", ColumnKind::Numeric),
                        ("speed_limit", ColumnKind::Numeric),
                        ("collision_year", ColumnKind::Numeric),
                    ]),
                },
                TableConfig {
                    name: "vehicles".into(),
                    files: key(&["Vehicles.csv"]),
                    primary_key: key(&["collision_index", "vehicle_reference"]),
                    columns: kinds(&[
                        ("vehicle_reference", ColumnKind::Key),
                        ("age_of_driver", ColumnKind::Numeric),
                        ("engine_capacity_cc", ColumnKind::Numeric),
                    ]),
                },
                TableConfig {
                    name: "casualties".into(),
                    files: key(&["Casualties.csv"]),
                    primary_key: key(&["collision_index", "vehicle_reference", "casualty_reference"]),
                    columns: kinds(&[
                        ("vehicle_reference", ColumnKind::Key),
                        ("casualty_reference", ColumnKind::Key),
                        ("age_of_casualty", ColumnKind::Numeric),
                    ]),
                },
            ],
            relationships: vec![
                KeyRelationship {
                    name: "vehicles_to_collisions".into(),
                    dependent: "vehicles".into(),
                    foreign_key: key(&["collision_index"]),
                    root: "collisions".into(),
                    primary_key: key(&["collision_index"]),
                    min_coverage: 1.0,
                },
                KeyRelationship {
                    name: "casualties_to_collisions".into(),
                    dependent: "casualties".into(),
                    foreign_key: key(&["collision_index"]),
                    root: "collisions".into(),
                    primary_key: key(&["collision_index"]),
                    min_coverage: 1.0,
                },
            ],
            rules: vec![
                range("uk_latitude", "collisions", "latitude", 49.8, 60.9),
                range("uk_longitude", "collisions", "longitude", -8.7, 1.8),
                FieldRule::new(
                    "legal_speed_limit",
                    "collisions",
                    "speed_limit",
                    Constraint::Allowed {
                        values: default_allowed_speeds().into_iter().map(Literal::from).collect(),
                    },
                ),
                range("collision_year_range", "collisions", "collision_year", 1979.0, 2100.0),
                range("driver_age", "vehicles", "age_of_driver", 0.0, 110.0),
                range("engine_capacity", "vehicles", "engine_capacity_cc", 40.0, 30000.0),
                range("casualty_age", "casualties", "age_of_casualty", 0.0, 110.0),
            ],
            years: vec![YearWindow {
                table: "collisions".into(),
                column: "collision_year".into(),
                from: None,
                to: None,
            }],
            parity: vec![
                CountParityRule {
                    name: "vehicle_count".into(),
                    root: "collisions".into(),
                    count_column: "number_of_vehicles".into(),
                    dependent: "vehicles".into(),
                    distinct_column: "vehicle_reference".into(),
                    key: "collision_index".into(),
                },
                CountParityRule {
                    name: "casualty_count".into(),
                    root: "collisions".into(),
                    count_column: "number_of_casualties".into(),
                    dependent: "casualties".into(),
                    distinct_column: "casualty_reference".into(),
                    key: "collision_index".into(),
                },
            ],
            merge,
        }
    }
}

fn validate_bounds(bounds: &(f64, f64)) -> Result<(), ValidationError> {
    let (lo, hi) = *bounds;
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return Err(ValidationError::new("inverted_bounds")
            .with_message(format!("lower bound {lo} is above upper bound {hi}").into()));
    }
    Ok(())
}

fn first_duplicate<'a>(mut names: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    names.find(|name| !seen.insert(*name))
}

fn validate_unique_names(config: &ProjectConfig) -> Result<(), ValidationError> {
    let tables = first_duplicate(config.tables.iter().map(|t| t.name.as_str()));
    let rules = first_duplicate(config.rules.iter().map(|r| r.name.as_str()));
    let duplicate = tables
        .map(|name| format!("table '{name}' declared twice"))
        .or_else(|| rules.map(|name| format!("rule '{name}' declared twice")));
    match duplicate {
        Some(message) => Err(ValidationError::new("duplicate_name").with_message(message.into())),
        None => Ok(()),
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
fn default_data_dir() -> String {
    "data/raw".to_string()
}
fn default_output_path() -> String {
    "reports".to_string()
}
fn default_processed_path() -> String {
    "data/processed".to_string()
}
fn default_sample_limit() -> usize {
    5
}
fn default_top_n() -> usize {
    5
}
fn default_latitude_column() -> String {
    "latitude".to_string()
}
fn default_longitude_column() -> String {
    "longitude".to_string()
}
fn default_speed_column() -> String {
    "speed_limit".to_string()
}
fn default_lat_bounds() -> (f64, f64) {
    (49.8, 60.9)
}
fn default_lon_bounds() -> (f64, f64) {
    (-8.7, 1.8)
}
fn default_allowed_speeds() -> Vec<i64> {
    vec![5, 10, 15, 20, 30, 40, 50, 60, 70, 80]
}
