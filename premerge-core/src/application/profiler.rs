// premerge-core/src/application/profiler.rs

use std::collections::HashMap;
use tracing::{debug, info, instrument};

use crate::domain::error::DomainError;
use crate::domain::project::ProjectConfig;
use crate::domain::quality::{
    KeyIndex, check_count_parity, check_domain, check_foreign_key_coverage_with_index,
    check_primary_key_uniqueness, check_year_window, profile_columns,
};
use crate::domain::report::{CheckOutcome, CheckResult, Findings, TableSummary};
use crate::domain::table::RawTable;

/// Runs every configured check over the loaded tables. Data problems become
/// findings; only configuration that names a missing table or column fails.
#[instrument(skip_all, fields(project = %config.name))]
pub fn profile(tables: &[RawTable], config: &ProjectConfig) -> Result<Findings, DomainError> {
    let lookup = |name: &str| find_table(tables, name);

    let mut findings = Findings {
        project: config.name.clone(),
        ..Default::default()
    };
    let roots = config.root_tables();
    let limit = config.sample_limit;

    for table in tables {
        findings.tables.push(TableSummary {
            name: table.name.clone(),
            source: table.source.display().to_string(),
            row_count: table.row_count(),
            column_count: table.columns.len(),
            row_limit: table.row_limit,
            truncated: table.truncated,
        });
        findings.columns.extend(profile_columns(table, config.top_n));
    }

    // 1. Primary keys; duplicates on a join root block the merge
    for table_config in config.tables.iter().filter(|t| !t.primary_key.is_empty()) {
        let table = lookup(&table_config.name)?;
        let finding = check_primary_key_uniqueness(table, &table_config.primary_key, limit)?;
        debug!(table = %table.name, duplicates = finding.duplicate_count, "Primary key checked");
        findings.checks.insert(
            format!("primary_key.{}", table.name),
            CheckResult::new(
                CheckOutcome::PrimaryKey(finding),
                roots.contains(table.name.as_str()),
            ),
        );
    }

    // 2. Foreign keys, one hashed key set per (root, key)
    let mut indexes: HashMap<(String, Vec<String>), KeyIndex> = HashMap::new();
    for rel in &config.relationships {
        let index_key = (rel.root.clone(), rel.primary_key.clone());
        if !indexes.contains_key(&index_key) {
            let index = KeyIndex::build(lookup(&rel.root)?, &rel.primary_key)?;
            indexes.insert(index_key.clone(), index);
        }
        let Some(index) = indexes.get(&index_key) else {
            continue;
        };
        let finding = check_foreign_key_coverage_with_index(
            lookup(&rel.dependent)?,
            &rel.foreign_key,
            index,
            rel.min_coverage,
            limit,
        )?;
        findings.checks.insert(
            format!("foreign_key.{}", rel.name),
            CheckResult::new(CheckOutcome::ForeignKey(finding), false),
        );
    }

    // 3. Field domains
    for rule in &config.rules {
        let finding = check_domain(lookup(&rule.table)?, rule, limit)?;
        findings.checks.insert(
            format!("domain.{}", rule.name),
            CheckResult::new(CheckOutcome::Domain(finding), false),
        );
    }

    // 4. Year coverage
    for window in &config.years {
        let finding = check_year_window(lookup(&window.table)?, window)?;
        findings.years_present.insert(
            format!("{}.{}", window.table, window.column),
            finding.years_present.clone(),
        );
        findings.checks.insert(
            format!("years.{}.{}", window.table, window.column),
            CheckResult::new(CheckOutcome::Years(finding), false),
        );
    }

    // 5. Declared child counts
    for rule in &config.parity {
        let finding = check_count_parity(lookup(&rule.root)?, lookup(&rule.dependent)?, rule, limit)?;
        findings.checks.insert(
            format!("parity.{}", rule.name),
            CheckResult::new(CheckOutcome::Parity(finding), false),
        );
    }

    let failed = findings.checks.values().filter(|c| !c.outcome.passed()).count();
    info!(checks = findings.checks.len(), failed, "Profiling complete");
    Ok(findings)
}

pub fn find_table<'a>(tables: &'a [RawTable], name: &str) -> Result<&'a RawTable, DomainError> {
    tables
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| DomainError::UnknownTable(name.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::TableConfig;
    use crate::domain::quality::{Constraint, FieldRule, KeyRelationship, Literal};
    use crate::domain::report::{CheckStatus, ProfilingReport};
    use crate::domain::table::{Column, ColumnKind, Value};
    use std::collections::BTreeMap;

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::Text(v.to_string())).collect()
    }

    fn setup() -> (Vec<RawTable>, ProjectConfig) {
        let collisions = RawTable::new(
            "collisions",
            vec![
                Column::new("collision_index", ColumnKind::Key, text(&["1", "1", "2", "3"])),
                Column::new(
                    "speed_limit",
                    ColumnKind::Numeric,
                    vec![
                        Value::Number(30.0),
                        Value::Number(55.0),
                        Value::Number(70.0),
                        Value::Missing,
                    ],
                ),
            ],
        );
        let vehicles = RawTable::new(
            "vehicles",
            vec![Column::new("collision_index", ColumnKind::Key, text(&["1", "2", "2", "9"]))],
        );

        let mut config = ProjectConfig::road_safety_defaults();
        config.tables = vec![
            TableConfig {
                name: "collisions".into(),
                files: vec!["Collisions.csv".into()],
                primary_key: vec!["collision_index".into()],
                columns: BTreeMap::new(),
            },
            TableConfig {
                name: "vehicles".into(),
                files: vec!["Vehicles.csv".into()],
                primary_key: vec![],
                columns: BTreeMap::new(),
            },
        ];
        config.relationships = vec![KeyRelationship {
            name: "vehicles_to_collisions".into(),
            dependent: "vehicles".into(),
            foreign_key: vec!["collision_index".into()],
            root: "collisions".into(),
            primary_key: vec!["collision_index".into()],
            min_coverage: 1.0,
        }];
        config.rules = vec![FieldRule::new(
            "legal_speed_limit",
            "collisions",
            "speed_limit",
            Constraint::Allowed {
                values: [20i64, 30, 40, 50, 60, 70].into_iter().map(Literal::from).collect(),
            },
        )];
        config.years.clear();
        config.parity.clear();
        (vec![collisions, vehicles], config)
    }

    #[test]
    fn test_findings_cover_every_configured_check() {
        let (tables, config) = setup();
        let findings = profile(&tables, &config).unwrap();

        let names: Vec<&str> = findings.checks.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "domain.legal_speed_limit",
                "foreign_key.vehicles_to_collisions",
                "primary_key.collisions"
            ]
        );
        assert!(findings.checks.values().all(|c| c.status == CheckStatus::Fail));
        assert_eq!(findings.tables.len(), 2);
        assert_eq!(findings.columns.len(), 3);
    }

    #[test]
    fn test_root_duplicates_block_merge() {
        let (tables, config) = setup();
        let report = ProfilingReport::from_findings(&profile(&tables, &config).unwrap(), false);
        assert_eq!(report.summary.blocking_failures, vec!["primary_key.collisions"]);

        let CheckOutcome::ForeignKey(f) = &report.checks["foreign_key.vehicles_to_collisions"].outcome
        else {
            panic!("Expected foreign key outcome");
        };
        assert_eq!(f.coverage_ratio, 0.75);
        assert!(!report.checks["foreign_key.vehicles_to_collisions"].blocking);
    }

    #[test]
    fn test_rule_on_missing_column_is_an_error() {
        let (tables, mut config) = setup();
        config.rules[0].column = "speed".into();
        assert!(matches!(
            profile(&tables, &config),
            Err(DomainError::UnknownColumn { column, .. }) if column == "speed"
        ));
    }
}
