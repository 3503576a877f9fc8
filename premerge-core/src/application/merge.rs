// premerge-core/src/application/merge.rs
//
// Light clean + enrichment. Cleaning is deliberately minimal: only what breaks
// joins or plots (duplicate child keys, points outside the country, speed
// codes outside the legal set). Everything else is left for analysis.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::application::profiler::find_table;
use crate::domain::error::DomainError;
use crate::domain::project::{MergeConfig, ProjectConfig, TableConfig};
use crate::domain::quality::{KeyRelationship, check_count_parity};
use crate::domain::table::{Column, ColumnKind, RawTable, RowKey, Value, key_at};
use crate::error::PremergeError;
use crate::infrastructure::report::parse_report;
use crate::ports::sink::TableSink;

#[derive(Debug, Clone)]
pub struct MergedTable {
    pub name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    pub outputs: Vec<MergedTable>,
    pub duplicates_dropped: BTreeMap<String, usize>,
    pub out_of_bounds_dropped: usize,
    pub speeds_cleared: usize,
    pub parity_mismatches: BTreeMap<String, usize>,
}

/// Refuses to merge when the last profiling run flagged a blocking check.
/// No report at all is allowed, with a warning.
pub fn check_merge_gate(report_path: &Path, force: bool) -> Result<(), PremergeError> {
    if !report_path.is_file() {
        warn!(path = ?report_path, "No profiling report found, merging without a gate");
        return Ok(());
    }

    let report = parse_report(&fs::read_to_string(report_path)?)?;
    if !report.should_block_merge() {
        return Ok(());
    }

    let failures = report.summary.blocking_failures.join(", ");
    if force {
        warn!(%failures, "Blocking checks failed, merging anyway (--force)");
        Ok(())
    } else {
        Err(DomainError::MergeBlocked(failures).into())
    }
}

pub fn merge_tables(
    mut tables: Vec<RawTable>,
    config: &ProjectConfig,
    sink: &dyn TableSink,
) -> Result<MergeSummary, PremergeError> {
    let roots = config.root_tables();
    let dependents: HashSet<&str> = config
        .relationships
        .iter()
        .map(|r| r.dependent.as_str())
        .collect();
    let mut summary = MergeSummary::default();

    // 1. Keys as text on both sides of every join
    for table in &mut tables {
        let keys: Vec<String> = config
            .required_columns(&table.name)
            .into_iter()
            .map(|(column, _)| column)
            .collect();
        normalize_keys(table, &keys);
    }

    // 2. Child tables: one row per composite key
    for table in tables
        .iter_mut()
        .filter(|t| !roots.contains(t.name.as_str()))
    {
        let primary_key = &config.table(&table.name)?.primary_key;
        if primary_key.is_empty() {
            continue;
        }
        let dropped = drop_duplicate_keys(table, primary_key)?;
        info!(table = %table.name, dropped, "Dropped duplicate key-rows");
        summary.duplicates_dropped.insert(table.name.clone(), dropped);
    }

    // 3. Root tables: geography and speed domain
    for table in tables
        .iter_mut()
        .filter(|t| roots.contains(t.name.as_str()))
    {
        let dropped = drop_out_of_bounds(table, &config.merge);
        if dropped > 0 {
            info!(
                table = %table.name,
                dropped,
                lat = ?config.merge.latitude_bounds,
                lon = ?config.merge.longitude_bounds,
                "Dropping rows outside bounds"
            );
        }
        summary.out_of_bounds_dropped += dropped;
        summary.speeds_cleared += clear_disallowed_speeds(table, &config.merge);
    }

    // 4. Root context into each dependent
    for rel in &config.relationships {
        let carried = context_columns(
            find_table(&tables, &rel.root)?,
            find_table(&tables, &rel.dependent)?,
            rel,
            &config.merge.context_columns,
        )?;
        debug!(relationship = %rel.name, columns = carried.len(), "Joined context");
        if let Some(dependent) = tables.iter_mut().find(|t| t.name == rel.dependent) {
            dependent.columns.extend(carried);
        }
    }

    // 5. Intermediate attribute (vehicle_type) into the tables keyed beneath it
    if let Some(attribute) = &config.merge.vehicle_attribute {
        for (parent, child) in nested_tables(config, &roots) {
            let column = attribute_column(
                find_table(&tables, &parent.name)?,
                find_table(&tables, &child.name)?,
                &parent.primary_key,
                attribute,
            )?;
            if let Some(column) = column
                && let Some(target) = tables.iter_mut().find(|t| t.name == child.name)
            {
                target.columns.push(column);
            }
        }
    }

    // 6. Post-merge parity, logged only
    for rule in &config.parity {
        let finding = check_count_parity(
            find_table(&tables, &rule.root)?,
            find_table(&tables, &rule.dependent)?,
            rule,
            0,
        )?;
        info!(rule = %rule.name, mismatches = finding.mismatch_count, "Count parity");
        summary
            .parity_mismatches
            .insert(rule.name.clone(), finding.mismatch_count);
    }

    for table in &tables {
        let suffix = if dependents.contains(table.name.as_str()) {
            "enriched"
        } else {
            "clean"
        };
        let path = sink.write_table(&format!("{}_{}.parquet", table.name, suffix), table)?;
        summary.outputs.push(MergedTable {
            name: table.name.clone(),
            path,
            rows: table.row_count(),
            columns: table.columns.len(),
        });
    }

    Ok(summary)
}

fn normalize_keys(table: &mut RawTable, keys: &[String]) {
    for column in table
        .columns
        .iter_mut()
        .filter(|c| keys.contains(&c.name) && c.kind != ColumnKind::Key)
    {
        for value in column.values.iter_mut() {
            if !value.is_missing() && !matches!(value, Value::Text(_)) {
                *value = Value::Text(value.render());
            }
        }
        column.kind = ColumnKind::Key;
    }
}

/// Keep-first on the composite key. Rows with a missing key part are kept.
pub fn drop_duplicate_keys(table: &mut RawTable, key: &[String]) -> Result<usize, DomainError> {
    let keep: Vec<bool> = {
        let columns = table.key_columns(key)?;
        let mut seen: HashSet<RowKey> = HashSet::new();
        (0..table.row_count())
            .map(|row| key_at(&columns, row).is_none_or(|k| seen.insert(k)))
            .collect()
    };
    let dropped = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep);
    Ok(dropped)
}

/// Drops rows whose coordinates are both present and outside the box.
/// Rows with a missing coordinate are kept.
pub fn drop_out_of_bounds(table: &mut RawTable, merge: &MergeConfig) -> usize {
    let keep: Vec<bool> = {
        let (Some(lat), Some(lon)) = (
            table.column(&merge.latitude_column),
            table.column(&merge.longitude_column),
        ) else {
            return 0;
        };
        let within = |v: f64, (lo, hi): (f64, f64)| v >= lo && v <= hi;
        lat.values
            .iter()
            .zip(&lon.values)
            .map(|(la, lo)| match (la.as_f64(), lo.as_f64()) {
                (Some(la), Some(lo)) => {
                    within(la, merge.latitude_bounds) && within(lo, merge.longitude_bounds)
                }
                _ => true,
            })
            .collect()
    };
    let dropped = keep.iter().filter(|k| !**k).count();
    table.retain_rows(&keep);
    dropped
}

/// Speed values outside the allowed set become missing; rows stay.
pub fn clear_disallowed_speeds(table: &mut RawTable, merge: &MergeConfig) -> usize {
    let Some(column) = table.column_mut(&merge.speed_column) else {
        return 0;
    };
    let allowed = |v: &Value| {
        v.as_f64()
            .is_some_and(|n| n.fract() == 0.0 && merge.allowed_speeds.contains(&(n as i64)))
    };

    let mut cleared = 0;
    for value in column.values.iter_mut() {
        if !value.is_missing() && !allowed(value) {
            *value = Value::Missing;
            cleared += 1;
        }
    }
    if cleared > 0 {
        info!(column = %column.name, cleared, "Cleared speed values outside the allowed set");
    }
    cleared
}

/// Left join, many-to-one: every dependent row gets the matching root row's
/// context, or missing values when the key has no match. Columns the
/// dependent already has are not duplicated.
fn context_columns(
    root: &RawTable,
    dependent: &RawTable,
    rel: &KeyRelationship,
    wanted: &[String],
) -> Result<Vec<Column>, DomainError> {
    let root_keys = root.key_columns(&rel.primary_key)?;
    let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(root.row_count());
    for row in 0..root.row_count() {
        if let Some(key) = key_at(&root_keys, row)
            && index.insert(key.clone(), row).is_some()
        {
            return Err(DomainError::AmbiguousJoin {
                table: root.name.clone(),
                key: key.to_string(),
            });
        }
    }

    let foreign = dependent.key_columns(&rel.foreign_key)?;
    let matches: Vec<Option<usize>> = (0..dependent.row_count())
        .map(|row| key_at(&foreign, row).and_then(|k| index.get(&k).copied()))
        .collect();

    Ok(wanted
        .iter()
        .filter(|name| !dependent.has_column(name))
        .filter_map(|name| root.column(name))
        .map(|source| gather(source, &matches))
        .collect())
}

/// Pairs of non-root tables where the parent's key is a strict prefix of the
/// child's (vehicles -> casualties).
fn nested_tables<'a>(
    config: &'a ProjectConfig,
    roots: &HashSet<&str>,
) -> Vec<(&'a TableConfig, &'a TableConfig)> {
    let candidates: Vec<&TableConfig> = config
        .tables
        .iter()
        .filter(|t| !roots.contains(t.name.as_str()) && !t.primary_key.is_empty())
        .collect();

    let mut pairs = Vec::new();
    for parent in &candidates {
        for child in &candidates {
            if child.primary_key.len() > parent.primary_key.len()
                && child.primary_key.starts_with(&parent.primary_key)
            {
                pairs.push((*parent, *child));
            }
        }
    }
    pairs
}

fn attribute_column(
    parent: &RawTable,
    child: &RawTable,
    key: &[String],
    attribute: &str,
) -> Result<Option<Column>, DomainError> {
    let Some(source) = parent.column(attribute) else {
        return Ok(None);
    };
    if child.has_column(attribute) {
        return Ok(None);
    }

    let parent_keys = parent.key_columns(key)?;
    let mut index: HashMap<RowKey, usize> = HashMap::with_capacity(parent.row_count());
    for row in 0..parent.row_count() {
        if let Some(k) = key_at(&parent_keys, row) {
            index.entry(k).or_insert(row);
        }
    }

    let child_keys = child.key_columns(key)?;
    let matches: Vec<Option<usize>> = (0..child.row_count())
        .map(|row| key_at(&child_keys, row).and_then(|k| index.get(&k).copied()))
        .collect();
    Ok(Some(gather(source, &matches)))
}

fn gather(source: &Column, rows: &[Option<usize>]) -> Column {
    let values = rows
        .iter()
        .map(|m| {
            m.and_then(|r| source.values.get(r).cloned())
                .unwrap_or(Value::Missing)
        })
        .collect();
    Column::new(&source.name, source.kind, values)
}
