// premerge-core/src/application/load.rs

use futures::future::try_join_all;
use std::sync::Arc;
use tracing::info;

use crate::domain::error::DomainError;
use crate::domain::project::ProjectConfig;
use crate::domain::table::{ColumnKind, RawTable};
use crate::error::PremergeError;
use crate::infrastructure::discovery::LocatedSource;
use crate::ports::source::{SourceRequest, TableSource};

/// Reads every located table in parallel (one blocking task per file), then
/// enforces the schema contract. Any failure aborts the whole load.
pub async fn load_tables(
    source: Arc<dyn TableSource>,
    config: &ProjectConfig,
    located: Vec<LocatedSource>,
    row_limit: Option<usize>,
) -> Result<Vec<RawTable>, PremergeError> {
    let tasks = located.into_iter().map(|l| {
        let source = Arc::clone(&source);
        let mut table = l.table;
        // Join columns are identifiers, never numbers with sentinel codes
        for (column, _) in config.required_columns(&table.name) {
            table.columns.entry(column).or_insert(ColumnKind::Key);
        }
        let request = SourceRequest {
            table,
            path: l.path,
            row_limit,
            sentinels: config.sentinels.clone(),
        };
        async move {
            tokio::task::spawn_blocking(move || source.read_table(&request))
                .await
                .map_err(|e| PremergeError::InternalError(format!("Loader task failed: {e}")))?
        }
    });

    let tables = try_join_all(tasks).await?;
    for table in &tables {
        check_schema(table, config)?;
    }

    let rows: usize = tables.iter().map(RawTable::row_count).sum();
    info!(tables = tables.len(), rows, "All tables loaded");
    Ok(tables)
}

/// Key columns (own primary key, both sides of every relationship) and the
/// columns named by rules must exist.
pub fn check_schema(table: &RawTable, config: &ProjectConfig) -> Result<(), DomainError> {
    let mut required = config.required_columns(&table.name);

    for rule in config.rules.iter().filter(|r| r.table == table.name) {
        required.push((rule.column.clone(), format!("rule '{}'", rule.name)));
    }
    for window in config.years.iter().filter(|w| w.table == table.name) {
        required.push((window.column.clone(), "the year window".to_string()));
    }
    for parity in &config.parity {
        if parity.root == table.name {
            required.push((parity.count_column.clone(), format!("parity rule '{}'", parity.name)));
            required.push((parity.key.clone(), format!("parity rule '{}'", parity.name)));
        }
        if parity.dependent == table.name {
            required.push((
                parity.distinct_column.clone(),
                format!("parity rule '{}'", parity.name),
            ));
            required.push((parity.key.clone(), format!("parity rule '{}'", parity.name)));
        }
    }

    match required.into_iter().find(|(column, _)| !table.has_column(column)) {
        Some((column, role)) => Err(DomainError::SchemaMismatch {
            table: table.name.clone(),
            column,
            role,
        }),
        None => Ok(()),
    }
}
