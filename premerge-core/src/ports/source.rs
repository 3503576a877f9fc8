// premerge-core/src/ports/source.rs

// What the loader needs from a storage backend: one configured table in,
// one coerced column-major table out. The CSV reader is the only adapter
// shipped, tests plug in-memory sources in here.

use std::path::PathBuf;

use crate::domain::project::TableConfig;
use crate::domain::table::{RawTable, SentinelPolicy};
use crate::error::PremergeError;

#[derive(Debug, Clone)]
pub struct SourceRequest {
    pub table: TableConfig,
    pub path: PathBuf,
    pub row_limit: Option<usize>,
    pub sentinels: SentinelPolicy,
}

/// Blocking by contract: the loader runs each call on the blocking pool.
pub trait TableSource: Send + Sync {
    fn read_table(&self, request: &SourceRequest) -> Result<RawTable, PremergeError>;
}
