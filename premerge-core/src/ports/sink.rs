// premerge-core/src/ports/sink.rs

use std::path::PathBuf;

use crate::domain::table::RawTable;
use crate::error::PremergeError;

pub trait TableSink: Send + Sync {
    /// Persists `table` under `file_name` and returns where it landed.
    fn write_table(&self, file_name: &str, table: &RawTable) -> Result<PathBuf, PremergeError>;
}
