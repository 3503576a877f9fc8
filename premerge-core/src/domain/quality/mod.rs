// premerge-core/src/domain/quality/mod.rs

pub mod field;
pub mod keys;
pub mod parity;
pub mod profile;
pub mod rule;
pub mod years;

// Re-exports
pub use field::{DomainFinding, ViolationSample, check_domain};
pub use keys::{
    CoverageFinding, DuplicateExample, KeyIndex, UniquenessFinding, UnmatchedExample,
    check_foreign_key_coverage, check_foreign_key_coverage_with_index,
    check_primary_key_uniqueness,
};
pub use parity::{ParityFinding, ParityMismatch, check_count_parity};
pub use profile::{ColumnProfile, ValueCount, profile_columns};
pub use rule::{Constraint, CountParityRule, FieldRule, KeyRelationship, Literal, YearWindow};
pub use years::{YearWindowFinding, check_year_window, summarize_years_present};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::table::RawTable;

/// Literal copy of one offending row, detached from the source table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RowSample {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, String>,
}

impl RowSample {
    pub fn capture(table: &RawTable, row: usize) -> Self {
        Self {
            row,
            values: table.row(row),
        }
    }
}
