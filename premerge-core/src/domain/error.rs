// premerge-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Schema mismatch in table '{table}': required column '{column}' is missing")]
    #[diagnostic(
        code(premerge::domain::schema_mismatch),
        help("'{table}' declares '{column}' as part of {role}. Check the CSV header or the table config.")
    )]
    SchemaMismatch {
        table: String,
        column: String,
        role: String,
    },

    #[error("Table '{0}' is not configured")]
    #[diagnostic(code(premerge::domain::unknown_table))]
    UnknownTable(String),

    #[error("Column '{column}' not found in table '{table}'")]
    #[diagnostic(code(premerge::domain::unknown_column))]
    UnknownColumn { table: String, column: String },

    #[error("Ambiguous join: key '{key}' appears more than once in root table '{table}'")]
    #[diagnostic(
        code(premerge::domain::ambiguous_join),
        help("Run 'premerge profile' and fix the primary-key duplicates, or re-run merge with --force.")
    )]
    AmbiguousJoin { table: String, key: String },

    #[error("Merge blocked: {0}")]
    #[diagnostic(
        code(premerge::domain::merge_blocked),
        help("The profiling report flagged duplicate primary keys. Use --force to merge anyway.")
    )]
    MergeBlocked(String),
}
