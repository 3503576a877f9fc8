// premerge-core/src/infrastructure/error.rs

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use datafusion::arrow::error::ArrowError;
use datafusion::parquet::errors::ParquetError;

#[derive(Error, Debug, Diagnostic)]
pub enum ColumnarError {
    #[error("Arrow Error: {0}")]
    #[diagnostic(
        code(premerge::infra::columnar::arrow),
        help("A cleaned table could not be converted to Arrow record batches.")
    )]
    Arrow(#[from] ArrowError),

    #[error("Parquet Error: {0}")]
    #[diagnostic(
        code(premerge::infra::columnar::parquet),
        help("Check that the processed directory is writable.")
    )]
    Parquet(#[from] ParquetError),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- COLUMNAR OUTPUT ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Columnar(#[from] ColumnarError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(premerge::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- INPUT FILES ---
    #[error("Source file for table '{table}' not found at {path:?}")]
    #[diagnostic(
        code(premerge::infra::source_not_found),
        help("Check the 'file' entry of the table config or set PREMERGE_DATA_DIR.")
    )]
    SourceNotFound { table: String, path: PathBuf },

    #[error("Could not find raw data under {0:?}")]
    #[diagnostic(
        code(premerge::infra::dataset_root),
        help("Unzip the dataset into e.g. data/raw/dft_road_safety_last_5_years/ or set PREMERGE_DATA_DIR.")
    )]
    DatasetRootNotFound(PathBuf),

    #[error("Unreadable CSV {path:?}: {source}")]
    #[diagnostic(
        code(premerge::infra::csv),
        help("The file is corrupt or not a delimited text file.")
    )]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    // --- CONFIG / SERIALIZATION ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(premerge::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON Error: {0}")]
    #[diagnostic(code(premerge::infra::json))]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(premerge::infra::config))]
    ConfigError(String),

    #[error("Report writer error: {0}")]
    #[diagnostic(code(premerge::infra::report))]
    ReportWriter(String),
}

impl From<ArrowError> for InfrastructureError {
    fn from(err: ArrowError) -> Self {
        InfrastructureError::Columnar(ColumnarError::Arrow(err))
    }
}

impl From<ParquetError> for InfrastructureError {
    fn from(err: ParquetError) -> Self {
        InfrastructureError::Columnar(ColumnarError::Parquet(err))
    }
}
