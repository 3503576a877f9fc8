// premerge-core/src/infrastructure/adapters/mod.rs

pub mod csv_reader;
pub mod parquet;

pub use csv_reader::CsvSource;
pub use parquet::ParquetSink;
