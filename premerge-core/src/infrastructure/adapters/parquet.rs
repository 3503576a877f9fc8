// premerge-core/src/infrastructure/adapters/parquet.rs

use datafusion::arrow::array::{ArrayRef, Date32Array, Float64Array, Int64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, Field, Schema};
use datafusion::arrow::record_batch::{RecordBatch, RecordBatchOptions};
use datafusion::parquet::arrow::ArrowWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::domain::table::{Column, ColumnKind, RawTable, Value};
use crate::error::PremergeError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::sink::TableSink;

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

pub struct ParquetSink {
    target_dir: PathBuf,
}

impl ParquetSink {
    pub fn new(target_dir: &Path) -> Self {
        Self {
            target_dir: target_dir.to_path_buf(),
        }
    }
}

impl TableSink for ParquetSink {
    fn write_table(&self, file_name: &str, table: &RawTable) -> Result<PathBuf, PremergeError> {
        let path = self.target_dir.join(file_name);
        let bytes = encode_parquet(table)?;
        atomic_write(&path, bytes)?;
        info!(path = ?path, rows = table.row_count(), "Saved table");
        Ok(path)
    }
}

/// One record batch per table. Keys and categories are written as text,
/// integral numeric columns as Int64, everything else numeric as Float64.
pub fn encode_parquet(table: &RawTable) -> Result<Vec<u8>, InfrastructureError> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = table
        .columns
        .iter()
        .map(|c| {
            let (data_type, array) = to_arrow(c);
            (Field::new(&c.name, data_type, true), array)
        })
        .unzip();

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.row_count()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buffer)
}

fn to_arrow(column: &Column) -> (DataType, ArrayRef) {
    match column.kind {
        ColumnKind::Numeric if is_integral(column) => {
            let values: Vec<Option<i64>> = column
                .values
                .iter()
                .map(|v| v.as_f64().map(|n| n as i64))
                .collect();
            (DataType::Int64, Arc::new(Int64Array::from(values)))
        }
        ColumnKind::Numeric => {
            let values: Vec<Option<f64>> = column.values.iter().map(Value::as_f64).collect();
            (DataType::Float64, Arc::new(Float64Array::from(values)))
        }
        ColumnKind::Date => {
            let values: Vec<Option<i32>> = column
                .values
                .iter()
                .map(|v| match v {
                    Value::Date(d) => {
                        Some(chrono::Datelike::num_days_from_ce(d) - UNIX_EPOCH_DAYS_FROM_CE)
                    }
                    _ => None,
                })
                .collect();
            (DataType::Date32, Arc::new(Date32Array::from(values)))
        }
        ColumnKind::Key | ColumnKind::Categorical => {
            let values: Vec<Option<String>> = column
                .values
                .iter()
                .map(|v| (!v.is_missing()).then(|| v.render()))
                .collect();
            (DataType::Utf8, Arc::new(StringArray::from(values)))
        }
    }
}

fn is_integral(column: &Column) -> bool {
    column
        .values
        .iter()
        .filter_map(Value::as_f64)
        .all(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
}
