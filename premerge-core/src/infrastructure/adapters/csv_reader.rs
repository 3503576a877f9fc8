// premerge-core/src/infrastructure/adapters/csv_reader.rs

use csv::{ByteRecord, ReaderBuilder};
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::domain::table::{RawTable, coerce_column};
use crate::error::PremergeError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::source::{SourceRequest, TableSource};

/// Reads comma-separated files with a header row. Cells are decoded lossily
/// so a stray Latin-1 byte degrades one value instead of the whole load.
pub struct CsvSource;

impl TableSource for CsvSource {
    fn read_table(&self, request: &SourceRequest) -> Result<RawTable, PremergeError> {
        Ok(read_csv(request)?)
    }
}

#[instrument(skip(request), fields(table = %request.table.name))]
pub fn read_csv(request: &SourceRequest) -> Result<RawTable, InfrastructureError> {
    let path = request.path.as_path();
    if !path.is_file() {
        return Err(InfrastructureError::SourceNotFound {
            table: request.table.name.clone(),
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source: csv::Error| InfrastructureError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(csv_err)?;

    let headers = read_headers(&mut reader, path).map_err(csv_err)?;
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    let mut record = ByteRecord::new();
    let mut rows = 0usize;
    let mut truncated = false;
    while reader.read_byte_record(&mut record).map_err(csv_err)? {
        if request.row_limit.is_some_and(|limit| rows >= limit) {
            truncated = true;
            break;
        }
        // Short rows are padded with empty (missing) cells, extra cells dropped.
        for (i, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(i)
                .map(|b| String::from_utf8_lossy(b).into_owned())
                .unwrap_or_default();
            column.push(cell);
        }
        rows += 1;
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(name, raw)| {
            coerce_column(
                name,
                raw,
                request.table.declared_kind(name),
                &request.sentinels,
            )
        })
        .collect::<Vec<_>>();

    for column in &columns {
        if column.sentinel_count > 0 || column.malformed_count > 0 {
            debug!(
                column = %column.name,
                sentinels = column.sentinel_count,
                malformed = column.malformed_count,
                "Coerced column"
            );
        }
    }

    info!(rows, columns = columns.len(), truncated, path = ?path, "Loaded table");

    let mut table = RawTable::new(&request.table.name, columns);
    table.source = path.to_path_buf();
    table.row_limit = request.row_limit;
    table.truncated = truncated;
    Ok(table)
}

fn read_headers<R: std::io::Read>(
    reader: &mut csv::Reader<R>,
    path: &Path,
) -> Result<Vec<String>, csv::Error> {
    let headers = reader
        .byte_headers()?
        .iter()
        .map(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                .to_string()
        })
        .collect::<Vec<_>>();
    debug!(path = ?path, headers = headers.len(), "Read CSV header");
    Ok(headers)
}
