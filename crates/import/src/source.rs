use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tally_core::{Cell, Table};
use thiserror::Error;

use crate::csv::{read_table, CsvError};
use crate::workbook::{read_workbook, WorkbookError};

#[derive(Error, Debug)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] CsvError),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
    #[error("Unsupported table format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
    Workbook,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Ok(TableFormat::Csv),
            "tsv" => Ok(TableFormat::Tsv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(TableFormat::Workbook),
            other => Err(TableError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// How to read an input table from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    /// Workbook sheet name; the first sheet when unset.
    pub sheet: Option<String>,
    /// Leading non-blank rows to discard before the header row.
    pub skip_rows: usize,
}

pub fn load_table(path: &Path, options: &ReadOptions) -> Result<Table, TableError> {
    let table = match TableFormat::from_path(path)? {
        TableFormat::Csv => {
            let file = BufReader::new(File::open(path)?);
            read_table(file, b',', options.skip_rows)?
        }
        TableFormat::Tsv => {
            let file = BufReader::new(File::open(path)?);
            read_table(file, b'\t', options.skip_rows)?
        }
        TableFormat::Workbook => {
            read_workbook(path, options.sheet.as_deref(), options.skip_rows)?
        }
    };
    tracing::info!(
        "Loaded {}: {} columns, {} rows",
        path.display(),
        table.headers().len(),
        table.len()
    );
    Ok(table)
}

/// Builds a table from raw rows: blank rows are dropped, `skip_rows` leading
/// rows are discarded, the next row becomes the header. Rows wider than the
/// header get generated `Column N` names for the extra cells.
pub(crate) fn table_from_rows(rows: Vec<Vec<Cell>>, skip_rows: usize) -> Table {
    let mut rows = rows
        .into_iter()
        .filter(|row| !row.iter().all(Cell::is_empty))
        .skip(skip_rows);

    let Some(header) = rows.next() else {
        return Table::default();
    };
    let mut headers: Vec<String> = header.iter().map(|c| c.to_string()).collect();
    let body: Vec<Vec<Cell>> = rows.collect();

    let width = body.iter().map(Vec::len).max().unwrap_or(0);
    while headers.len() < width {
        headers.push(format!("Column {}", headers.len() + 1));
    }

    Table::with_rows(headers, body)
}
