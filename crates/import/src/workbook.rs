use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use tally_core::table::serial_to_date;
use tally_core::{Cell, Table};
use thiserror::Error;

use crate::source::table_from_rows;

#[derive(Error, Debug)]
pub enum WorkbookError {
    #[error("Failed to open workbook: {0}")]
    Open(#[from] calamine::Error),
    #[error("Workbook has no sheets")]
    NoSheets,
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),
}

/// Reads one sheet (the first unless `sheet` names another) of an
/// XLSX/XLSM/XLS/ODS workbook into a table.
pub fn read_workbook(
    path: &Path,
    sheet: Option<&str>,
    skip_rows: usize,
) -> Result<Table, WorkbookError> {
    let mut workbook = open_workbook_auto(path)?;
    let names = workbook.sheet_names();

    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.eq_ignore_ascii_case(wanted.trim()))
            .cloned()
            .ok_or_else(|| WorkbookError::SheetNotFound(wanted.to_string()))?,
        None => names.first().cloned().ok_or(WorkbookError::NoSheets)?,
    };

    let range = workbook.worksheet_range(&name)?;
    let rows: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();

    tracing::debug!("Read sheet '{}' from {}: {} raw rows", name, path.display(), rows.len());
    Ok(table_from_rows(rows, skip_rows))
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => {
            if s.trim().is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.clone())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) if !dt.is_duration() => serial_to_date(dt.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Number(dt.as_f64())),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
    }
}
