use std::io::{Read, Write};
use tally_core::{Cell, Table};
use thiserror::Error;

use crate::source::table_from_rows;

#[derive(Error, Debug)]
pub enum CsvError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Reads a delimited text table. The first non-blank row after `skip_rows`
/// is the header; fully blank rows are dropped.
pub fn read_table<R: Read>(data: R, delimiter: u8, skip_rows: usize) -> Result<Table, CsvError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(data);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(text_cell).collect::<Vec<_>>());
    }

    Ok(table_from_rows(rows, skip_rows))
}

fn text_cell(field: &str) -> Cell {
    let field = field.trim_start_matches('\u{feff}');
    if field.trim().is_empty() {
        Cell::Empty
    } else {
        Cell::Text(field.to_string())
    }
}

/// Writes the header row followed by every row, padded to the header width.
pub fn write_table<W: Write>(table: &Table, out: W) -> Result<(), CsvError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.headers())?;

    let width = table.headers().len();
    for row in 0..table.len() {
        writer.write_record((0..width).map(|col| table.cell(row, col).to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_basic_table() {
        let data = b"Date,Narration,Debit,Credit\n2024-01-05,UPI/CR/1/JOHN DOE,,1000\n";
        let table = read_table(data.as_ref(), b',', 0).unwrap();
        assert_eq!(table.headers(), &["Date", "Narration", "Debit", "Credit"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, 1), &Cell::text("UPI/CR/1/JOHN DOE"));
        assert_eq!(table.cell(0, 2), &Cell::Empty);
    }

    #[test]
    fn read_skips_preamble_and_blank_rows() {
        let data = b"Statement of account\n;;\nDate;Narration\n\n05/01/2024;SALARY\n";
        let table = read_table(data.as_ref(), b';', 1).unwrap();
        assert_eq!(table.headers(), &["Date", "Narration"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn read_strips_bom_and_trims_headers() {
        let data = "\u{feff} Narration ,Amount\nRENT,10\n".as_bytes();
        let table = read_table(data, b',', 0).unwrap();
        assert_eq!(table.headers()[0], "Narration");
    }

    #[test]
    fn read_empty_input_is_empty_table() {
        let table = read_table(b"".as_ref(), b',', 0).unwrap();
        assert!(table.headers().is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn write_pads_short_rows() {
        let table = Table::with_rows(
            vec!["A".into(), "B".into()],
            vec![vec![Cell::text("x")], vec![Cell::Number(2.5), Cell::text("y, z")]],
        );
        let mut out = Vec::new();
        write_table(&table, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "A,B\nx,\n2.5,\"y, z\"\n");
    }
}
