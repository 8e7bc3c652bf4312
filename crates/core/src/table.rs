use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::money::Money;

/// Accepted textual date layouts, tried in order. Day-first layouts come
/// before month-first ones since most statements are issued that way.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d-%b-%Y", "%d %b %Y", "%d-%b-%y",
    "%d/%m/%y", "%Y/%m/%d", "%m/%d/%Y", "%b %d, %Y",
];

/// A single typed value read from a statement or rule table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date(s),
            Cell::Number(n) => serial_to_date(*n),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match self {
            Cell::Number(n) => Money::from_f64(*n),
            Cell::Text(s) => Money::parse(s),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Cell::Date(d)
    }
}

/// Parses a textual date, ignoring a trailing time component
/// (`2024-01-05 00:00:00`, `2024-01-05T10:30:00`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(d) = parse_with_formats(s) {
        return Some(d);
    }
    let head = s.split(['T', ' ']).next().unwrap_or(s);
    if head != s {
        return parse_with_formats(head);
    }
    None
}

fn parse_with_formats(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        // %Y happily reads "24" as year 24; treat that as a miss.
        .find(|d| d.year() >= 1900)
}

/// Converts a spreadsheet serial day number (1900 date system) to a date.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    // Epoch is 1899-12-30 to absorb the 1900 leap year bug.
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_days(Days::new(serial.trunc() as u64))
}

/// An ordered table of typed cells with trimmed header names.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers: headers.into_iter().map(|h| h.trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(headers);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Cells past the end of a short row read as `Cell::Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    /// Exact header lookup, ignoring case and surrounding whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }

    /// Writes `values` into the named column, replacing it if it already
    /// exists, appending it otherwise. Missing values are left empty.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        let col = match self.column_index(name) {
            Some(col) => col,
            None => {
                self.headers.push(name.trim().to_string());
                self.headers.len() - 1
            }
        };
        let width = self.headers.len();
        let mut values = values.into_iter();
        for row in &mut self.rows {
            if row.len() < width {
                row.resize(width, Cell::Empty);
            }
            row[col] = values.next().unwrap_or_default();
        }
    }

    /// Rows as header-keyed JSON objects, for structured output. Every
    /// column is kept; see [`Table::record_keys`].
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        let keys = self.record_keys();
        (0..self.rows.len())
            .map(|r| {
                keys.iter()
                    .enumerate()
                    .map(|(c, k)| (k.clone(), self.cell(r, c).to_json()))
                    .collect()
            })
            .collect()
    }

    /// Headers made unique: a blank header becomes `Column N`, a repeated
    /// one gets a `_2`, `_3`, ... suffix.
    pub fn record_keys(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                let base = if h.is_empty() {
                    format!("Column {}", idx + 1)
                } else {
                    h.clone()
                };
                let mut key = base.clone();
                let mut n = 1;
                while !seen.insert(key.to_lowercase()) {
                    n += 1;
                    key = format!("{base}_{n}");
                }
                key
            })
            .collect()
    }
}
