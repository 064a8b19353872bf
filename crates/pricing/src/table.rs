//! In-memory tabular data as loaded from a catalog sheet.
//!
//! Loaders (xlsx, csv) produce a raw grid of [`CellValue`]s; [`Table::from_grid`]
//! locates the header row and turns the remainder into data rows padded to the
//! header width.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

use crate::error::PricingError;

/// A single cell as read from a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    /// Empty cells and whitespace-only text both count as blank.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            CellValue::Number(n) => n.is_nan(),
            CellValue::Date(_) => false,
        }
    }

    /// Trimmed text rendering, `None` when blank.
    ///
    /// Integral numbers render without a fractional part so that numeric ids
    /// read from a spreadsheet (`300001.0`) compare equal to their text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            CellValue::Number(n) if n.is_nan() => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }

    /// Numeric view of the cell. Text is parsed after trimming; dates and
    /// unparsable text yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) if n.is_finite() => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Date view of the cell. Numbers are treated as Excel serial dates.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::Number(n) => excel_serial_to_date(*n),
            CellValue::Text(s) => parse_date_text(s.trim()),
            CellValue::Empty => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => f.write_str(&format_number(*n)),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

/// Format a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

const EXCEL_MAX_SERIAL: f64 = 2_958_465.0; // 9999-12-31

fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

/// Convert an Excel serial day number to a calendar date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > EXCEL_MAX_SERIAL {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// Convert a calendar date to its Excel serial day number.
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Where the header row of a sheet lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRow<'a> {
    /// The first row of the sheet.
    First,
    /// The first row whose cell in `column` contains `needle`
    /// (case-insensitive). Rows above it are title/banner rows.
    Marker { column: usize, needle: &'a str },
}

/// A named table: one header row plus data rows of equal width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut r| {
                r.resize(width, CellValue::Empty);
                r
            })
            .collect();
        Self {
            name: name.into(),
            headers,
            rows,
        }
    }

    /// Build a table from a raw grid, locating the header row first.
    ///
    /// Header cells are trimmed; blank header cells become `Unnamed: <n>`.
    /// Trailing rows that are entirely blank are dropped.
    pub fn from_grid(
        name: impl Into<String>,
        grid: Vec<Vec<CellValue>>,
        header: HeaderRow<'_>,
    ) -> Result<Self, PricingError> {
        let name = name.into();
        let header_idx = match header {
            HeaderRow::First => {
                if grid.is_empty() {
                    return Err(PricingError::Input {
                        table: name,
                        message: "sheet is empty".to_string(),
                    });
                }
                0
            }
            HeaderRow::Marker { column, needle } => {
                let needle = needle.to_lowercase();
                grid.iter()
                    .position(|row| {
                        row.get(column)
                            .and_then(CellValue::as_text)
                            .is_some_and(|t| t.to_lowercase().contains(&needle))
                    })
                    .ok_or_else(|| PricingError::Input {
                        table: name.clone(),
                        message: format!("could not find a header row containing '{}'", needle),
                    })?
            }
        };

        let mut rows = grid.into_iter().skip(header_idx);
        let header_cells = rows.next().unwrap_or_default();
        let headers: Vec<String> = header_cells
            .iter()
            .enumerate()
            .map(|(i, c)| c.as_text().unwrap_or_else(|| format!("Unnamed: {}", i)))
            .collect();

        let mut data: Vec<Vec<CellValue>> = rows.collect();
        while data.last().is_some_and(|r| r.iter().all(CellValue::is_blank)) {
            data.pop();
        }

        Ok(Self::new(name, headers, data))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the column whose (trimmed) header equals `header`.
    pub fn column_index(&self, header: &str) -> Option<usize> {
        let header = header.trim();
        self.headers.iter().position(|h| h == header)
    }

    /// Like [`column_index`](Self::column_index) but a missing column is an
    /// input error.
    pub fn require_column(&self, header: &str) -> Result<usize, PricingError> {
        self.column_index(header)
            .ok_or_else(|| PricingError::missing_column(&self.name, header, &self.headers))
    }

    /// Cell at (row, col); out-of-range positions read as empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// Rewrite every header through `f`.
    pub fn map_headers(&mut self, f: impl Fn(&str) -> String) {
        for h in &mut self.headers {
            *h = f(h);
        }
    }
}

/// Title-case each alphabetic run: `SAP Product ID` becomes `Sap Product Id`.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
