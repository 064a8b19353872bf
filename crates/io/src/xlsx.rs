// Excel catalog import (xlsx, xls, xlsb, ods)
//
// Import only: each sheet becomes a dense grid of `CellValue`s anchored at A1.
// Header discovery and typing happen later, in `Table::from_grid`.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use pricewise_pricing::table::excel_serial_to_date;
use pricewise_pricing::CellValue;
use tracing::debug;

use crate::error::IoError;

/// Sheet names in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, IoError> {
    let workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet (the first when `sheet` is `None`) into a grid.
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<CellValue>>, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::open(path, e))?;
    let names: Vec<String> = workbook.sheet_names().to_vec();

    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case(wanted)))
            .cloned()
            .ok_or_else(|| IoError::MissingSheet {
                path: path.to_path_buf(),
                sheet: wanted.to_string(),
                available: names.clone(),
            })?,
        None => names
            .first()
            .cloned()
            .ok_or_else(|| IoError::read(path, "workbook contains no sheets"))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| IoError::read(path, format!("failed to read sheet '{}': {}", name, e)))?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let (height, width) = range.get_size();
    debug!(sheet = %name, rows = height, cols = width, "sheet range");

    let mut grid: Vec<Vec<CellValue>> = Vec::with_capacity(start_row as usize + height);
    grid.resize_with(start_row as usize, Vec::new);
    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(convert));
        grid.push(cells);
    }
    Ok(grid)
}

fn convert(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        // Error cells carry no usable value
        Data::Error(_) => CellValue::Empty,
        // 1900 date system assumed
        Data::DateTime(dt) => match excel_serial_to_date(dt.as_f64()) {
            Some(d) => CellValue::Date(d),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            let text = CellValue::Text(s.clone());
            text.as_date().map(CellValue::Date).unwrap_or(text)
        }
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
