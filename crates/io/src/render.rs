// Report rendering (xlsx only)
//
// The typed report already decides sheets, columns and pivot layout. This
// module only places cells and applies the formatting contract.

use std::path::Path;

use pricewise_pricing::pivot::{Breakdown, PivotTable, ValueKind};
use pricewise_pricing::report::{
    ColumnKind, FlatSheet, PricingReport, ReportSheet, SheetBody, SheetTone,
};
use pricewise_pricing::table::{date_to_excel_serial, format_number};
use pricewise_pricing::CellValue;
use rust_xlsxwriter::{Color, Workbook, Worksheet};
use tracing::{debug, info};

use crate::error::IoError;
use crate::styles::{column_kind, Align, CellStyle, Edges, ATTENTION_TAB, BELOW_THRESHOLD_FILL};

/// Extra characters added to the widest rendered value of a column.
const WIDTH_PADDING: usize = 4;
/// Header rows above a pivot table (one per pivot dimension).
const PIVOT_HEADER_ROWS: u32 = 4;
/// Identity columns plus the pricing-details column.
const PIVOT_LEAD_COLUMNS: u16 = 4;
const PIVOT_IDENTITY_HEADERS: [&str; 4] = [
    "Price Group",
    "Price Group Description",
    "PK",
    "Pricing Details",
];

/// Render the report into xlsx bytes.
pub fn render_report(report: &PricingReport) -> Result<Vec<u8>, IoError> {
    let mut workbook = build_workbook(report)?;
    Ok(workbook.save_to_buffer()?)
}

/// Render the report and save it at `path`.
pub fn write_report(report: &PricingReport, path: &Path) -> Result<(), IoError> {
    let mut workbook = build_workbook(report)?;
    workbook.save(path)?;
    info!(path = %path.display(), sheets = report.sheets.len(), "report written");
    Ok(())
}

fn build_workbook(report: &PricingReport) -> Result<Workbook, IoError> {
    let mut workbook = Workbook::new();
    for sheet in &report.sheets {
        let worksheet = workbook.add_worksheet();
        render_sheet(worksheet, sheet, report.threshold)?;
    }
    Ok(workbook)
}

fn render_sheet(ws: &mut Worksheet, sheet: &ReportSheet, threshold: f64) -> Result<(), IoError> {
    ws.set_name(&sheet.name)?;
    if sheet.tone == SheetTone::Attention {
        ws.set_tab_color(Color::RGB(ATTENTION_TAB));
    }
    match &sheet.body {
        SheetBody::Flat(flat) => render_flat(ws, flat, threshold)?,
        SheetBody::Pivot(pivot) => render_pivot(ws, pivot, threshold)?,
        SheetBody::Message { text } => render_message(ws, text)?,
    }
    debug!(sheet = %sheet.name, "sheet rendered");
    Ok(())
}

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// Width in characters of a value as Excel will display it.
fn rendered_width(value: &CellValue, kind: ColumnKind) -> usize {
    match (value, kind) {
        (CellValue::Empty, _) => 0,
        (CellValue::Number(n), ColumnKind::Currency) => format!("$ {:.2}", n).len() + 2,
        (CellValue::Number(n), ColumnKind::Percent) => format!("{:.2}%", n * 100.0).len(),
        (CellValue::Number(_), ColumnKind::Date) | (CellValue::Date(_), _) => 10,
        (CellValue::Number(n), _) => format_number(*n).len(),
        (CellValue::Text(s), _) => s.chars().count(),
    }
}

fn is_below(value: &CellValue, threshold: f64) -> bool {
    matches!(value, CellValue::Number(n) if *n < threshold)
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    value: &CellValue,
    style: CellStyle,
) -> Result<(), IoError> {
    let format = style.to_format();
    match value {
        CellValue::Empty => {
            if style != CellStyle::default() {
                ws.write_blank(row, col, &format)?;
            }
        }
        CellValue::Text(s) => {
            ws.write_string_with_format(row, col, s, &format)?;
        }
        CellValue::Number(n) => {
            ws.write_number_with_format(row, col, *n, &format)?;
        }
        CellValue::Date(d) => {
            ws.write_number_with_format(row, col, date_to_excel_serial(*d), &format)?;
        }
    }
    Ok(())
}

fn set_widths(ws: &mut Worksheet, widths: &[usize]) -> Result<(), IoError> {
    for (col, width) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, (width + WIDTH_PADDING) as f64)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Flat sheets
// ---------------------------------------------------------------------------

fn render_flat(ws: &mut Worksheet, sheet: &FlatSheet, threshold: f64) -> Result<(), IoError> {
    let header = CellStyle::header().to_format();
    if sheet.columns.is_empty() {
        ws.write_string_with_format(0, 0, "Message", &header)?;
    }
    let mut widths: Vec<usize> = sheet
        .columns
        .iter()
        .map(|c| c.header.chars().count())
        .collect();
    for (col, column) in sheet.columns.iter().enumerate() {
        ws.write_string_with_format(0, col as u16, &column.header, &header)?;
    }

    for (r, row) in sheet.rows.iter().enumerate() {
        let excel_row = r as u32 + 1;
        for (col, (value, column)) in row.iter().zip(&sheet.columns).enumerate() {
            let mut style = CellStyle::for_column(column.kind);
            if column.highlight
                || (column.kind == ColumnKind::Percent && is_below(value, threshold))
            {
                style = style.filled(BELOW_THRESHOLD_FILL);
            }
            write_cell(ws, excel_row, col as u16, value, style)?;
            widths[col] = widths[col].max(rendered_width(value, column.kind));
        }
    }

    if sheet.rows.is_empty() {
        if let Some(message) = &sheet.empty_message {
            ws.write_string_with_format(1, 0, message, &CellStyle::message().to_format())?;
            if let Some(first) = widths.first_mut() {
                *first = (*first).max(message.chars().count());
            } else {
                widths.push(message.chars().count());
            }
        }
    }

    set_widths(ws, &widths)?;
    ws.set_freeze_panes(1, 0)?;
    Ok(())
}

fn render_message(ws: &mut Worksheet, text: &str) -> Result<(), IoError> {
    ws.write_string_with_format(0, 0, "Message", &CellStyle::header().to_format())?;
    ws.write_string_with_format(1, 0, text, &CellStyle::message().to_format())?;
    set_widths(ws, &[text.chars().count().max("Message".len())])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Pivot sheets
// ---------------------------------------------------------------------------

fn render_pivot(ws: &mut Worksheet, pivot: &PivotTable, threshold: f64) -> Result<(), IoError> {
    let last_header = PIVOT_HEADER_ROWS - 1;
    let mut widths: Vec<usize> = PIVOT_IDENTITY_HEADERS
        .iter()
        .map(|h| h.chars().count())
        .chain(pivot.columns.iter().map(|_| 0))
        .collect();

    // Identity headers sit on the last header row.
    for (col, text) in PIVOT_IDENTITY_HEADERS.iter().enumerate() {
        let mut edges = Edges::default().with_bottom(true);
        if col as u16 == PIVOT_LEAD_COLUMNS - 1 {
            edges = Edges::sides().with_bottom(true);
        }
        let style = CellStyle::header().aligned(Align::Center).bordered(edges);
        ws.write_string_with_format(last_header, col as u16, *text, &style.to_format())?;
    }
    for row in 0..last_header {
        let style = CellStyle::header().bordered(Edges::sides());
        ws.write_blank(row, PIVOT_LEAD_COLUMNS - 1, &style.to_format())?;
    }

    // One stacked header per pivot column: channel, pricing type, deal class,
    // purchase quantity.
    for (j, key) in pivot.columns.iter().enumerate() {
        let col = PIVOT_LEAD_COLUMNS + j as u16;
        for (level, part) in key.parts().iter().enumerate() {
            let edges = Edges::sides().with_bottom(level as u32 == last_header);
            let style = CellStyle::header().aligned(Align::Center).bordered(edges);
            ws.write_string_with_format(level as u32, col, *part, &style.to_format())?;
            let w = &mut widths[PIVOT_LEAD_COLUMNS as usize + j];
            *w = (*w).max(part.chars().count());
        }
    }

    for (i, row) in pivot.rows.iter().enumerate() {
        let excel_row = PIVOT_HEADER_ROWS + i as u32;
        let block_end = row.detail == Breakdown::DealDescription;
        let centered = CellStyle::default()
            .aligned(Align::Center)
            .bordered(Edges::default().with_bottom(block_end));

        if row.block_start {
            let identity = [
                CellValue::Text(row.identity.price_group.clone()),
                CellValue::Text(row.identity.description.clone()),
                CellValue::Number(row.identity.units_per_case),
            ];
            for (col, value) in identity.iter().enumerate() {
                write_cell(ws, excel_row, col as u16, value, centered)?;
                widths[col] = widths[col].max(rendered_width(value, ColumnKind::Text));
            }
        } else if block_end {
            for col in 0..PIVOT_LEAD_COLUMNS - 1 {
                write_cell(ws, excel_row, col, &CellValue::Empty, centered)?;
            }
        }

        let label = CellValue::Text(row.detail.label().to_string());
        let details = CellStyle::default()
            .aligned(Align::Right)
            .bordered(Edges::sides().with_bottom(block_end));
        write_cell(ws, excel_row, PIVOT_LEAD_COLUMNS - 1, &label, details)?;
        widths[PIVOT_LEAD_COLUMNS as usize - 1] =
            widths[PIVOT_LEAD_COLUMNS as usize - 1].max(row.detail.label().len());

        let kind = row.detail.kind();
        for (j, value) in row.cells.iter().enumerate() {
            let mut style =
                CellStyle::for_value(kind).bordered(Edges::sides().with_bottom(block_end));
            if kind == ValueKind::Percent && is_below(value, threshold) {
                style = style.filled(BELOW_THRESHOLD_FILL);
            }
            write_cell(ws, excel_row, PIVOT_LEAD_COLUMNS + j as u16, value, style)?;
            let w = &mut widths[PIVOT_LEAD_COLUMNS as usize + j];
            *w = (*w).max(rendered_width(value, column_kind(kind)));
        }
    }

    set_widths(ws, &widths)?;
    ws.set_freeze_panes(PIVOT_HEADER_ROWS, PIVOT_LEAD_COLUMNS)?;
    Ok(())
}
