use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;
use pricewise_io::{load_table, render_report, write_report};
use pricewise_pricing::{run, Catalogs, HeaderRow, PipelineConfig, ReportRequest};
use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

const PRICE_BOOK: [&str; 19] = [
    "SAP Product ID",
    "Vendor",
    "Product Name",
    "Size",
    "Brand",
    "Price Group",
    "Price Group Description",
    "Pricing Type",
    "Deal ID",
    "Deal Class",
    "Purchase Quantity",
    "Trade Channel ID",
    "Start Date",
    "End Date",
    "List Price",
    "Discount",
    "Case Price",
    "Chargeback",
    "Units Per Case",
];

/// Price book on a "Printer Friendly" sheet, cost catalog as the first sheet
/// of its own workbook.
fn write_catalogs(dir: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("Printer Friendly").unwrap();
    for (col, header) in PRICE_BOOK.iter().enumerate() {
        ws.write_string(0, col as u16, *header).unwrap();
    }
    let rows: [[&str; 12]; 2] = [
        [
            "1001", "Acme Spirits", "Vodka", "750ML", "X", "10", "Vodka 750", "Level Pricing",
            "D1", "Level Pricing", "1 CSE", "C1",
        ],
        [
            "1001", "Acme Spirits", "Vodka", "750ML", "X", "10", "Vodka 750", "Deal Pricing",
            "D2", "EVD – Straight Discount", "5 CSE", "C16",
        ],
    ];
    let prices: [[f64; 5]; 2] = [[120.0, 0.0, 100.0, 5.0, 12.0], [120.0, 10.0, 200.0, 5.0, 12.0]];
    for (r, (text, nums)) in rows.iter().zip(prices.iter()).enumerate() {
        let row = r as u32 + 1;
        for (col, v) in text.iter().enumerate() {
            ws.write_string(row, col as u16, *v).unwrap();
        }
        ws.write_string(row, 12, "2024-01-01").unwrap();
        ws.write_string(row, 13, "2024-12-31").unwrap();
        for (i, v) in nums.iter().enumerate() {
            ws.write_number(row, 14 + i as u16, *v).unwrap();
        }
    }
    wb.save(dir.join("Price_Book_Full.xlsx")).unwrap();

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    for (col, header) in ["Material", "Supplier", "FOB", "Total", "Mov Avg 7210", "Stock in Cases"]
        .iter()
        .enumerate()
    {
        ws.write_string(0, col as u16, *header).unwrap();
    }
    ws.write_string(1, 0, "1001").unwrap();
    ws.write_number(1, 1, 300123.0).unwrap();
    for (i, v) in [60.0, 80.0, 70.0, 10.0].iter().enumerate() {
        ws.write_number(1, 2 + i as u16, *v).unwrap();
    }
    wb.save(dir.join("ZPURCON.xlsx")).unwrap();
}

fn report_for(dir: &Path, threshold: &str) -> pricewise_pricing::PricingReport {
    let price_book = load_table(
        &dir.join("Price_Book_Full.xlsx"),
        Some("Printer Friendly"),
        HeaderRow::First,
    )
    .unwrap();
    let cost_catalog = load_table(&dir.join("ZPURCON.xlsx"), None, HeaderRow::First).unwrap();
    let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let request = ReportRequest::parse("300123", threshold, None, today).unwrap();
    run(
        &PipelineConfig::default(),
        &request,
        &Catalogs {
            price_book,
            cost_catalog,
            chain_pricing: None,
        },
    )
    .unwrap()
}

fn text(range: &Range<Data>, row: u32, col: u32) -> String {
    range
        .get_value((row, col))
        .map(|d| d.to_string())
        .unwrap_or_default()
}

fn number(range: &Range<Data>, row: u32, col: u32) -> Option<f64> {
    match range.get_value((row, col)) {
        Some(Data::Float(n)) => Some(*n),
        Some(Data::Int(n)) => Some(*n as f64),
        Some(Data::DateTime(dt)) => Some(dt.as_f64()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn rendered_workbook_has_sheets_in_report_order() {
    let dir = tempdir().unwrap();
    write_catalogs(dir.path());
    let report = report_for(dir.path(), "0.30");

    let out = dir.path().join("report.xlsx");
    write_report(&report, &out).unwrap();

    let wb = open_workbook_auto(&out).unwrap();
    assert_eq!(
        wb.sheet_names(),
        vec![
            "COGS",
            "GP2 Below Threshold",
            "Pricing by Deal ID",
            "Chain Pricing",
            "X"
        ]
    );
}

#[test]
fn flat_sheets_carry_headers_and_values() {
    let dir = tempdir().unwrap();
    write_catalogs(dir.path());
    let report = report_for(dir.path(), "0.30");
    let out = dir.path().join("report.xlsx");
    write_report(&report, &out).unwrap();

    let mut wb = open_workbook_auto(&out).unwrap();
    let cogs = wb.worksheet_range("COGS").unwrap();
    assert_eq!(text(&cogs, 0, 0), "SAP Product ID");
    assert_eq!(text(&cogs, 1, 0), "1001");

    let below = wb.worksheet_range("GP2 Below Threshold").unwrap();
    let headers: Vec<String> = (0..below.width() as u32).map(|c| text(&below, 0, c)).collect();
    let gp2 = headers.iter().position(|h| h == "GP2 - Negotiated Cost").unwrap() as u32;
    assert_eq!(below.height(), 2);
    assert!((number(&below, 1, gp2).unwrap() - 0.25).abs() < 1e-9);
}

#[test]
fn empty_views_show_a_message() {
    let dir = tempdir().unwrap();
    write_catalogs(dir.path());
    let report = report_for(dir.path(), "0.10");
    let bytes = render_report(&report).unwrap();
    let out = dir.path().join("from_buffer.xlsx");
    std::fs::write(&out, bytes).unwrap();

    let mut wb = open_workbook_auto(&out).unwrap();
    let below = wb.worksheet_range("GP2 Below Threshold").unwrap();
    assert_eq!(
        text(&below, 1, 0),
        "No records found with GP2 margins below 10.0%"
    );

    let chain = wb.worksheet_range("Chain Pricing").unwrap();
    assert_eq!(text(&chain, 0, 0), "Message");
    assert_eq!(
        text(&chain, 1, 0),
        "No chain pricing records found for vendor 300123 on 2024-06-01"
    );
}

#[test]
fn pivot_sheet_stacks_key_headers() {
    let dir = tempdir().unwrap();
    write_catalogs(dir.path());
    let report = report_for(dir.path(), "0.30");
    let out = dir.path().join("report.xlsx");
    write_report(&report, &out).unwrap();

    let mut wb = open_workbook_auto(&out).unwrap();
    let pivot = wb.worksheet_range("X").unwrap();

    let identity: Vec<String> = (0..4).map(|c| text(&pivot, 3, c)).collect();
    assert_eq!(identity, vec!["Price Group", "Price Group Description", "PK", "Pricing Details"]);

    let first: Vec<String> = (0..4).map(|r| text(&pivot, r, 4)).collect();
    assert_eq!(first, vec!["Retail", "Level Pricing", "Level Pricing", "1 CSE"]);
    let second: Vec<String> = (0..4).map(|r| text(&pivot, r, 5)).collect();
    assert_eq!(second, vec!["OP", "Deal Pricing", "EVD – Straight Discount", "5 CSE"]);

    // first data row opens the block and carries the identity
    assert_eq!(text(&pivot, 4, 0), "10");
    assert_eq!(text(&pivot, 4, 1), "Vodka 750");
    assert_eq!(number(&pivot, 4, 2), Some(12.0));
    assert_eq!(text(&pivot, 4, 3), "Negotiated Cost");
    assert_eq!(number(&pivot, 4, 4), Some(80.0));
    // repeated identity cells stay blank
    assert_eq!(text(&pivot, 5, 0), "");
}
