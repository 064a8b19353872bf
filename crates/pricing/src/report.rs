//! Typed report handed to the renderer. Layout decisions (which sheets, which
//! columns, pivot vs flat) live here; cell styling lives in the renderer.

use std::collections::HashSet;
use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

use crate::allocate::GroupAllocation;
use crate::dedup::AppliedStrategy;
use crate::pivot::PivotTable;
use crate::request::VendorId;
use crate::table::CellValue;

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Number,
    Currency,
    Percent,
    Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetColumn {
    pub header: String,
    pub kind: ColumnKind,
    /// Fill every cell of this column (inconsistent-cost report).
    pub highlight: bool,
}

impl SheetColumn {
    pub fn new(header: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            header: header.into(),
            kind,
            highlight: false,
        }
    }

    pub fn highlighted(mut self) -> Self {
        self.highlight = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatSheet {
    pub columns: Vec<SheetColumn>,
    pub rows: Vec<Vec<CellValue>>,
    /// Shown under the header when there are no rows.
    pub empty_message: Option<String>,
}

impl FlatSheet {
    pub fn with_empty_message(mut self, message: impl Into<String>) -> Self {
        self.empty_message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum SheetBody {
    Flat(FlatSheet),
    Pivot(PivotTable),
    /// A single message cell under a `Message` header.
    Message { text: String },
}

/// Whether a sheet tab should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetTone {
    Normal,
    Attention,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSheet {
    pub name: String,
    pub tone: SheetTone,
    pub body: SheetBody,
}

impl ReportSheet {
    pub fn flat(name: impl Into<String>, sheet: FlatSheet) -> Self {
        Self {
            name: name.into(),
            tone: SheetTone::Normal,
            body: SheetBody::Flat(sheet),
        }
    }

    pub fn attention(mut self) -> Self {
        self.tone = SheetTone::Attention;
        self
    }
}

// ---------------------------------------------------------------------------
// Report + summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct BrandSummary {
    pub brand: String,
    pub sheet: String,
    pub rows: usize,
    /// `pivot` or `flat`.
    pub layout: &'static str,
    /// Why the brand fell back to a flat sheet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

/// Counts and decisions of one run, for logs and `--json` output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub merged_rows: usize,
    pub vendor_rows: usize,
    pub cost_reference_rows: usize,
    pub filtered_rows: usize,
    pub deduplicated_rows: usize,
    pub dedup_strategy: Option<AppliedStrategy>,
    pub allocations: Vec<GroupAllocation>,
    pub below_threshold_rows: usize,
    pub deal_rows: usize,
    pub chain_rows: usize,
    pub inconsistent_price_groups: Vec<String>,
    pub brands: Vec<BrandSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PricingReport {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub threshold: f64,
    pub as_of: NaiveDate,
    pub sheets: Vec<ReportSheet>,
    pub summary: RunSummary,
}

impl PricingReport {
    pub fn sheet(&self, name: &str) -> Option<&ReportSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// `PW_<vendor>_<name>_<YYYYMMDD_HHMMSS>.xlsx`
    pub fn file_name(&self, at: NaiveDateTime) -> String {
        output_filename(&self.vendor_id, &self.vendor_name, at)
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

fn non_word() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w-]").expect("valid vendor-name regex"))
}

/// Keep word characters and `-`, trim `_`, `NoName` when nothing is left.
pub fn sanitize_vendor_name(name: &str) -> String {
    let cleaned = non_word().replace_all(name, "");
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        "NoName".to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn output_filename(vendor_id: &VendorId, vendor_name: &str, at: NaiveDateTime) -> String {
    format!(
        "PW_{}_{}_{}.xlsx",
        vendor_id,
        sanitize_vendor_name(vendor_name),
        at.format("%Y%m%d_%H%M%S")
    )
}

const MAX_SHEET_NAME: usize = 31;
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Allocates Excel-safe, case-insensitively unique sheet names.
#[derive(Debug, Default)]
pub struct SheetNames {
    taken: HashSet<String>,
}

impl SheetNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, wanted: &str) -> String {
        let cleaned: String = wanted
            .chars()
            .filter(|c| !INVALID_SHEET_CHARS.contains(c))
            .collect();
        let cut: String = cleaned
            .trim()
            .trim_matches('\'')
            .chars()
            .take(MAX_SHEET_NAME)
            .collect();
        // the cut can expose a trailing space or apostrophe
        let cut = cut.trim().trim_matches('\'').trim();
        let base = if cut.is_empty() { "Sheet".to_string() } else { cut.to_string() };

        let mut candidate = base.clone();
        let mut n = 2;
        while self.taken.contains(&candidate.to_lowercase()) {
            let suffix = format!(" ({n})");
            let keep = MAX_SHEET_NAME - suffix.chars().count();
            candidate = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
            n += 1;
        }
        self.taken.insert(candidate.to_lowercase());
        candidate
    }
}
