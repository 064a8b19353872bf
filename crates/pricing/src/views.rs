//! Row-level report views over the deduplicated rows: below-threshold, deals
//! active on the as-of date, and brand partitions. Views never mutate the
//! canonical row-set.

use chrono::NaiveDate;

use crate::model::{CostVariant, ProductRow};
use crate::pivot::natural_cmp;
use crate::report::{ColumnKind, FlatSheet, SheetColumn};
use crate::schema::{CostRole, Field, SchemaPlan};
use crate::table::CellValue;

// ---------------------------------------------------------------------------
// Display columns
// ---------------------------------------------------------------------------

/// A column of a flat product-row view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowColumn {
    Field(Field),
    Cost(CostVariant),
    ListBottle,
    BottlePrice,
    Gp2(CostVariant),
}

/// Column set shared by the below-threshold, deal and flat brand views.
pub const DISPLAY_COLUMNS: [RowColumn; 19] = [
    RowColumn::Field(Field::PriceGroup),
    RowColumn::Field(Field::PriceGroupDescription),
    RowColumn::Field(Field::PricingType),
    RowColumn::Field(Field::DealId),
    RowColumn::Field(Field::DealClass),
    RowColumn::Field(Field::PurchaseQuantity),
    RowColumn::Field(Field::DealDescription),
    RowColumn::Field(Field::StartDate),
    RowColumn::Field(Field::EndDate),
    RowColumn::Field(Field::ListCase),
    RowColumn::Field(Field::Discount),
    RowColumn::Field(Field::Chargeback),
    RowColumn::Cost(CostVariant::Negotiated),
    RowColumn::Cost(CostVariant::Average),
    RowColumn::ListBottle,
    RowColumn::Field(Field::CasePrice),
    RowColumn::BottlePrice,
    RowColumn::Gp2(CostVariant::Negotiated),
    RowColumn::Gp2(CostVariant::Average),
];

impl RowColumn {
    pub fn header(&self) -> &'static str {
        match self {
            Self::Field(f) => f.label(),
            Self::Cost(v) => v.cost_label(),
            Self::ListBottle => "List Bottle",
            Self::BottlePrice => "Bottle Price",
            Self::Gp2(v) => v.gp2_label(),
        }
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Field(f) if f.is_date() => ColumnKind::Date,
            Self::Field(Field::UnitsPerCase) => ColumnKind::Number,
            Self::Field(f) if f.is_numeric() => ColumnKind::Currency,
            Self::Field(_) => ColumnKind::Text,
            Self::Cost(_) | Self::ListBottle | Self::BottlePrice => ColumnKind::Currency,
            Self::Gp2(_) => ColumnKind::Percent,
        }
    }

    fn available(&self, plan: &SchemaPlan) -> bool {
        match self {
            Self::Field(f) => plan.has(*f),
            Self::Cost(CostVariant::Negotiated) => plan.has_cost(CostRole::NegotiatedCost),
            Self::Cost(CostVariant::Average) => plan.has_cost(CostRole::AverageCost),
            Self::ListBottle | Self::BottlePrice | Self::Gp2(_) => true,
        }
    }

    pub fn value(&self, row: &ProductRow) -> CellValue {
        let num = |v: Option<f64>| v.map(CellValue::Number).unwrap_or_default();
        match self {
            Self::Field(f) => row.value(*f),
            Self::Cost(v) => num(row.costs.get(*v)),
            Self::ListBottle => num(row.metrics.list_bottle),
            Self::BottlePrice => num(row.metrics.bottle_price),
            Self::Gp2(v) => num(row.metrics.gp2.get(*v)),
        }
    }
}

/// Display columns whose source exists; derived columns always do.
pub fn display_columns(plan: &SchemaPlan) -> Vec<RowColumn> {
    DISPLAY_COLUMNS
        .iter()
        .copied()
        .filter(|c| c.available(plan))
        .collect()
}

/// Render rows into a flat sheet.
pub fn flat_sheet(rows: &[&ProductRow], columns: &[RowColumn]) -> FlatSheet {
    FlatSheet {
        columns: columns
            .iter()
            .map(|c| SheetColumn::new(c.header(), c.kind()))
            .collect(),
        rows: rows
            .iter()
            .map(|r| columns.iter().map(|c| c.value(r)).collect())
            .collect(),
        empty_message: None,
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Rows where either GP2 variant is present and strictly below `threshold`.
pub fn below_threshold(rows: &[ProductRow], threshold: f64) -> Vec<&ProductRow> {
    rows.iter().filter(|r| r.metrics.gp2.below(threshold)).collect()
}

/// Rows with an open start or end, or that started on or before `as_of`,
/// sorted by deal id then deal description.
pub fn active_deals(rows: &[ProductRow], as_of: NaiveDate) -> Vec<&ProductRow> {
    let mut out: Vec<&ProductRow> = rows
        .iter()
        .filter(|r| match (r.start_date, r.end_date) {
            (None, _) | (_, None) => true,
            (Some(start), Some(_)) => start <= as_of,
        })
        .collect();
    out.sort_by(|a, b| {
        cmp_missing_last(a.deal_id.as_deref(), b.deal_id.as_deref())
            .then_with(|| cmp_missing_last(a.deal_description.as_deref(), b.deal_description.as_deref()))
    });
    out
}

fn cmp_missing_last(a: Option<&str>, b: Option<&str>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(x), Some(y)) => natural_cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Rows grouped by brand, brands in first-seen order. Rows without a brand
/// are left out.
pub fn brands(rows: &[ProductRow]) -> Vec<(String, Vec<&ProductRow>)> {
    let mut out: Vec<(String, Vec<&ProductRow>)> = Vec::new();
    for row in rows {
        let Some(brand) = row.brand.as_deref() else { continue };
        match out.iter_mut().find(|(b, _)| b == brand) {
            Some((_, members)) => members.push(row),
            None => out.push((brand.to_string(), vec![row])),
        }
    }
    out
}
