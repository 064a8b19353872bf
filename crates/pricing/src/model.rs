//! Merged product rows: typed price-book fields, cost values and derived metrics.

use chrono::NaiveDate;
use serde::Serialize;

use crate::schema::Field;
use crate::table::CellValue;

// ---------------------------------------------------------------------------
// Cost variants
// ---------------------------------------------------------------------------

/// The two cost columns a margin is computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostVariant {
    /// Negotiated cost (`Total` in the cost catalog).
    Negotiated,
    /// Weighted moving-average floor-stock cost (`Mov Avg 7210`).
    Average,
}

impl CostVariant {
    pub const ALL: [CostVariant; 2] = [CostVariant::Negotiated, CostVariant::Average];

    pub fn cost_label(&self) -> &'static str {
        match self {
            Self::Negotiated => "Negotiated Cost",
            Self::Average => "Avg Cost",
        }
    }

    pub fn gp2_label(&self) -> &'static str {
        match self {
            Self::Negotiated => "GP2 - Negotiated Cost",
            Self::Average => "GP2 - Avg Cost",
        }
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// Cost-catalog values merged onto a product row. `None` means the product had
/// no cost row or the cell was blank; the metrics stage coerces to 0.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CostValues {
    pub negotiated: Option<f64>,
    pub average: Option<f64>,
    pub bottles_on_hand: Option<f64>,
    pub cases_on_hand: Option<f64>,
}

impl CostValues {
    pub fn get(&self, variant: CostVariant) -> Option<f64> {
        match variant {
            CostVariant::Negotiated => self.negotiated,
            CostVariant::Average => self.average,
        }
    }
}

/// GP2 per cost variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Gp2 {
    pub negotiated: Option<f64>,
    pub average: Option<f64>,
}

impl Gp2 {
    pub fn get(&self, variant: CostVariant) -> Option<f64> {
        match variant {
            CostVariant::Negotiated => self.negotiated,
            CostVariant::Average => self.average,
        }
    }

    /// True when either variant is present and strictly below `threshold`.
    pub fn below(&self, threshold: f64) -> bool {
        CostVariant::ALL
            .iter()
            .any(|v| self.get(*v).is_some_and(|g| g < threshold))
    }
}

/// Derived per-row metrics. `None` is the missing sentinel (zero divisor),
/// distinct from a computed 0.0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub list_bottle: Option<f64>,
    pub bottle_price: Option<f64>,
    pub gp2: Gp2,
}

/// One merged price-book line for the requested vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductRow {
    pub product_id: String,
    /// Six-digit normalized supplier code.
    pub supplier: String,
    pub vendor_name: Option<String>,
    pub product_name: Option<String>,
    pub size: Option<String>,
    pub price_group: Option<String>,
    pub price_group_description: Option<String>,
    pub brand: Option<String>,
    pub pricing_type: Option<String>,
    pub deal_id: Option<String>,
    pub deal_class: Option<String>,
    pub deal_description: Option<String>,
    pub purchase_quantity: Option<String>,
    pub channel: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub list_case: f64,
    pub discount: f64,
    pub case_price: f64,
    pub chargeback: f64,
    pub units_per_case: f64,
    pub costs: CostValues,
    /// Raw average cost before weighted-average allocation.
    pub raw_average_cost: Option<f64>,
    /// Component cost cells, aligned with `SchemaPlan::components()`.
    pub components: Vec<CellValue>,
    pub metrics: DerivedMetrics,
}

impl ProductRow {
    /// Typed value of a price-book field.
    pub fn value(&self, field: Field) -> CellValue {
        fn text(v: &Option<String>) -> CellValue {
            v.as_ref()
                .map(|s| CellValue::Text(s.clone()))
                .unwrap_or_default()
        }
        fn date(v: &Option<NaiveDate>) -> CellValue {
            v.map(CellValue::Date).unwrap_or_default()
        }
        match field {
            Field::ProductId => CellValue::Text(self.product_id.clone()),
            Field::VendorName => text(&self.vendor_name),
            Field::ProductName => text(&self.product_name),
            Field::Size => text(&self.size),
            Field::PriceGroup => text(&self.price_group),
            Field::PriceGroupDescription => text(&self.price_group_description),
            Field::Brand => text(&self.brand),
            Field::PricingType => text(&self.pricing_type),
            Field::DealId => text(&self.deal_id),
            Field::DealClass => text(&self.deal_class),
            Field::DealDescription => text(&self.deal_description),
            Field::PurchaseQuantity => text(&self.purchase_quantity),
            Field::Channel => text(&self.channel),
            Field::StartDate => date(&self.start_date),
            Field::EndDate => date(&self.end_date),
            Field::ListCase => CellValue::Number(self.list_case),
            Field::Discount => CellValue::Number(self.discount),
            Field::CasePrice => CellValue::Number(self.case_price),
            Field::Chargeback => CellValue::Number(self.chargeback),
            Field::UnitsPerCase => CellValue::Number(self.units_per_case),
        }
    }

    /// Comparable key component for grouping and deduplication.
    pub fn key(&self, field: Field) -> Option<String> {
        self.value(field).as_text()
    }
}
