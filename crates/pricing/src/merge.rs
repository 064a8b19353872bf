//! Left join of the price book onto the cost catalog, supplier-code
//! normalization and the vendor filter.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::PricingError;
use crate::metrics::NumericCoercion;
use crate::model::{CostValues, ProductRow};
use crate::request::VendorId;
use crate::schema::{CostRole, Field, SchemaPlan};
use crate::table::{CellValue, Table};

/// Normalize a supplier / vendor code to six zero-padded digits.
///
/// Numeric values (including text such as `"300001.0"`) are truncated to an
/// integer; anything else becomes `0`, i.e. `"000000"`.
pub fn normalize_vendor_code(value: &CellValue) -> String {
    let code = match value {
        CellValue::Number(n) if n.is_finite() && *n >= 0.0 => Some(n.trunc() as u64),
        CellValue::Text(s) => {
            let s = s.trim();
            let digits_only = s.chars().all(|c| c.is_ascii_digit() || c == '.')
                && s.chars().any(|c| c.is_ascii_digit());
            if digits_only {
                s.parse::<f64>().ok().map(|n| n.trunc() as u64)
            } else {
                None
            }
        }
        _ => None,
    };
    format!("{:06}", code.unwrap_or(0))
}

/// Result of merging and filtering to one vendor.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub rows: Vec<ProductRow>,
    /// First non-empty vendor name among the vendor's rows, else `Vendor_<id>`.
    pub vendor_name: String,
    /// Row count of the join before the vendor filter.
    pub merged_rows: usize,
}

/// Map product id to the first cost-catalog row carrying it.
fn index_cost_rows(cost_catalog: &Table, key: usize) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(cost_catalog.len());
    let mut duplicates = 0usize;
    for (i, row) in cost_catalog.rows.iter().enumerate() {
        let Some(id) = row.get(key).and_then(CellValue::as_text) else {
            continue;
        };
        if index.contains_key(&id) {
            duplicates += 1;
        } else {
            index.insert(id, i);
        }
    }
    if duplicates > 0 {
        debug!(duplicates, "cost catalog repeats product ids; first row kept");
    }
    index
}

/// Join, normalize and keep the rows of `vendor`.
///
/// Fails with `VendorNotFound` when no row matches.
pub fn merge_catalogs(
    price_book: &Table,
    cost_catalog: &Table,
    plan: &SchemaPlan,
    vendor: &VendorId,
) -> Result<MergeOutput, PricingError> {
    let cost_index = index_cost_rows(cost_catalog, plan.cost_key());
    let pid_col = plan.index(Field::ProductId).unwrap_or_default();
    let supplier_col = plan.cost_column(CostRole::Supplier).map(|c| c.index);

    let mut coercion = NumericCoercion::new();
    let mut rows = Vec::new();

    for r in 0..price_book.len() {
        let product_id = price_book.cell(r, pid_col).as_text().unwrap_or_default();
        let cost_row = cost_index.get(&product_id).copied();
        let cost_cell = |col: usize| match cost_row {
            Some(cr) => cost_catalog.cell(cr, col),
            None => &EMPTY_CELL,
        };

        let supplier = supplier_col
            .map(|c| normalize_vendor_code(cost_cell(c)))
            .unwrap_or_else(|| normalize_vendor_code(&CellValue::Empty));
        if supplier != vendor.as_str() {
            continue;
        }

        let field = |f: Field| match plan.index(f) {
            Some(c) => price_book.cell(r, c),
            None => &EMPTY_CELL,
        };
        let text = |f: Field| field(f).as_text();
        let date = |f: Field| field(f).as_date();

        let mut costs = CostValues::default();
        let mut components = Vec::new();
        for col in plan.cost_columns() {
            let cell = cost_cell(col.index);
            match col.role {
                CostRole::NegotiatedCost => costs.negotiated = coercion.optional(&col.label, cell),
                CostRole::AverageCost => costs.average = coercion.optional(&col.label, cell),
                CostRole::BottlesOnHand => {
                    costs.bottles_on_hand = coercion.optional(&col.label, cell)
                }
                CostRole::CasesOnHand => costs.cases_on_hand = coercion.optional(&col.label, cell),
                CostRole::Component => components.push(cell.clone()),
                CostRole::Supplier | CostRole::Hidden => {}
            }
        }

        let mut number = |f: Field| coercion.number(f.label(), field(f));
        let list_case = number(Field::ListCase);
        let discount = number(Field::Discount);
        let case_price = number(Field::CasePrice);
        let chargeback = number(Field::Chargeback);
        let units_per_case = number(Field::UnitsPerCase);

        rows.push(ProductRow {
            product_id,
            supplier,
            vendor_name: text(Field::VendorName),
            product_name: text(Field::ProductName),
            size: text(Field::Size),
            price_group: text(Field::PriceGroup),
            price_group_description: text(Field::PriceGroupDescription),
            brand: text(Field::Brand),
            pricing_type: text(Field::PricingType),
            deal_id: text(Field::DealId),
            deal_class: text(Field::DealClass),
            deal_description: text(Field::DealDescription),
            purchase_quantity: text(Field::PurchaseQuantity),
            channel: text(Field::Channel),
            start_date: date(Field::StartDate),
            end_date: date(Field::EndDate),
            list_case,
            discount,
            case_price,
            chargeback,
            units_per_case,
            raw_average_cost: costs.average,
            costs,
            components,
            metrics: Default::default(),
        });
    }

    coercion.report();
    info!(rows = price_book.len(), "records after merging price book and cost catalog");
    info!(vendor = %vendor, rows = rows.len(), "records for vendor");

    if rows.is_empty() {
        return Err(PricingError::VendorNotFound {
            vendor_id: vendor.to_string(),
        });
    }

    let vendor_name = rows
        .iter()
        .find_map(|r| r.vendor_name.clone())
        .unwrap_or_else(|| format!("Vendor_{}", vendor));

    Ok(MergeOutput {
        rows,
        vendor_name,
        merged_rows: price_book.len(),
    })
}

static EMPTY_CELL: CellValue = CellValue::Empty;
