//! Cost-of-goods reference sheet and the price-group cost consistency check.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::model::ProductRow;
use crate::pivot::natural_cmp;
use crate::report::{ColumnKind, FlatSheet, SheetColumn};
use crate::schema::{CostRole, Field, PlannedCostColumn, SchemaPlan};
use crate::table::CellValue;

const LEADING_FIELDS: [(Field, &str); 7] = [
    (Field::ProductId, "SAP Product ID"),
    (Field::ProductName, "Product Name"),
    (Field::Size, "Size"),
    (Field::Brand, "Brand"),
    (Field::PriceGroup, "Price Group"),
    (Field::PriceGroupDescription, "Price Group Description"),
    (Field::ListCase, "List Price"),
];

/// A price group whose products disagree on negotiated cost.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceGroupIssue {
    pub price_group: String,
    pub distinct_costs: Vec<f64>,
}

/// The vendor's merged rows, one per product id (first wins), without combo
/// sizes.
pub fn cost_reference_rows<'a>(rows: &'a [ProductRow], combo_prefix: &str) -> Vec<&'a ProductRow> {
    let mut seen = HashSet::new();
    let out: Vec<&ProductRow> = rows
        .iter()
        .filter(|r| !r.size.as_deref().is_some_and(|s| s.starts_with(combo_prefix)))
        .filter(|r| seen.insert(r.product_id.as_str()))
        .collect();
    info!(rows = out.len(), "cost reference rows");
    out
}

/// Price groups with more than one distinct negotiated cost. Missing costs
/// are ignored.
pub fn inconsistent_price_groups(rows: &[&ProductRow]) -> Vec<PriceGroupIssue> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in rows {
        let (Some(pg), Some(cost)) = (row.price_group.as_deref(), row.costs.negotiated) else {
            continue;
        };
        let costs = groups.entry(pg).or_default();
        let cost = cost + 0.0; // -0.0 and 0.0 are the same cost
        if !costs.iter().any(|c| c.to_bits() == cost.to_bits()) {
            costs.push(cost);
        }
    }
    let mut issues: Vec<PriceGroupIssue> = groups
        .into_iter()
        .filter(|(_, costs)| costs.len() > 1)
        .map(|(pg, distinct_costs)| PriceGroupIssue {
            price_group: pg.to_string(),
            distinct_costs,
        })
        .collect();
    issues.sort_by(|a, b| natural_cmp(&a.price_group, &b.price_group));
    if !issues.is_empty() {
        let groups: Vec<&str> = issues.iter().map(|i| i.price_group.as_str()).collect();
        warn!(?groups, "price groups with inconsistent negotiated cost");
    }
    issues
}

fn displayed_costs(plan: &SchemaPlan) -> Vec<&PlannedCostColumn> {
    plan.cost_columns()
        .iter()
        .filter(|c| !matches!(c.role, CostRole::Supplier | CostRole::Hidden))
        .collect()
}

fn cost_value(row: &ProductRow, col: &PlannedCostColumn, component_idx: &mut usize) -> CellValue {
    let num = |v: Option<f64>| v.map(CellValue::Number).unwrap_or_default();
    match col.role {
        CostRole::NegotiatedCost => num(row.costs.negotiated),
        CostRole::AverageCost => num(row.raw_average_cost),
        CostRole::BottlesOnHand => num(row.costs.bottles_on_hand),
        CostRole::CasesOnHand => num(row.costs.cases_on_hand),
        CostRole::Component => {
            let v = row.components.get(*component_idx).cloned().unwrap_or_default();
            *component_idx += 1;
            v
        }
        CostRole::Supplier | CostRole::Hidden => CellValue::Empty,
    }
}

fn cost_kind(role: CostRole) -> ColumnKind {
    match role {
        CostRole::BottlesOnHand | CostRole::CasesOnHand => ColumnKind::Number,
        _ => ColumnKind::Currency,
    }
}

/// Build the COGS sheet. `highlight_negotiated` marks the negotiated cost
/// column, used by the price-group error report.
fn build_sheet(rows: &[&ProductRow], plan: &SchemaPlan, highlight_negotiated: bool) -> FlatSheet {
    let leading: Vec<(Field, &str)> = LEADING_FIELDS
        .iter()
        .copied()
        .filter(|(f, _)| plan.has(*f))
        .collect();
    let costs = displayed_costs(plan);

    let mut columns: Vec<SheetColumn> = leading
        .iter()
        .map(|(f, header)| {
            let kind = if f.is_numeric() { ColumnKind::Currency } else { ColumnKind::Text };
            SheetColumn::new(*header, kind)
        })
        .collect();
    for col in &costs {
        let column = SheetColumn::new(col.label.as_str(), cost_kind(col.role));
        if highlight_negotiated && col.role == CostRole::NegotiatedCost {
            columns.push(column.highlighted());
        } else {
            columns.push(column);
        }
    }

    // components are stored densely, in plan order
    let data = rows
        .iter()
        .map(|row| {
            let mut cells: Vec<CellValue> = leading.iter().map(|(f, _)| row.value(*f)).collect();
            let mut component_idx = 0;
            for col in plan.cost_columns() {
                let v = cost_value(row, col, &mut component_idx);
                if !matches!(col.role, CostRole::Supplier | CostRole::Hidden) {
                    cells.push(v);
                }
            }
            cells
        })
        .collect();

    FlatSheet {
        columns,
        rows: data,
        empty_message: None,
    }
}

pub fn cost_reference_sheet(rows: &[&ProductRow], plan: &SchemaPlan) -> FlatSheet {
    build_sheet(rows, plan, false)
}

/// Rows of inconsistent price groups, sorted by price group then product id.
pub fn price_group_errors_sheet(
    rows: &[&ProductRow],
    issues: &[PriceGroupIssue],
    plan: &SchemaPlan,
) -> FlatSheet {
    let flagged: HashSet<&str> = issues.iter().map(|i| i.price_group.as_str()).collect();
    let mut selected: Vec<&ProductRow> = rows
        .iter()
        .copied()
        .filter(|r| r.price_group.as_deref().is_some_and(|pg| flagged.contains(pg)))
        .collect();
    selected.sort_by(|a, b| {
        natural_cmp(
            a.price_group.as_deref().unwrap_or_default(),
            b.price_group.as_deref().unwrap_or_default(),
        )
        .then_with(|| natural_cmp(&a.product_id, &b.product_id))
    });
    build_sheet(&selected, plan, true)
}
