//! Chain-pricing view: negotiated per-chain net prices for the vendor,
//! joined to the cost catalog and scored with GP2 on net price.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::config::ChainConfig;
use crate::error::PricingError;
use crate::merge::normalize_vendor_code;
use crate::metrics::{gp2, ratio, NumericCoercion};
use crate::model::CostVariant;
use crate::pivot::natural_cmp;
use crate::report::{ColumnKind, FlatSheet, SheetColumn};
use crate::request::ReportRequest;
use crate::schema::{CostRole, SchemaPlan};
use crate::table::{title_case, CellValue, Table};

/// Output of the chain view: the sheet plus how many records it holds.
#[derive(Debug, Clone)]
pub struct ChainView {
    pub sheet: FlatSheet,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainColumn {
    VendorId,
    PriceGroup,
    PriceGroupDescription,
    ChainName,
    StartDate,
    EndDate,
    ListPrice,
    NetPrice,
    BottlePrice,
    Chargeback,
    Cost(CostVariant),
    Gp2(CostVariant),
}

const CHAIN_COLUMNS: [ChainColumn; 14] = [
    ChainColumn::VendorId,
    ChainColumn::PriceGroup,
    ChainColumn::PriceGroupDescription,
    ChainColumn::ChainName,
    ChainColumn::StartDate,
    ChainColumn::EndDate,
    ChainColumn::ListPrice,
    ChainColumn::NetPrice,
    ChainColumn::BottlePrice,
    ChainColumn::Chargeback,
    ChainColumn::Cost(CostVariant::Negotiated),
    ChainColumn::Cost(CostVariant::Average),
    ChainColumn::Gp2(CostVariant::Negotiated),
    ChainColumn::Gp2(CostVariant::Average),
];

impl ChainColumn {
    fn header(&self) -> &'static str {
        match self {
            Self::VendorId => "Vendor Id",
            Self::PriceGroup => "Price Group",
            Self::PriceGroupDescription => "Price Group Description",
            Self::ChainName => "Chain Name",
            Self::StartDate => "Start Date",
            Self::EndDate => "End Date",
            Self::ListPrice => "List Price",
            Self::NetPrice => "Net Price",
            Self::BottlePrice => "Bottle Price",
            Self::Chargeback => "Chargeback",
            Self::Cost(v) => v.cost_label(),
            Self::Gp2(v) => v.gp2_label(),
        }
    }

    fn kind(&self) -> ColumnKind {
        match self {
            Self::VendorId | Self::PriceGroup | Self::PriceGroupDescription | Self::ChainName => {
                ColumnKind::Text
            }
            Self::StartDate | Self::EndDate => ColumnKind::Date,
            Self::Gp2(_) => ColumnKind::Percent,
            _ => ColumnKind::Currency,
        }
    }
}

/// One chain record after the join.
#[derive(Debug, Clone)]
struct ChainRow {
    vendor_id: String,
    price_group: Option<String>,
    price_group_description: Option<String>,
    chain_name: Option<String>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    list_price: Option<f64>,
    net_price: f64,
    bottle_price: Option<f64>,
    chargeback: f64,
    negotiated: Option<f64>,
    average: Option<f64>,
    gp2_negotiated: Option<f64>,
    gp2_average: Option<f64>,
}

impl ChainRow {
    fn value(&self, column: ChainColumn) -> CellValue {
        let text = |v: &Option<String>| v.clone().map(CellValue::Text).unwrap_or_default();
        let num = |v: Option<f64>| v.map(CellValue::Number).unwrap_or_default();
        match column {
            ChainColumn::VendorId => CellValue::Text(self.vendor_id.clone()),
            ChainColumn::PriceGroup => text(&self.price_group),
            ChainColumn::PriceGroupDescription => text(&self.price_group_description),
            ChainColumn::ChainName => text(&self.chain_name),
            ChainColumn::StartDate => self.start_date.map(CellValue::Date).unwrap_or_default(),
            ChainColumn::EndDate => self.end_date.map(CellValue::Date).unwrap_or_default(),
            ChainColumn::ListPrice => num(self.list_price),
            ChainColumn::NetPrice => CellValue::Number(self.net_price),
            ChainColumn::BottlePrice => num(self.bottle_price),
            ChainColumn::Chargeback => CellValue::Number(self.chargeback),
            ChainColumn::Cost(CostVariant::Negotiated) => num(self.negotiated),
            ChainColumn::Cost(CostVariant::Average) => num(self.average),
            ChainColumn::Gp2(CostVariant::Negotiated) => num(self.gp2_negotiated),
            ChainColumn::Gp2(CostVariant::Average) => num(self.gp2_average),
        }
    }
}

/// Resolved chain-pricing column positions.
struct ChainLayout {
    vendor_id: usize,
    product_id: Option<usize>,
    chain_name: Option<usize>,
    price_group: Option<usize>,
    price_group_description: Option<usize>,
    list_price: Option<usize>,
    net_price: usize,
    chargeback: Option<usize>,
    units_per_case: Option<usize>,
    start_date: Option<usize>,
    end_date: Option<usize>,
}

fn empty_view(request: &ReportRequest, columns: Vec<SheetColumn>) -> ChainView {
    ChainView {
        sheet: FlatSheet {
            columns,
            rows: Vec::new(),
            empty_message: Some(format!(
                "No chain pricing records found for vendor {} on {}",
                request.vendor_id, request.as_of
            )),
        },
        rows: 0,
    }
}

fn active_on(start: Option<NaiveDate>, end: Option<NaiveDate>, as_of: NaiveDate) -> bool {
    start.map_or(true, |s| s <= as_of) && end.map_or(true, |e| e >= as_of)
}

/// Build the chain view.
///
/// Returns an input error when the vendor columns are missing, or when the
/// vendor has records but no net price column. Other problems are logged and
/// produce an empty view.
pub fn chain_view(
    chain: Option<&Table>,
    cost_catalog: &Table,
    plan: &SchemaPlan,
    config: &ChainConfig,
    request: &ReportRequest,
) -> Result<ChainView, PricingError> {
    let Some(chain) = chain else {
        info!("no chain pricing catalog supplied");
        return Ok(empty_view(request, Vec::new()));
    };

    let mut table = chain.clone();
    table.map_headers(|h| title_case(h.trim()));
    let vendor_col = table.require_column(&config.vendor_id)?;
    table.require_column(&config.vendor_name)?;

    let vendor_rows: Vec<usize> = (0..table.len())
        .filter(|r| normalize_vendor_code(table.cell(*r, vendor_col)) == request.vendor_id.as_str())
        .collect();
    if vendor_rows.is_empty() {
        info!(vendor = %request.vendor_id, "no chain pricing records for vendor");
        return Ok(empty_view(request, Vec::new()));
    }

    let layout = ChainLayout {
        vendor_id: vendor_col,
        product_id: table.column_index(&config.product_id),
        chain_name: table.column_index(&config.chain_name),
        price_group: table.column_index(&config.price_group),
        price_group_description: table.column_index(&config.price_group_description),
        list_price: table.column_index(&config.list_price),
        net_price: table.require_column(&config.net_price)?,
        chargeback: table.column_index(&config.chargeback),
        units_per_case: table.column_index(&config.units_per_case),
        start_date: table.column_index(&config.start_date),
        end_date: table.column_index(&config.end_date),
    };

    let columns: Vec<ChainColumn> = CHAIN_COLUMNS
        .iter()
        .copied()
        .filter(|c| match c {
            ChainColumn::PriceGroup => layout.price_group.is_some(),
            ChainColumn::PriceGroupDescription => layout.price_group_description.is_some(),
            ChainColumn::ChainName => layout.chain_name.is_some(),
            ChainColumn::StartDate => layout.start_date.is_some(),
            ChainColumn::EndDate => layout.end_date.is_some(),
            ChainColumn::ListPrice => layout.list_price.is_some(),
            ChainColumn::Cost(CostVariant::Negotiated) => plan.has_cost(CostRole::NegotiatedCost),
            ChainColumn::Cost(CostVariant::Average) => plan.has_cost(CostRole::AverageCost),
            _ => true,
        })
        .collect();
    let sheet_columns = || {
        columns
            .iter()
            .map(|c| SheetColumn::new(c.header(), c.kind()))
            .collect::<Vec<_>>()
    };

    let rows = match build_rows(&table, &vendor_rows, &layout, cost_catalog, plan, request.as_of) {
        Ok(rows) => rows,
        Err(reason) => {
            warn!(%reason, "chain pricing skipped");
            return Ok(empty_view(request, sheet_columns()));
        }
    };
    info!(rows = rows.len(), "chain pricing records on as-of date");

    if rows.is_empty() {
        return Ok(empty_view(request, sheet_columns()));
    }
    let count = rows.len();
    Ok(ChainView {
        sheet: FlatSheet {
            columns: sheet_columns(),
            rows: rows
                .iter()
                .map(|r| columns.iter().map(|c| r.value(*c)).collect())
                .collect(),
            empty_message: None,
        },
        rows: count,
    })
}

fn build_rows(
    table: &Table,
    vendor_rows: &[usize],
    layout: &ChainLayout,
    cost_catalog: &Table,
    plan: &SchemaPlan,
    as_of: NaiveDate,
) -> Result<Vec<ChainRow>, String> {
    let pid_col = layout
        .product_id
        .ok_or_else(|| "chain pricing has no product id column to join costs".to_string())?;

    let mut cost_index: HashMap<String, usize> = HashMap::new();
    for (i, row) in cost_catalog.rows.iter().enumerate() {
        if let Some(id) = row.get(plan.cost_key()).and_then(CellValue::as_text) {
            cost_index.entry(id).or_insert(i);
        }
    }
    let cost_col = |role: CostRole| plan.cost_column(role).map(|c| c.index);
    let negotiated_col = cost_col(CostRole::NegotiatedCost);
    let average_col = cost_col(CostRole::AverageCost);

    // a half-open window (one date column only) is not filtered
    let dated = layout.start_date.is_some() && layout.end_date.is_some();

    let mut coercion = NumericCoercion::new();
    let mut rows = Vec::new();
    for &r in vendor_rows {
        let cell = |col: Option<usize>| col.map(|c| table.cell(r, c)).unwrap_or(&EMPTY);
        let start_date = cell(layout.start_date).as_date();
        let end_date = cell(layout.end_date).as_date();
        if dated && !active_on(start_date, end_date, as_of) {
            continue;
        }

        let cost_row = cell(Some(pid_col)).as_text().and_then(|id| cost_index.get(&id).copied());
        let mut cost = |col: Option<usize>, label: &str| match (cost_row, col) {
            (Some(cr), Some(c)) => coercion.optional(label, cost_catalog.cell(cr, c)),
            _ => None,
        };
        let negotiated = cost(negotiated_col, "Negotiated Cost");
        let average = cost(average_col, "Avg Cost");

        let net_price = coercion.number("Net Price", cell(Some(layout.net_price)));
        let chargeback = coercion.number("Chargeback", cell(layout.chargeback));
        let units = coercion.number("Units Per Case", cell(layout.units_per_case));
        let list_price = layout
            .list_price
            .map(|c| coercion.number("List Price", table.cell(r, c)));

        rows.push(ChainRow {
            vendor_id: normalize_vendor_code(table.cell(r, layout.vendor_id)),
            price_group: cell(layout.price_group).as_text(),
            price_group_description: cell(layout.price_group_description).as_text(),
            chain_name: cell(layout.chain_name).as_text(),
            start_date,
            end_date,
            list_price,
            net_price,
            bottle_price: ratio(net_price, units),
            chargeback,
            negotiated,
            average,
            gp2_negotiated: gp2(net_price, negotiated.unwrap_or(0.0), chargeback),
            gp2_average: gp2(net_price, average.unwrap_or(0.0), chargeback),
        });
    }
    coercion.report();

    rows.sort_by(|a, b| {
        a.vendor_id
            .cmp(&b.vendor_id)
            .then_with(|| cmp_opt(&a.chain_name, &b.chain_name))
            .then_with(|| cmp_opt(&a.price_group, &b.price_group))
    });
    Ok(rows)
}

fn cmp_opt(a: &Option<String>, b: &Option<String>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => natural_cmp(x, y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

static EMPTY: CellValue = CellValue::Empty;
