use tracing::{info, info_span, warn};

use crate::allocate::weighted_average_by_group;
use crate::chain::chain_view;
use crate::cogs::{
    cost_reference_rows, cost_reference_sheet, inconsistent_price_groups, price_group_errors_sheet,
};
use crate::config::PipelineConfig;
use crate::dedup::deduplicate;
use crate::error::PricingError;
use crate::filter;
use crate::merge::merge_catalogs;
use crate::metrics;
use crate::pivot::{build_pivot, ColumnOrder};
use crate::report::{
    BrandSummary, PricingReport, ReportSheet, RunSummary, SheetBody, SheetNames, SheetTone,
};
use crate::request::ReportRequest;
use crate::schema::{CostRole, Field, SchemaPlan};
use crate::table::Table;
use crate::views::{active_deals, below_threshold, brands, display_columns, flat_sheet};

pub const COGS_SHEET: &str = "COGS";
pub const PRICE_GROUP_ERRORS_SHEET: &str = "Price Group Errors";
pub const BELOW_THRESHOLD_SHEET: &str = "GP2 Below Threshold";
pub const DEALS_SHEET: &str = "Pricing by Deal ID";
pub const CHAIN_SHEET: &str = "Chain Pricing";
pub const NO_BRANDS_SHEET: &str = "No_Brands";

/// Catalog tables for one run, already loaded.
#[derive(Debug, Clone)]
pub struct Catalogs {
    pub price_book: Table,
    pub cost_catalog: Table,
    pub chain_pricing: Option<Table>,
}

/// Run the pricing pipeline for one vendor.
///
/// Pipeline: negotiate schema → merge + vendor filter → cost reference →
/// business filters → weighted-average cost → combo filter → dedup →
/// metrics → views and brand pivots.
pub fn run(
    config: &PipelineConfig,
    request: &ReportRequest,
    catalogs: &Catalogs,
) -> Result<PricingReport, PricingError> {
    let _span = info_span!("pricing", vendor = %request.vendor_id).entered();
    let mut summary = RunSummary::default();
    let mut names = SheetNames::new();
    let mut sheets = Vec::new();

    // 1. Schema
    let plan = SchemaPlan::negotiate(&catalogs.price_book, &catalogs.cost_catalog, config)?;

    // 2. Merge
    let merged = merge_catalogs(
        &catalogs.price_book,
        &catalogs.cost_catalog,
        &plan,
        &request.vendor_id,
    )?;
    summary.merged_rows = merged.merged_rows;
    summary.vendor_rows = merged.rows.len();

    // 3. Cost reference + consistency check
    let cogs_rows = cost_reference_rows(&merged.rows, &config.filters.combo_prefix);
    summary.cost_reference_rows = cogs_rows.len();
    sheets.push(ReportSheet::flat(
        names.allocate(COGS_SHEET),
        cost_reference_sheet(&cogs_rows, &plan),
    ));
    let issues = inconsistent_price_groups(&cogs_rows);
    if !issues.is_empty() {
        summary.inconsistent_price_groups = issues.iter().map(|i| i.price_group.clone()).collect();
        sheets.push(
            ReportSheet::flat(
                names.allocate(PRICE_GROUP_ERRORS_SHEET),
                price_group_errors_sheet(&cogs_rows, &issues, &plan),
            )
            .attention(),
        );
    }

    // 4. Filters + allocation
    let mut rows = filter::apply(merged.rows.clone(), &plan, &config.filters);
    if plan.has_cost(CostRole::AverageCost) && plan.has_cost(CostRole::CasesOnHand) {
        summary.allocations = weighted_average_by_group(&mut rows);
    } else {
        info!("average cost or cases on hand missing, weighted average skipped");
    }
    let rows = filter::drop_combo_groups(rows, &config.filters);
    summary.filtered_rows = rows.len();

    // 5. Dedup
    let outcome = deduplicate(rows, &config.dedup.strategies, &plan);
    summary.dedup_strategy = outcome.strategy;
    let mut rows = outcome.rows;
    summary.deduplicated_rows = rows.len();

    // 6. Metrics
    metrics::compute(&mut rows);

    // 7. Views
    let columns = display_columns(&plan);

    let below = below_threshold(&rows, request.threshold);
    summary.below_threshold_rows = below.len();
    info!(rows = below.len(), threshold = request.threshold, "records below GP2 threshold");
    sheets.push(
        ReportSheet::flat(
            names.allocate(BELOW_THRESHOLD_SHEET),
            flat_sheet(&below, &columns).with_empty_message(format!(
                "No records found with GP2 margins below {:.1}%",
                request.threshold * 100.0
            )),
        )
        .attention(),
    );

    let deals = active_deals(&rows, request.as_of);
    summary.deal_rows = deals.len();
    sheets.push(ReportSheet::flat(
        names.allocate(DEALS_SHEET),
        flat_sheet(&deals, &columns).with_empty_message(format!(
            "No pricing records found for vendor {} on {}",
            request.vendor_id, request.as_of
        )),
    ));

    let chain = chain_view(
        catalogs.chain_pricing.as_ref(),
        &catalogs.cost_catalog,
        &plan,
        &config.chain,
        request,
    )?;
    summary.chain_rows = chain.rows;
    sheets.push(ReportSheet::flat(names.allocate(CHAIN_SHEET), chain.sheet));

    // 8. Brands
    let order = ColumnOrder::new(&config.pivot);
    let brand_groups = brands(&rows);
    if !plan.has(Field::Brand) || brand_groups.is_empty() {
        let text = if plan.has(Field::Brand) {
            "No valid Brand data found"
        } else {
            "No Brand column available"
        };
        info!("{}", text);
        sheets.push(ReportSheet {
            name: names.allocate(NO_BRANDS_SHEET),
            tone: SheetTone::Normal,
            body: SheetBody::Message {
                text: text.to_string(),
            },
        });
    }
    for (brand, members) in brand_groups {
        let name = names.allocate(&brand);
        let (body, layout, fallback_reason) = match build_pivot(&members, &plan, &order) {
            Ok(pivot) => (SheetBody::Pivot(pivot), "pivot", None),
            Err(e) => {
                warn!(brand = %brand, error = %e, "pivot failed, writing flat sheet");
                let sheet = flat_sheet(&members, &columns);
                (SheetBody::Flat(sheet), "flat", Some(e.to_string()))
            }
        };
        summary.brands.push(BrandSummary {
            brand,
            sheet: name.clone(),
            rows: members.len(),
            layout,
            fallback_reason,
        });
        sheets.push(ReportSheet {
            name,
            tone: SheetTone::Normal,
            body,
        });
    }

    info!(
        sheets = sheets.len(),
        brands = summary.brands.len(),
        "report assembled"
    );

    Ok(PricingReport {
        vendor_id: request.vendor_id.clone(),
        vendor_name: merged.vendor_name,
        threshold: request.threshold,
        as_of: request.as_of,
        sheets,
        summary,
    })
}
