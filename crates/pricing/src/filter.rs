//! Business filters applied to a vendor's rows before allocation and
//! deduplication.

use tracing::{info, warn};

use crate::config::FilterConfig;
use crate::model::ProductRow;
use crate::schema::{Field, SchemaPlan};

fn retain_logged(rows: &mut Vec<ProductRow>, what: &str, keep: impl FnMut(&ProductRow) -> bool) {
    rows.retain(keep);
    info!(rows = rows.len(), "records after {}", what);
}

/// Apply the pre-allocation filters in order and normalize channel codes.
///
/// Filters on a field that is absent from the price book are skipped.
pub fn apply(mut rows: Vec<ProductRow>, plan: &SchemaPlan, config: &FilterConfig) -> Vec<ProductRow> {
    if plan.has(Field::PriceGroup) {
        retain_logged(&mut rows, "removing missing price groups", |r| {
            r.price_group.is_some()
        });
    } else {
        warn!("price group column missing, price-group filter skipped");
    }

    if plan.has(Field::PricingType) {
        retain_logged(&mut rows, "pricing-type filter", |r| {
            r.pricing_type
                .as_ref()
                .is_some_and(|t| !config.excluded_pricing_types.contains(t))
        });
    }

    if plan.has(Field::Channel) {
        retain_logged(&mut rows, "trade-channel filter", |r| {
            r.channel
                .as_ref()
                .map_or(true, |c| !config.excluded_channels.contains(c))
        });
    }

    if plan.has(Field::PurchaseQuantity) {
        retain_logged(&mut rows, "purchase-quantity filter", |r| {
            r.purchase_quantity
                .as_ref()
                .is_some_and(|q| !config.excluded_purchase_quantities.contains(q))
        });
    }

    if plan.has(Field::Channel) {
        for row in &mut rows {
            row.channel = Some(normalize_channel(row.channel.as_deref(), config));
        }
    }

    rows
}

/// Map a raw trade channel code to its display name.
pub fn normalize_channel(code: Option<&str>, config: &FilterConfig) -> String {
    match code.map(str::trim).filter(|c| !c.is_empty() && *c != "nan") {
        Some(c) => config
            .channel_aliases
            .get(c)
            .cloned()
            .unwrap_or_else(|| c.to_string()),
        None => config.blank_channel.clone(),
    }
}

/// Drop rows whose price-group description starts with the combo prefix.
pub fn drop_combo_groups(mut rows: Vec<ProductRow>, config: &FilterConfig) -> Vec<ProductRow> {
    let prefix = config.combo_prefix.as_str();
    retain_logged(&mut rows, "removing combo price groups", |r| {
        !r.price_group_description
            .as_deref()
            .is_some_and(|d| d.starts_with(prefix))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::table::Table;

    fn plan(headers: &[&str]) -> SchemaPlan {
        let pb = Table::new("pb", headers.iter().map(|h| h.to_string()).collect(), vec![]);
        let cost = Table::new("cost", vec!["Material".into(), "Supplier".into()], vec![]);
        SchemaPlan::negotiate(&pb, &cost, &PipelineConfig::default()).unwrap()
    }

    fn row(pg: Option<&str>, pt: Option<&str>, ch: Option<&str>, pq: Option<&str>) -> ProductRow {
        ProductRow {
            price_group: pg.map(String::from),
            pricing_type: pt.map(String::from),
            channel: ch.map(String::from),
            purchase_quantity: pq.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn filters_in_order() {
        let plan = plan(&[
            "SAP Product ID",
            "Price Group",
            "Pricing Type",
            "Trade Channel ID",
            "Purchase Quantity",
        ]);
        let config = FilterConfig::default();
        let rows = vec![
            row(None, Some("Level Pricing"), Some("C1"), Some("1 CSE")),
            row(Some("10"), None, Some("C1"), Some("1 CSE")),
            row(Some("10"), Some("Chain Pricing"), Some("C1"), Some("1 CSE")),
            row(Some("10"), Some("Level Pricing"), Some("C5"), Some("1 CSE")),
            row(Some("10"), Some("Level Pricing"), Some("C1"), Some("0 CSE")),
            row(Some("10"), Some("Level Pricing"), Some("C1"), None),
            row(Some("10"), Some("Level Pricing"), Some("C1"), Some("1 CSE")),
            row(Some("11"), Some("Deal Pricing"), Some("C16"), Some("5 CSE")),
            row(Some("12"), Some("Deal Pricing"), None, Some("10 EA")),
            row(Some("13"), Some("Deal Pricing"), Some("C20"), Some("1 EA")),
        ];
        let out = apply(rows, &plan, &config);
        let channels: Vec<&str> = out.iter().filter_map(|r| r.channel.as_deref()).collect();
        assert_eq!(channels, vec!["Retail", "OP", "OP", "C20"]);
    }

    #[test]
    fn absent_fields_skip_filters() {
        let plan = plan(&["SAP Product ID", "Price Group"]);
        let rows = vec![row(Some("1"), None, Some("C5"), None)];
        let out = apply(rows, &plan, &FilterConfig::default());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].channel.as_deref(), Some("C5"));
    }

    #[test]
    fn channel_normalization() {
        let config = FilterConfig::default();
        assert_eq!(normalize_channel(Some("C1"), &config), "Retail");
        assert_eq!(normalize_channel(Some(" C16 "), &config), "OP");
        assert_eq!(normalize_channel(Some(""), &config), "OP");
        assert_eq!(normalize_channel(Some("nan"), &config), "OP");
        assert_eq!(normalize_channel(None, &config), "OP");
        assert_eq!(normalize_channel(Some("C20"), &config), "C20");
    }

    #[test]
    fn combo_groups_dropped() {
        let mut keep = row(Some("1"), None, None, None);
        keep.price_group_description = Some("Vodka 750".into());
        let mut combo = keep.clone();
        combo.price_group_description = Some("COMBO Gift Pack".into());
        let out = drop_combo_groups(vec![keep, combo, row(Some("2"), None, None, None)], &FilterConfig::default());
        assert_eq!(out.len(), 2);
    }
}
