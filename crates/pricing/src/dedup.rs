//! Strategy-selecting deduplication.
//!
//! Strategies are tried most specific first. The first one with at least two
//! present fields that finds a duplicate is applied (keep first occurrence,
//! stable order) and the search stops. Broader strategies are never used when
//! a narrower one already resolves the duplicates.

use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use crate::model::ProductRow;
use crate::schema::{Field, SchemaPlan};

/// The strategy that was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStrategy {
    /// Position in the configured strategy list.
    pub index: usize,
    /// Present fields actually used as the key.
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub rows: Vec<ProductRow>,
    pub strategy: Option<AppliedStrategy>,
    pub removed: usize,
}

type RowKey = Vec<Option<String>>;

fn row_key(row: &ProductRow, fields: &[Field]) -> RowKey {
    fields.iter().map(|f| row.key(*f)).collect()
}

/// True when two rows share the same values on `fields`.
pub fn has_duplicates(rows: &[ProductRow], fields: &[Field]) -> bool {
    let mut seen: HashSet<RowKey> = HashSet::with_capacity(rows.len());
    rows.iter().any(|r| !seen.insert(row_key(r, fields)))
}

/// Keep the first row of each key on `fields`, preserving order.
pub fn dedup_on(rows: Vec<ProductRow>, fields: &[Field]) -> Vec<ProductRow> {
    let mut seen: HashSet<RowKey> = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|r| seen.insert(row_key(r, fields)))
        .collect()
}

/// Pick the first qualifying strategy and apply it.
pub fn deduplicate(rows: Vec<ProductRow>, strategies: &[Vec<Field>], plan: &SchemaPlan) -> DedupOutcome {
    let before = rows.len();
    for (index, strategy) in strategies.iter().enumerate() {
        let fields: Vec<Field> = plan.present(strategy).collect();
        if fields.len() < 2 || !has_duplicates(&rows, &fields) {
            continue;
        }
        let rows = dedup_on(rows, &fields);
        let removed = before - rows.len();
        info!(
            strategy = index + 1,
            fields = ?fields,
            removed,
            rows = rows.len(),
            "duplicates removed"
        );
        return DedupOutcome {
            rows,
            strategy: Some(AppliedStrategy { index, fields }),
            removed,
        };
    }
    info!(rows = before, "no duplicates found");
    DedupOutcome {
        rows,
        strategy: None,
        removed: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DedupConfig, PipelineConfig};
    use crate::table::Table;

    fn full_plan() -> SchemaPlan {
        let headers = PipelineConfig::default().price_book.headers;
        let pb = Table::new(
            "pb",
            Field::ALL.iter().map(|f| headers.header(*f).to_string()).collect(),
            vec![],
        );
        let cost = Table::new("cost", vec!["Material".into(), "Supplier".into()], vec![]);
        SchemaPlan::negotiate(&pb, &cost, &PipelineConfig::default()).unwrap()
    }

    fn row(pid: &str, deal: &str, pg: &str) -> ProductRow {
        ProductRow {
            product_id: pid.into(),
            deal_id: Some(deal.into()),
            price_group: Some(pg.into()),
            deal_class: Some("Level Pricing".into()),
            channel: Some("Retail".into()),
            purchase_quantity: Some("1 CSE".into()),
            ..Default::default()
        }
    }

    #[test]
    fn no_duplicates_is_identity() {
        let rows = vec![row("1", "a", "10"), row("2", "a", "10")];
        let out = deduplicate(rows.clone(), &DedupConfig::default().strategies, &full_plan());
        assert!(out.strategy.is_none());
        assert_eq!(out.rows, rows);
    }

    #[test]
    fn most_specific_strategy_wins() {
        // exact duplicate on every field: strategy 1 applies
        let rows = vec![row("1", "a", "10"), row("1", "a", "10"), row("1", "b", "10")];
        let out = deduplicate(rows, &DedupConfig::default().strategies, &full_plan());
        assert_eq!(out.strategy.as_ref().map(|s| s.index), Some(0));
        assert_eq!(out.rows.len(), 2);
        assert_eq!(out.removed, 1);
    }

    #[test]
    fn falls_through_to_broader_strategy() {
        // differ only in deal id: strategies 1 and 2 find nothing, 3 does
        let rows = vec![row("1", "a", "10"), row("1", "b", "10")];
        let out = deduplicate(rows, &DedupConfig::default().strategies, &full_plan());
        let applied = out.strategy.unwrap();
        assert_eq!(applied.index, 2);
        assert_eq!(
            applied.fields,
            vec![Field::ProductId, Field::PriceGroup, Field::DealClass, Field::Channel]
        );
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.rows[0].deal_id.as_deref(), Some("a"));
    }

    #[test]
    fn strategies_with_one_present_field_are_skipped() {
        let pb = Table::new("pb", vec!["SAP Product ID".into()], vec![]);
        let cost = Table::new("cost", vec!["Material".into(), "Supplier".into()], vec![]);
        let plan = SchemaPlan::negotiate(&pb, &cost, &PipelineConfig::default()).unwrap();
        let rows = vec![row("1", "a", "10"), row("1", "a", "10")];
        let out = deduplicate(rows, &DedupConfig::default().strategies, &plan);
        assert!(out.strategy.is_none());
        assert_eq!(out.rows.len(), 2);
    }

    #[test]
    fn missing_values_compare_equal() {
        let mut a = row("1", "a", "10");
        a.deal_id = None;
        let b = a.clone();
        assert!(has_duplicates(&[a, b], &[Field::ProductId, Field::DealId]));
    }
}
