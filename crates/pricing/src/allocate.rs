//! Case-weighted average cost per price group.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::model::ProductRow;

/// Weighted-average cost assigned to one price group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAllocation {
    pub price_group: String,
    pub weighted_cost: f64,
    pub rows: usize,
    /// True when cases on hand summed to zero and the first row's cost was used.
    pub fallback: bool,
}

/// `sum(cost * cases) / sum(cases)` over `(cost, cases)` pairs. A zero
/// denominator falls back to the first pair's cost, or 0.0 when empty.
pub fn weighted_cost(entries: &[(f64, f64)]) -> (f64, bool) {
    let (num, den) = entries
        .iter()
        .fold((0.0, 0.0), |(n, d), (cost, cases)| (n + cost * cases, d + cases));
    if den == 0.0 {
        (entries.first().map(|e| e.0).unwrap_or(0.0), true)
    } else {
        (num / den, false)
    }
}

/// Replace every row's average cost with its price group's weighted average,
/// weighted by cases on hand. Missing values count as 0.0. Rows without a
/// price group keep their own cost.
pub fn weighted_average_by_group(rows: &mut [ProductRow]) -> Vec<GroupAllocation> {
    let mut groups: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows.iter() {
        let Some(pg) = &row.price_group else { continue };
        groups.entry(pg.clone()).or_default().push((
            row.costs.average.unwrap_or(0.0),
            row.costs.cases_on_hand.unwrap_or(0.0),
        ));
    }

    let allocations: Vec<GroupAllocation> = groups
        .into_iter()
        .map(|(price_group, entries)| {
            let (weighted_cost, fallback) = weighted_cost(&entries);
            GroupAllocation {
                price_group,
                weighted_cost,
                rows: entries.len(),
                fallback,
            }
        })
        .collect();

    let by_group: BTreeMap<&str, f64> = allocations
        .iter()
        .map(|a| (a.price_group.as_str(), a.weighted_cost))
        .collect();
    for row in rows.iter_mut() {
        if let Some(cost) = row.price_group.as_deref().and_then(|pg| by_group.get(pg)) {
            row.costs.average = Some(*cost);
        }
    }

    let fallbacks = allocations.iter().filter(|a| a.fallback).count();
    if fallbacks > 0 {
        debug!(groups = fallbacks, "no cases on hand, raw average cost kept");
    }
    info!(groups = allocations.len(), "weighted average cost applied");
    allocations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CostValues;

    fn row(pg: &str, avg: Option<f64>, cases: Option<f64>) -> ProductRow {
        ProductRow {
            price_group: Some(pg.into()),
            costs: CostValues {
                average: avg,
                cases_on_hand: cases,
                ..Default::default()
            },
            raw_average_cost: avg,
            ..Default::default()
        }
    }

    #[test]
    fn weighted_by_cases() {
        let mut rows = vec![row("10", Some(5.0), Some(10.0)), row("10", Some(8.0), Some(20.0))];
        let alloc = weighted_average_by_group(&mut rows);
        assert_eq!(alloc.len(), 1);
        assert_eq!(alloc[0].weighted_cost, 7.0);
        assert!(rows.iter().all(|r| r.costs.average == Some(7.0)));
        // raw value retained for the cost reference sheet
        assert_eq!(rows[0].raw_average_cost, Some(5.0));
    }

    #[test]
    fn zero_cases_falls_back_to_first_cost() {
        let mut rows = vec![row("10", Some(5.0), Some(0.0)), row("10", Some(8.0), None)];
        let alloc = weighted_average_by_group(&mut rows);
        assert!(alloc[0].fallback);
        assert!(rows.iter().all(|r| r.costs.average == Some(5.0)));
    }

    #[test]
    fn groups_are_independent() {
        let mut rows = vec![
            row("10", Some(5.0), Some(1.0)),
            row("20", Some(9.0), Some(3.0)),
            row("20", Some(1.0), Some(1.0)),
        ];
        weighted_average_by_group(&mut rows);
        assert_eq!(rows[0].costs.average, Some(5.0));
        assert_eq!(rows[1].costs.average, Some(7.0));
        assert_eq!(rows[2].costs.average, Some(7.0));
    }

    #[test]
    fn empty_partition() {
        assert_eq!(weighted_cost(&[]), (0.0, true));
    }
}
