//! Per-bottle prices and GP2 margin ratios.
//!
//! Division never panics or produces infinities: a zero divisor yields
//! `None`, which is distinct from a computed 0.0.

use std::collections::BTreeMap;

use tracing::warn;

use crate::model::{DerivedMetrics, Gp2, ProductRow};
use crate::table::CellValue;

/// `numerator / divisor`, or `None` when the divisor is zero or the result is
/// not finite.
pub fn ratio(numerator: f64, divisor: f64) -> Option<f64> {
    if divisor == 0.0 {
        return None;
    }
    Some(numerator / divisor).filter(|r| r.is_finite())
}

/// GP2 = (price - (cost - chargeback)) / price.
pub fn gp2(price: f64, cost: f64, chargeback: f64) -> Option<f64> {
    ratio(price - (cost - chargeback), price)
}

/// Fill in `metrics` for every row. Missing cost values are coerced to 0.0.
/// No row is dropped.
pub fn compute(rows: &mut [ProductRow]) {
    let mut missing_costs = 0usize;
    for row in rows.iter_mut() {
        if row.costs.negotiated.is_none() || row.costs.average.is_none() {
            missing_costs += 1;
        }
        let negotiated = *row.costs.negotiated.get_or_insert(0.0);
        let average = *row.costs.average.get_or_insert(0.0);

        row.metrics = DerivedMetrics {
            list_bottle: ratio(row.list_case, row.units_per_case),
            bottle_price: ratio(row.case_price, row.units_per_case),
            gp2: Gp2 {
                negotiated: gp2(row.case_price, negotiated, row.chargeback),
                average: gp2(row.case_price, average, row.chargeback),
            },
        };
    }
    if missing_costs > 0 {
        warn!(rows = missing_costs, "missing cost values set to 0.0");
    }
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerces cells to numbers, counting non-numeric values per column so they
/// can be reported as one warning per column.
#[derive(Debug, Default)]
pub struct NumericCoercion {
    rejected: BTreeMap<String, usize>,
}

impl NumericCoercion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blank cells are `None` silently; non-numeric text is `None` and counted.
    pub fn optional(&mut self, column: &str, value: &CellValue) -> Option<f64> {
        if value.is_blank() {
            return None;
        }
        let n = value.as_number();
        if n.is_none() {
            *self.rejected.entry(column.to_string()).or_default() += 1;
        }
        n
    }

    /// Like [`optional`](Self::optional) but defaults to 0.0.
    pub fn number(&mut self, column: &str, value: &CellValue) -> f64 {
        self.optional(column, value).unwrap_or(0.0)
    }

    pub fn rejected(&self, column: &str) -> usize {
        self.rejected.get(column).copied().unwrap_or(0)
    }

    /// Emit one warning per column that had non-numeric values.
    pub fn report(&self) {
        for (column, count) in &self.rejected {
            warn!(column = %column, count, "non-numeric values coerced to 0.0");
        }
    }
}
