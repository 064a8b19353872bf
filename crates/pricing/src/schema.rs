//! Typed schema of the two catalogs and the per-run [`SchemaPlan`].
//!
//! Header text is consulted exactly once, here. Every later stage asks the
//! plan which fields and cost roles are present.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PricingError;
use crate::table::Table;

// ---------------------------------------------------------------------------
// Field
// ---------------------------------------------------------------------------

/// Semantic columns of the price catalog.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ProductId,
    VendorName,
    ProductName,
    Size,
    PriceGroup,
    PriceGroupDescription,
    Brand,
    PricingType,
    DealId,
    DealClass,
    DealDescription,
    PurchaseQuantity,
    Channel,
    StartDate,
    EndDate,
    ListCase,
    Discount,
    CasePrice,
    Chargeback,
    UnitsPerCase,
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::ProductId,
        Field::VendorName,
        Field::ProductName,
        Field::Size,
        Field::PriceGroup,
        Field::PriceGroupDescription,
        Field::Brand,
        Field::PricingType,
        Field::DealId,
        Field::DealClass,
        Field::DealDescription,
        Field::PurchaseQuantity,
        Field::Channel,
        Field::StartDate,
        Field::EndDate,
        Field::ListCase,
        Field::Discount,
        Field::CasePrice,
        Field::Chargeback,
        Field::UnitsPerCase,
    ];

    /// Header used in report sheets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ProductId => "SAP Product ID",
            Self::VendorName => "Vendor",
            Self::ProductName => "Product Name",
            Self::Size => "Size",
            Self::PriceGroup => "Price Group",
            Self::PriceGroupDescription => "Price Group Description",
            Self::Brand => "Brand",
            Self::PricingType => "Pricing Type",
            Self::DealId => "Deal ID",
            Self::DealClass => "Deal Class",
            Self::DealDescription => "Deal Description",
            Self::PurchaseQuantity => "Purchase Quantity",
            Self::Channel => "Channel",
            Self::StartDate => "Start Date",
            Self::EndDate => "End Date",
            Self::ListCase => "List Case",
            Self::Discount => "Discount",
            Self::CasePrice => "Case Price",
            Self::Chargeback => "Chargeback",
            Self::UnitsPerCase => "Units Per Case",
        }
    }

    /// Fields read as numbers (coerced to 0.0 when missing).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::ListCase | Self::Discount | Self::CasePrice | Self::Chargeback | Self::UnitsPerCase
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::StartDate | Self::EndDate)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// CostRole
// ---------------------------------------------------------------------------

/// How an allow-listed cost-catalog column is used.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum CostRole {
    Supplier,
    NegotiatedCost,
    AverageCost,
    BottlesOnHand,
    CasesOnHand,
    /// Shown on the COGS sheet under its label.
    #[default]
    Component,
    /// Merged but never displayed.
    Hidden,
}

impl CostRole {
    /// Roles that may be assigned to at most one column.
    pub fn is_single(&self) -> bool {
        !matches!(self, Self::Component | Self::Hidden)
    }
}

impl fmt::Display for CostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Supplier => "supplier",
            Self::NegotiatedCost => "negotiated_cost",
            Self::AverageCost => "average_cost",
            Self::BottlesOnHand => "bottles_on_hand",
            Self::CasesOnHand => "cases_on_hand",
            Self::Component => "component",
            Self::Hidden => "hidden",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// SchemaPlan
// ---------------------------------------------------------------------------

/// A cost column found in the cost catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCostColumn {
    pub source: String,
    pub label: String,
    pub role: CostRole,
    pub index: usize,
}

/// Which fields and cost columns are present for this run, with their
/// column positions.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaPlan {
    fields: BTreeMap<Field, usize>,
    cost_key: usize,
    cost_columns: Vec<PlannedCostColumn>,
}

impl SchemaPlan {
    /// Resolve headers of both catalogs against the config.
    ///
    /// Fails when a join key is missing, when none of the allow-listed cost
    /// columns exist, or when the supplier column is not among them.
    pub fn negotiate(
        price_book: &Table,
        cost_catalog: &Table,
        config: &PipelineConfig,
    ) -> Result<Self, PricingError> {
        let headers = &config.price_book.headers;
        let mut fields = BTreeMap::new();
        for field in Field::ALL {
            if let Some(idx) = price_book.column_index(headers.header(field)) {
                fields.insert(field, idx);
            }
        }
        if !fields.contains_key(&Field::ProductId) {
            return Err(PricingError::missing_column(
                &price_book.name,
                headers.header(Field::ProductId),
                &price_book.headers,
            ));
        }

        let cost_key = cost_catalog.require_column(&config.cost_catalog.key)?;

        let cost_columns: Vec<PlannedCostColumn> = config
            .cost_catalog
            .columns
            .iter()
            .filter_map(|col| {
                cost_catalog.column_index(&col.source).map(|index| PlannedCostColumn {
                    source: col.source.clone(),
                    label: col.display_label().to_string(),
                    role: col.role,
                    index,
                })
            })
            .collect();

        if cost_columns.is_empty() {
            return Err(PricingError::NoMergeColumns {
                table: cost_catalog.name.clone(),
            });
        }
        if !cost_columns.iter().any(|c| c.role == CostRole::Supplier) {
            return Err(PricingError::Input {
                table: cost_catalog.name.clone(),
                message: "supplier column missing in merged data".to_string(),
            });
        }

        let plan = Self {
            fields,
            cost_key,
            cost_columns,
        };
        plan.log_gaps();
        Ok(plan)
    }

    fn log_gaps(&self) {
        let missing: Vec<&str> = Field::ALL
            .iter()
            .filter(|f| !self.has(**f))
            .map(|f| f.label())
            .collect();
        for field in Field::ALL.iter().filter(|f| f.is_numeric() && !self.has(**f)) {
            warn!(column = field.label(), "column missing, using 0.0");
        }
        if !missing.is_empty() {
            debug!(?missing, "price book fields not present");
        }
        info!(
            fields = self.fields.len(),
            cost_columns = self.cost_columns.len(),
            "schema negotiated"
        );
    }

    pub fn has(&self, field: Field) -> bool {
        self.fields.contains_key(&field)
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.fields.get(&field).copied()
    }

    pub fn cost_key(&self) -> usize {
        self.cost_key
    }

    pub fn cost_columns(&self) -> &[PlannedCostColumn] {
        &self.cost_columns
    }

    pub fn cost_column(&self, role: CostRole) -> Option<&PlannedCostColumn> {
        self.cost_columns.iter().find(|c| c.role == role)
    }

    pub fn has_cost(&self, role: CostRole) -> bool {
        self.cost_column(role).is_some()
    }

    /// Component columns in allow-list order.
    pub fn components(&self) -> impl Iterator<Item = &PlannedCostColumn> {
        self.cost_columns
            .iter()
            .filter(|c| c.role == CostRole::Component)
    }

    /// Fields of `strategy` that are present.
    pub fn present<'a>(&'a self, strategy: &'a [Field]) -> impl Iterator<Item = Field> + 'a {
        strategy.iter().copied().filter(|f| self.has(*f))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
