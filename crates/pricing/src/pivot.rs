//! Brand pivot: one column per pivot key (channel | pricing type | deal class
//! | purchase quantity), one row per (price group identity, pricing detail).

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::PivotConfig;
use crate::model::{CostVariant, ProductRow};
use crate::schema::{CostRole, Field, SchemaPlan};
use crate::table::CellValue;

/// The four pivot dimensions, outermost first.
pub const PIVOT_DIMENSIONS: [Field; 4] = [
    Field::Channel,
    Field::PricingType,
    Field::DealClass,
    Field::PurchaseQuantity,
];

const UNKNOWN_RANK: usize = 99;
const UNPARSABLE_QUANTITY: u64 = 9999;

// ---------------------------------------------------------------------------
// Pivot key
// ---------------------------------------------------------------------------

/// Composite column key. Components are never absent; a missing value is
/// an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PivotKey {
    pub channel: String,
    pub pricing_type: String,
    pub deal_class: String,
    pub purchase_quantity: String,
}

impl PivotKey {
    fn from_row(row: &ProductRow) -> Self {
        let part = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            channel: part(&row.channel),
            pricing_type: part(&row.pricing_type),
            deal_class: part(&row.deal_class),
            purchase_quantity: part(&row.purchase_quantity),
        }
    }

    /// Header rows, top to bottom.
    pub fn parts(&self) -> [&str; 4] {
        [
            &self.channel,
            &self.pricing_type,
            &self.deal_class,
            &self.purchase_quantity,
        ]
    }
}

impl fmt::Display for PivotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.parts().join(" | "))
    }
}

/// Leading decimal digits of a purchase quantity (`"5 CSE"` is 5).
pub fn quantity_prefix(quantity: &str) -> u64 {
    let digits: String = quantity.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(UNPARSABLE_QUANTITY)
}

/// Business ordering of pivot columns.
#[derive(Debug, Clone)]
pub struct ColumnOrder {
    channel: HashMap<String, usize>,
    pricing_type: HashMap<String, usize>,
    deal_class: HashMap<String, usize>,
}

impl ColumnOrder {
    pub fn new(config: &PivotConfig) -> Self {
        let ranks = |values: &[String]| {
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (v.clone(), i))
                .collect::<HashMap<_, _>>()
        };
        Self {
            channel: ranks(&config.channel_order),
            pricing_type: ranks(&config.pricing_type_order),
            deal_class: ranks(&config.deal_class_order),
        }
    }

    pub fn is_known_channel(&self, channel: &str) -> bool {
        self.channel.contains_key(channel)
    }

    fn rank(&self, key: &PivotKey) -> (usize, usize, usize, u64) {
        let r = |m: &HashMap<String, usize>, v: &str| m.get(v).copied().unwrap_or(UNKNOWN_RANK);
        (
            r(&self.channel, &key.channel),
            r(&self.pricing_type, &key.pricing_type),
            r(&self.deal_class, &key.deal_class),
            quantity_prefix(&key.purchase_quantity),
        )
    }

    /// Total order: business ranks first, key text breaks ties so the result
    /// never depends on input order.
    pub fn compare(&self, a: &PivotKey, b: &PivotKey) -> Ordering {
        self.rank(a).cmp(&self.rank(b)).then_with(|| a.cmp(b))
    }

    pub fn sort(&self, keys: &mut [PivotKey]) {
        keys.sort_by(|a, b| self.compare(a, b));
    }
}

impl Default for ColumnOrder {
    fn default() -> Self {
        Self::new(&PivotConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Pricing details
// ---------------------------------------------------------------------------

/// Row labels of the "Pricing Details" column, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Breakdown {
    NegotiatedCost,
    AvgCost,
    ListCase,
    ListBottle,
    Discount,
    CasePrice,
    BottlePrice,
    Chargeback,
    Gp2Negotiated,
    Gp2Average,
    StartDate,
    EndDate,
    DealId,
    DealDescription,
}

/// How a breakdown value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValueKind {
    Currency,
    Percent,
    Date,
    Text,
}

impl Breakdown {
    pub const ALL: [Breakdown; 14] = [
        Breakdown::NegotiatedCost,
        Breakdown::AvgCost,
        Breakdown::ListCase,
        Breakdown::ListBottle,
        Breakdown::Discount,
        Breakdown::CasePrice,
        Breakdown::BottlePrice,
        Breakdown::Chargeback,
        Breakdown::Gp2Negotiated,
        Breakdown::Gp2Average,
        Breakdown::StartDate,
        Breakdown::EndDate,
        Breakdown::DealId,
        Breakdown::DealDescription,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NegotiatedCost => CostVariant::Negotiated.cost_label(),
            Self::AvgCost => CostVariant::Average.cost_label(),
            Self::ListCase => "List Case",
            Self::ListBottle => "List Bottle",
            Self::Discount => "Discount",
            Self::CasePrice => "Case Price",
            Self::BottlePrice => "Bottle Price",
            Self::Chargeback => "Chargeback",
            Self::Gp2Negotiated => CostVariant::Negotiated.gp2_label(),
            Self::Gp2Average => CostVariant::Average.gp2_label(),
            Self::StartDate => "Start Date",
            Self::EndDate => "End Date",
            Self::DealId => "Deal ID",
            Self::DealDescription => "Deal Description",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Gp2Negotiated | Self::Gp2Average => ValueKind::Percent,
            Self::StartDate | Self::EndDate => ValueKind::Date,
            Self::DealId | Self::DealDescription => ValueKind::Text,
            _ => ValueKind::Currency,
        }
    }

    /// Whether the source of this detail exists. Derived details always do.
    fn available(&self, plan: &SchemaPlan) -> bool {
        match self {
            Self::NegotiatedCost => plan.has_cost(CostRole::NegotiatedCost),
            Self::AvgCost => plan.has_cost(CostRole::AverageCost),
            Self::ListCase => plan.has(Field::ListCase),
            Self::Discount => plan.has(Field::Discount),
            Self::CasePrice => plan.has(Field::CasePrice),
            Self::Chargeback => plan.has(Field::Chargeback),
            Self::StartDate => plan.has(Field::StartDate),
            Self::EndDate => plan.has(Field::EndDate),
            Self::DealId => plan.has(Field::DealId),
            Self::DealDescription => plan.has(Field::DealDescription),
            Self::ListBottle | Self::BottlePrice | Self::Gp2Negotiated | Self::Gp2Average => true,
        }
    }

    fn value(&self, row: &ProductRow) -> CellValue {
        let num = |v: Option<f64>| v.map(CellValue::Number).unwrap_or_default();
        match self {
            Self::NegotiatedCost => num(row.costs.negotiated),
            Self::AvgCost => num(row.costs.average),
            Self::ListCase => row.value(Field::ListCase),
            Self::ListBottle => num(row.metrics.list_bottle),
            Self::Discount => row.value(Field::Discount),
            Self::CasePrice => row.value(Field::CasePrice),
            Self::BottlePrice => num(row.metrics.bottle_price),
            Self::Chargeback => row.value(Field::Chargeback),
            Self::Gp2Negotiated => num(row.metrics.gp2.negotiated),
            Self::Gp2Average => num(row.metrics.gp2.average),
            Self::StartDate => row.value(Field::StartDate),
            Self::EndDate => row.value(Field::EndDate),
            Self::DealId => row.value(Field::DealId),
            Self::DealDescription => row.value(Field::DealDescription),
        }
    }
}

// ---------------------------------------------------------------------------
// Pivot table
// ---------------------------------------------------------------------------

/// Price group identity of a pivot row.
#[derive(Debug, Clone, Serialize)]
pub struct GroupIdentity {
    pub price_group: String,
    pub description: String,
    pub units_per_case: f64,
}

impl PartialEq for GroupIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.price_group == other.price_group
            && self.description == other.description
            && self.units_per_case.to_bits() == other.units_per_case.to_bits()
    }
}

impl Eq for GroupIdentity {}

impl std::hash::Hash for GroupIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.price_group.hash(state);
        self.description.hash(state);
        self.units_per_case.to_bits().hash(state);
    }
}

impl GroupIdentity {
    fn from_row(row: &ProductRow) -> Self {
        Self {
            price_group: row.price_group.clone().unwrap_or_default(),
            description: row.price_group_description.clone().unwrap_or_default(),
            units_per_case: row.units_per_case,
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        natural_cmp(&self.price_group, &other.price_group)
            .then_with(|| self.description.cmp(&other.description))
            .then_with(|| self.units_per_case.total_cmp(&other.units_per_case))
    }
}

/// Numeric comparison when both sides parse as numbers, text otherwise.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.total_cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotRow {
    pub identity: GroupIdentity,
    /// First row of a contiguous identity block; later rows leave the
    /// identity cells blank.
    pub block_start: bool,
    pub detail: Breakdown,
    /// One cell per pivot column.
    pub cells: Vec<CellValue>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotTable {
    pub columns: Vec<PivotKey>,
    pub rows: Vec<PivotRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PivotError {
    #[error("only {present} of 4 pivot dimensions present")]
    MissingDimensions { present: usize },
    #[error("no rows to pivot")]
    NoRows,
    #[error("every pivot value is missing")]
    NoValues,
}

/// Reshape one brand's rows into a pivot table.
pub fn build_pivot(
    rows: &[&ProductRow],
    plan: &SchemaPlan,
    order: &ColumnOrder,
) -> Result<PivotTable, PivotError> {
    let present = PIVOT_DIMENSIONS.iter().filter(|f| plan.has(**f)).count();
    if present < PIVOT_DIMENSIONS.len() {
        return Err(PivotError::MissingDimensions { present });
    }
    if rows.is_empty() {
        return Err(PivotError::NoRows);
    }

    let details: Vec<Breakdown> = Breakdown::ALL
        .iter()
        .copied()
        .filter(|d| d.available(plan))
        .collect();

    // Long form, first-seen value per (identity, detail, key).
    let mut identities: Vec<GroupIdentity> = Vec::new();
    let mut identity_ids: HashMap<GroupIdentity, usize> = HashMap::new();
    let mut cells: HashMap<(usize, Breakdown), HashMap<PivotKey, CellValue>> = HashMap::new();
    let mut keys: BTreeSet<PivotKey> = BTreeSet::new();
    let mut malformed = 0usize;

    for row in rows {
        let identity = GroupIdentity::from_row(row);
        let id = match identity_ids.get(&identity) {
            Some(&id) => id,
            None => {
                let id = identities.len();
                identity_ids.insert(identity.clone(), id);
                identities.push(identity);
                id
            }
        };
        let key = PivotKey::from_row(row);
        if !order.is_known_channel(&key.channel) || key.parts().iter().any(|p| p.is_empty()) {
            malformed += 1;
            debug!(key = %key, "malformed pivot key");
        }
        for detail in &details {
            let value = detail.value(row);
            if value.is_blank() {
                continue;
            }
            let slot = cells.entry((id, *detail)).or_default();
            if !slot.contains_key(&key) {
                slot.insert(key.clone(), value);
                keys.insert(key.clone());
            }
        }
    }
    if malformed > 0 {
        warn!(count = malformed, "malformed pivot keys sorted last");
    }
    if keys.is_empty() {
        return Err(PivotError::NoValues);
    }

    let mut columns: Vec<PivotKey> = keys.into_iter().collect();
    order.sort(&mut columns);

    let mut sorted: Vec<usize> = (0..identities.len()).collect();
    sorted.sort_by(|&a, &b| identities[a].compare(&identities[b]));

    let mut out = Vec::new();
    let mut previous: Option<usize> = None;
    for id in sorted {
        let identity = &identities[id];
        for detail in &details {
            let Some(slot) = cells.get(&(id, *detail)) else {
                continue;
            };
            let row_cells: Vec<CellValue> = columns
                .iter()
                .map(|k| slot.get(k).cloned().unwrap_or_default())
                .collect();
            out.push(PivotRow {
                identity: identity.clone(),
                block_start: previous != Some(id),
                detail: *detail,
                cells: row_cells,
            });
            previous = Some(id);
        }
    }

    Ok(PivotTable { columns, rows: out })
}
