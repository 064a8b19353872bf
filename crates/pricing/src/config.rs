use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PricingError;
use crate::schema::{CostRole, Field};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the pipeline can be told about input layout and business rules.
///
/// Every section is defaulted, so an empty TOML document is a valid config
/// describing the standard price book / ZPURCON layout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub sources: SourcesConfig,
    pub price_book: PriceBookConfig,
    pub cost_catalog: CostCatalogConfig,
    pub filters: FilterConfig,
    pub dedup: DedupConfig,
    pub pivot: PivotConfig,
    pub chain: ChainConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

/// Default file and sheet names, resolved against the CLI's source directory.
/// A missing sheet name means the first sheet.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    pub price_book_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_book_sheet: Option<String>,
    pub cost_catalog_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_catalog_sheet: Option<String>,
    pub chain_pricing_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_pricing_sheet: Option<String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            price_book_file: "Price_Book_Full.xlsx".into(),
            price_book_sheet: Some("Printer Friendly".into()),
            cost_catalog_file: "ZPURCON.xlsx".into(),
            cost_catalog_sheet: None,
            chain_pricing_file: "Chain_Pricing.xlsx".into(),
            chain_pricing_sheet: Some("Printer Friendly".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Price book
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceBookConfig {
    pub headers: FieldHeaders,
}

/// Source header for each semantic price-book field.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldHeaders {
    pub product_id: String,
    pub vendor_name: String,
    pub product_name: String,
    pub size: String,
    pub price_group: String,
    pub price_group_description: String,
    pub brand: String,
    pub pricing_type: String,
    pub deal_id: String,
    pub deal_class: String,
    pub deal_description: String,
    pub purchase_quantity: String,
    pub channel: String,
    pub start_date: String,
    pub end_date: String,
    pub list_case: String,
    pub discount: String,
    pub case_price: String,
    pub chargeback: String,
    pub units_per_case: String,
}

impl Default for FieldHeaders {
    fn default() -> Self {
        Self {
            product_id: "SAP Product ID".into(),
            vendor_name: "Vendor".into(),
            product_name: "Product Name".into(),
            size: "Size".into(),
            price_group: "Price Group".into(),
            price_group_description: "Price Group Description".into(),
            brand: "Brand".into(),
            pricing_type: "Pricing Type".into(),
            deal_id: "Deal ID".into(),
            deal_class: "Deal Class".into(),
            deal_description: "Deal Description".into(),
            purchase_quantity: "Purchase Quantity".into(),
            channel: "Trade Channel ID".into(),
            start_date: "Start Date".into(),
            end_date: "End Date".into(),
            list_case: "List Price".into(),
            discount: "Discount".into(),
            case_price: "Case Price".into(),
            chargeback: "Chargeback".into(),
            units_per_case: "Units Per Case".into(),
        }
    }
}

impl FieldHeaders {
    pub fn header(&self, field: Field) -> &str {
        match field {
            Field::ProductId => &self.product_id,
            Field::VendorName => &self.vendor_name,
            Field::ProductName => &self.product_name,
            Field::Size => &self.size,
            Field::PriceGroup => &self.price_group,
            Field::PriceGroupDescription => &self.price_group_description,
            Field::Brand => &self.brand,
            Field::PricingType => &self.pricing_type,
            Field::DealId => &self.deal_id,
            Field::DealClass => &self.deal_class,
            Field::DealDescription => &self.deal_description,
            Field::PurchaseQuantity => &self.purchase_quantity,
            Field::Channel => &self.channel,
            Field::StartDate => &self.start_date,
            Field::EndDate => &self.end_date,
            Field::ListCase => &self.list_case,
            Field::Discount => &self.discount,
            Field::CasePrice => &self.case_price,
            Field::Chargeback => &self.chargeback,
            Field::UnitsPerCase => &self.units_per_case,
        }
    }
}

// ---------------------------------------------------------------------------
// Cost catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CostCatalogConfig {
    /// Product id column of the cost catalog (join key).
    pub key: String,
    /// Ordered allow-list of cost columns to merge. Columns absent from the
    /// catalog are skipped.
    pub columns: Vec<CostColumn>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CostColumn {
    pub source: String,
    /// Display header; defaults to `source`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub role: CostRole,
}

impl CostColumn {
    fn new(source: &str, label: Option<&str>, role: CostRole) -> Self {
        Self {
            source: source.to_string(),
            label: label.map(str::to_string),
            role,
        }
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.source)
    }
}

impl Default for CostCatalogConfig {
    fn default() -> Self {
        use CostRole::*;
        let c = CostColumn::new;
        Self {
            key: "Material".into(),
            columns: vec![
                c("Supplier", None, Supplier),
                c("Price Group #", None, Hidden),
                c("Price Group Description", None, Hidden),
                c("FOB", None, Component),
                c("SPA", None, Component),
                c("Miscellaneous", Some("Misc"), Component),
                c("Land Freight", Some("Land Frt"), Component),
                c("Ocean Freight", Some("Ocean Frt"), Component),
                c("Federal Tax", Some("Fed Tax"), Component),
                c("Broker Charge", None, Hidden),
                c("Bulk Whiskey Fee", None, Hidden),
                c("Duty", None, Component),
                c("Tariffs Per Case", Some("Tariff"), Component),
                c("Consolidate Fee", None, Hidden),
                c("Gallonage tax per case pd to Vendor", Some("Tax pd to Ven"), Component),
                c("Gallonage tax per case Pd to State", Some("State Tax Cs"), Component),
                c("Gallonage tax Volume based Pd to State", Some("State Tax Vol"), Component),
                c("Total", Some("Negotiated Cost"), NegotiatedCost),
                c("Mov Avg 7210", Some("Avg Cost"), AverageCost),
                c("Stock in bottles", Some("Btls OH"), BottlesOnHand),
                c("Stock in Cases", Some("Cases OH"), CasesOnHand),
                c("Mrp Controller", None, Hidden),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    pub excluded_pricing_types: Vec<String>,
    pub excluded_channels: Vec<String>,
    pub excluded_purchase_quantities: Vec<String>,
    /// Channel code to display name. Codes not listed pass through.
    pub channel_aliases: BTreeMap<String, String>,
    /// Channel used when the trade channel is blank.
    pub blank_channel: String,
    /// Price-group descriptions starting with this prefix are dropped after
    /// cost allocation; product sizes starting with it are left off COGS.
    pub combo_prefix: String,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let excluded_channels = (2..=15)
            .chain(17..=19)
            .map(|n| format!("C{n}"))
            .collect();
        Self {
            excluded_pricing_types: vec!["Volume Incentives".into(), "Chain Pricing".into()],
            excluded_channels,
            excluded_purchase_quantities: vec!["0".into(), "0 CSE".into(), "0 EA".into()],
            channel_aliases: BTreeMap::from([
                ("C1".to_string(), "Retail".to_string()),
                ("C16".to_string(), "OP".to_string()),
            ]),
            blank_channel: "OP".into(),
            combo_prefix: "COMBO".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DedupConfig {
    /// Most specific first.
    pub strategies: Vec<Vec<Field>>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        use Field::*;
        Self {
            strategies: vec![
                vec![
                    ProductId,
                    DealId,
                    DealClass,
                    Channel,
                    PurchaseQuantity,
                    PriceGroup,
                    StartDate,
                    EndDate,
                ],
                vec![ProductId, DealId, DealClass, Channel, PurchaseQuantity],
                vec![ProductId, PriceGroup, DealClass, Channel],
                vec![ProductId, PriceGroup, DealClass],
                vec![ProductId, PriceGroup],
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Pivot
// ---------------------------------------------------------------------------

/// Column ordering for brand pivots. Values not listed rank after every
/// listed value.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PivotConfig {
    pub channel_order: Vec<String>,
    pub pricing_type_order: Vec<String>,
    pub deal_class_order: Vec<String>,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            channel_order: vec!["Retail".into(), "OP".into()],
            pricing_type_order: vec!["Level Pricing".into(), "Deal Pricing".into()],
            deal_class_order: vec![
                "Level Pricing".into(),
                "EVD – Straight Discount".into(),
                "Close – Straight Discount".into(),
                "Promo – Straight Discount".into(),
                "EVD- Special Price Goods".into(),
                "Promo- Special Price Goods".into(),
                "Inventory Reduction – Straight Discount".into(),
                "Inventory Reduction- Special Price Goods".into(),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Chain pricing
// ---------------------------------------------------------------------------

/// Chain-pricing layout. Header names are matched after title-casing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Text searched (case-insensitive) in column A to find the header row.
    pub header_marker: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub product_id: String,
    pub chain_name: String,
    pub price_group: String,
    pub price_group_description: String,
    pub list_price: String,
    pub net_price: String,
    pub chargeback: String,
    pub units_per_case: String,
    pub start_date: String,
    pub end_date: String,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            header_marker: "vendor id".into(),
            vendor_id: "Vendor Id".into(),
            vendor_name: "Vendor Name".into(),
            product_id: "Sap Product Id".into(),
            chain_name: "Chain Name".into(),
            price_group: "Price Group".into(),
            price_group_description: "Price Group Description".into(),
            list_price: "List Price".into(),
            net_price: "Net Price".into(),
            chargeback: "Chargeback".into(),
            units_per_case: "Units Per Case".into(),
            start_date: "Start Date".into(),
            end_date: "End Date".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, PricingError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| PricingError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, PricingError> {
        toml::to_string_pretty(self).map_err(|e| PricingError::ConfigParse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), PricingError> {
        if self.price_book.headers.product_id.trim().is_empty() {
            return Err(PricingError::ConfigValidation(
                "price_book.headers.product_id must not be empty".into(),
            ));
        }
        if self.cost_catalog.key.trim().is_empty() {
            return Err(PricingError::ConfigValidation(
                "cost_catalog.key must not be empty".into(),
            ));
        }

        for (i, strategy) in self.dedup.strategies.iter().enumerate() {
            if strategy.is_empty() {
                return Err(PricingError::ConfigValidation(format!(
                    "dedup.strategies[{i}] is empty"
                )));
            }
        }

        // Single-valued roles may appear once
        let mut seen: BTreeMap<CostRole, &str> = BTreeMap::new();
        for col in &self.cost_catalog.columns {
            if col.source.trim().is_empty() {
                return Err(PricingError::ConfigValidation(
                    "cost_catalog.columns: source must not be empty".into(),
                ));
            }
            if !col.role.is_single() {
                continue;
            }
            if let Some(prev) = seen.insert(col.role, &col.source) {
                return Err(PricingError::ConfigValidation(format!(
                    "cost role '{}' is assigned to both '{}' and '{}'",
                    col.role, prev, col.source
                )));
            }
        }

        if self.chain.header_marker.trim().is_empty() {
            return Err(PricingError::ConfigValidation(
                "chain.header_marker must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config.cost_catalog.key, "Material");
        assert_eq!(config.dedup.strategies.len(), 5);
        assert_eq!(config.filters.excluded_channels.len(), 17);
        assert!(config.filters.excluded_channels.contains(&"C19".to_string()));
        assert!(!config.filters.excluded_channels.contains(&"C16".to_string()));
        assert_eq!(config.sources.cost_catalog_sheet, None);
    }

    #[test]
    fn partial_override() {
        let input = r#"
[price_book.headers]
product_id = "Item"

[filters]
blank_channel = "Retail"

[dedup]
strategies = [["product_id", "price_group"]]
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        assert_eq!(config.price_book.headers.header(Field::ProductId), "Item");
        assert_eq!(config.price_book.headers.header(Field::Brand), "Brand");
        assert_eq!(config.filters.blank_channel, "Retail");
        assert_eq!(config.filters.combo_prefix, "COMBO");
        assert_eq!(
            config.dedup.strategies,
            vec![vec![Field::ProductId, Field::PriceGroup]]
        );
    }

    #[test]
    fn cost_columns_with_roles() {
        let input = r#"
[cost_catalog]
key = "SKU"

[[cost_catalog.columns]]
source = "Vendor No"
role = "supplier"

[[cost_catalog.columns]]
source = "Landed"
label = "Negotiated Cost"
role = "negotiated_cost"

[[cost_catalog.columns]]
source = "Freight"
"#;
        let config = PipelineConfig::from_toml(input).unwrap();
        let cols = &config.cost_catalog.columns;
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[1].display_label(), "Negotiated Cost");
        assert_eq!(cols[2].role, CostRole::Component);
        assert_eq!(cols[2].display_label(), "Freight");
    }

    #[test]
    fn rejects_unknown_field_name() {
        let input = r#"
[dedup]
strategies = [["product_id", "colour"]]
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, PricingError::ConfigParse(_)));
    }

    #[test]
    fn rejects_unknown_section() {
        let err = PipelineConfig::from_toml("[output]\njson = true\n").unwrap_err();
        assert!(matches!(err, PricingError::ConfigParse(_)));
    }

    #[test]
    fn rejects_empty_strategy() {
        let err = PipelineConfig::from_toml("[dedup]\nstrategies = [[]]\n").unwrap_err();
        assert!(err.to_string().contains("dedup.strategies[0]"));
    }

    #[test]
    fn rejects_duplicate_single_role() {
        let input = r#"
[[cost_catalog.columns]]
source = "Total"
role = "negotiated_cost"

[[cost_catalog.columns]]
source = "Landed"
role = "negotiated_cost"
"#;
        let err = PipelineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("negotiated_cost"));
    }

    #[test]
    fn components_may_repeat_role() {
        let input = r#"
[[cost_catalog.columns]]
source = "FOB"

[[cost_catalog.columns]]
source = "Duty"
"#;
        assert!(PipelineConfig::from_toml(input).is_ok());
    }

    #[test]
    fn rejects_empty_key() {
        let err = PipelineConfig::from_toml("[cost_catalog]\nkey = \" \"\n").unwrap_err();
        assert!(matches!(err, PricingError::ConfigValidation(_)));
    }

    #[test]
    fn default_round_trips_through_toml() {
        let text = PipelineConfig::default().to_toml().unwrap();
        let back = PipelineConfig::from_toml(&text).unwrap();
        assert_eq!(back.cost_catalog.columns, CostCatalogConfig::default().columns);
        assert_eq!(back.pivot.deal_class_order.len(), 8);
        assert_eq!(back.filters.channel_aliases.get("C1").map(String::as_str), Some("Retail"));
    }
}
