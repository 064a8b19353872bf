// Property-based tests for margins, dedup strategy selection and pivot column order.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use pricewise_pricing::config::{DedupConfig, PipelineConfig};
use pricewise_pricing::dedup::{dedup_on, deduplicate, has_duplicates};
use pricewise_pricing::metrics::gp2;
use pricewise_pricing::model::{CostValues, ProductRow};
use pricewise_pricing::pivot::{build_pivot, ColumnOrder};
use pricewise_pricing::schema::{Field, SchemaPlan};
use pricewise_pricing::Table;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Shared plan
// ---------------------------------------------------------------------------

/// Plan over a price book carrying every known column.
fn full_plan() -> SchemaPlan {
    let config = PipelineConfig::default();
    let headers = &config.price_book.headers;
    let price_book = Table::new(
        "price_book",
        Field::ALL.iter().map(|f| headers.header(*f).to_string()).collect(),
        vec![],
    );
    let cost_catalog = Table::new(
        "cost_catalog",
        vec!["Material".into(), "Supplier".into(), "Total".into()],
        vec![],
    );
    SchemaPlan::negotiate(&price_book, &cost_catalog, &config).unwrap()
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Small alphabets so that duplicates on partial keys are common.
fn arb_row() -> impl Strategy<Value = ProductRow> {
    (
        prop::sample::select(vec!["1001", "1002"]),
        prop::sample::select(vec!["D1", "D2"]),
        prop::sample::select(vec!["10", "11"]),
        prop::sample::select(vec!["Level Pricing", "EVD – Straight Discount"]),
        prop::sample::select(vec!["Retail", "OP"]),
        prop::sample::select(vec!["1 CSE", "5 CSE"]),
        0.0..200.0f64,
    )
        .prop_map(|(pid, deal, pg, class, channel, qty, price)| ProductRow {
            product_id: pid.into(),
            deal_id: Some(deal.into()),
            price_group: Some(pg.into()),
            deal_class: Some(class.into()),
            channel: Some(channel.into()),
            purchase_quantity: Some(qty.into()),
            case_price: price,
            ..Default::default()
        })
}

/// Rows spread over pivot keys, including an unknown channel and odd quantities.
fn arb_pivot_row() -> impl Strategy<Value = ProductRow> {
    (
        prop::sample::select(vec!["Retail", "OP", "Wholesale"]),
        prop::sample::select(vec!["Level Pricing", "Deal Pricing", "Other"]),
        prop::sample::select(vec![
            "Level Pricing",
            "EVD – Straight Discount",
            "Promo – Straight Discount",
            "Unlisted",
        ]),
        prop::sample::select(vec!["1 CSE", "5 CSE", "10 CSE", "2 EA", "mixed"]),
        prop::sample::select(vec!["10", "11", "9"]),
        1.0..200.0f64,
    )
        .prop_map(|(channel, pt, dc, pq, pg, price)| ProductRow {
            product_id: "1001".into(),
            price_group: Some(pg.into()),
            price_group_description: Some(format!("Group {pg}")),
            units_per_case: 12.0,
            channel: Some(channel.into()),
            pricing_type: Some(pt.into()),
            deal_class: Some(dc.into()),
            purchase_quantity: Some(pq.into()),
            case_price: price,
            costs: CostValues {
                negotiated: Some(50.0),
                ..Default::default()
            },
            ..Default::default()
        })
}

/// A row-set paired with a shuffled copy of itself.
fn arb_shuffled_rows() -> impl Strategy<Value = (Vec<ProductRow>, Vec<ProductRow>)> {
    prop::collection::vec(arb_pivot_row(), 1..24)
        .prop_flat_map(|rows| (Just(rows.clone()), Just(rows).prop_shuffle()))
}

// ---------------------------------------------------------------------------
// Margins
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn zero_price_never_has_a_margin(cost in -1e6..1e6f64, chargeback in -1e3..1e3f64) {
        prop_assert_eq!(gp2(0.0, cost, chargeback), None);
    }

    #[test]
    fn margin_is_finite_when_present(
        price in -1e6..1e6f64,
        cost in -1e6..1e6f64,
        chargeback in -1e3..1e3f64,
    ) {
        if let Some(m) = gp2(price, cost, chargeback) {
            prop_assert!(m.is_finite());
        }
    }
}

// ---------------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn dedup_never_grows_and_reapplying_is_a_no_op(
        rows in prop::collection::vec(arb_row(), 0..16),
    ) {
        let plan = full_plan();
        let strategies = DedupConfig::default().strategies;
        let outcome = deduplicate(rows.clone(), &strategies, &plan);

        prop_assert!(outcome.rows.len() <= rows.len());
        prop_assert_eq!(outcome.removed, rows.len() - outcome.rows.len());

        match &outcome.strategy {
            Some(applied) => {
                let again = dedup_on(outcome.rows.clone(), &applied.fields);
                prop_assert_eq!(&again, &outcome.rows);

                // a second pass never lands on the same or a narrower strategy
                let second = deduplicate(outcome.rows.clone(), &strategies, &plan);
                if let Some(next) = second.strategy {
                    prop_assert!(next.index > applied.index);
                }
            }
            None => prop_assert_eq!(&outcome.rows, &rows),
        }
    }

    #[test]
    fn applied_strategy_is_the_most_specific_with_duplicates(
        rows in prop::collection::vec(arb_row(), 0..16),
    ) {
        let plan = full_plan();
        let strategies = DedupConfig::default().strategies;
        let outcome = deduplicate(rows.clone(), &strategies, &plan);
        let limit = outcome.strategy.as_ref().map_or(strategies.len(), |s| s.index);

        for strategy in &strategies[..limit] {
            let fields: Vec<Field> = plan.present(strategy).collect();
            if fields.len() >= 2 {
                prop_assert!(!has_duplicates(&rows, &fields));
            }
        }
        if let Some(applied) = &outcome.strategy {
            prop_assert!(has_duplicates(&rows, &applied.fields));
        }
    }
}

// ---------------------------------------------------------------------------
// Pivot
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn pivot_columns_ignore_input_order((rows, shuffled) in arb_shuffled_rows()) {
        let plan = full_plan();
        let order = ColumnOrder::default();

        let a: Vec<&ProductRow> = rows.iter().collect();
        let b: Vec<&ProductRow> = shuffled.iter().collect();
        let left = build_pivot(&a, &plan, &order).unwrap();
        let right = build_pivot(&b, &plan, &order).unwrap();

        prop_assert_eq!(&left.columns, &right.columns);
        let identities = |t: &pricewise_pricing::pivot::PivotTable| {
            t.rows
                .iter()
                .map(|r| (r.identity.price_group.clone(), r.detail))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(identities(&left), identities(&right));
    }

    #[test]
    fn pivot_columns_are_unique((rows, _) in arb_shuffled_rows()) {
        let plan = full_plan();
        let refs: Vec<&ProductRow> = rows.iter().collect();
        let table = build_pivot(&refs, &plan, &ColumnOrder::default()).unwrap();
        let mut keys: Vec<String> = table.columns.iter().map(|k| k.to_string()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        prop_assert_eq!(keys.len(), before);
    }
}
