//! Price parsing and reconciliation over realistic storefront labels.

use serde_json::json;
use storefront_e2e::price::{extract_price, extract_product_id, extract_result_count};
use storefront_e2e::reconcile::{
    check_sum_consistency, compare_cross_source, extract_api_price, price_in_list, CrossSourceVerdict,
    DEFAULT_PRICE_TOLERANCE,
};
use storefront_e2e::{AutomationError, ErrorCategory};

#[test]
fn test_price_labels() {
    let cases = [
        ("₹1,299", 1299.0),
        ("Rs. 1,299", 1299.0),
        ("MRP: ₹2,450.50", 2450.5),
        ("₹ 99", 99.0),
        ("1299", 1299.0),
        ("Free", 0.0),
        ("", 0.0),
        ("1.2.3", 0.0),
    ];
    for (label, expected) in cases {
        assert_eq!(extract_price(label), expected, "label {:?}", label);
    }
}

#[test]
fn test_parsed_prices_are_never_negative() {
    for label in ["-₹500", "(-)120", "₹-0.5", "--", "-"] {
        let price = extract_price(label);
        assert!(price >= 0.0, "{:?} parsed to {}", label, price);
    }
}

#[test]
fn test_result_counts_and_ids() {
    assert_eq!(extract_result_count("Showing 1 - 20 of 1,234 results"), 1234);
    assert_eq!(extract_result_count("12,345 products"), 12345);
    assert_eq!(extract_result_count("No results"), 0);

    assert_eq!(
        extract_product_id("https://www.nykaa.com/maybelline-fit-me/p/228840?skuId=1").as_deref(),
        Some("228840")
    );
    assert_eq!(extract_product_id("https://www.nykaa.com/search?q=kajal"), None);
}

#[test]
fn test_cart_sum_within_tolerance() {
    let items = [349.0, 199.5, 1250.0];
    let breakdown = check_sum_consistency(&items, 1799.0, DEFAULT_PRICE_TOLERANCE);
    assert!(breakdown.is_consistent);
    assert_eq!(breakdown.difference, 0.5);

    let breakdown = check_sum_consistency(&items, 1849.0, DEFAULT_PRICE_TOLERANCE);
    let err = breakdown.ensure_consistent().unwrap_err();
    assert_eq!(err.category(), ErrorCategory::PriceMismatch);
    assert_eq!(
        err.to_string(),
        "Price mismatch: total=1849.00, items=1798.50, diff=50.50 (tolerance=1.00)"
    );
}

#[test]
fn test_consistency_is_symmetric_in_difference() {
    let over = check_sum_consistency(&[100.0], 100.75, DEFAULT_PRICE_TOLERANCE);
    let under = check_sum_consistency(&[100.0], 99.25, DEFAULT_PRICE_TOLERANCE);
    assert_eq!(over.difference, under.difference);
    assert_eq!(over.is_consistent, under.is_consistent);
}

#[test]
fn test_cross_source_from_inventory_payload() {
    let payload = json!({
        "response": {
            "inventory_details": {
                "228840": {"price": 0, "selling_price": "449.00", "quantity": 12},
                "228841": {"price": 999}
            }
        }
    });

    let api_price = extract_api_price(&payload);
    assert_eq!(api_price, Some(449.0));

    let verdict = compare_cross_source(449.0, api_price, DEFAULT_PRICE_TOLERANCE);
    assert!(verdict.is_match());
    assert_eq!(
        serde_json::to_value(&verdict).unwrap(),
        json!({"verdict": "match", "ui_price": 449.0, "api_price": 449.0, "difference": 0.0})
    );

    let stale = compare_cross_source(399.0, api_price, DEFAULT_PRICE_TOLERANCE);
    assert!(matches!(stale, CrossSourceVerdict::Mismatch { .. }));
    assert!(matches!(
        stale.ensure_not_mismatch(),
        Err(AutomationError::PriceInconsistency { .. })
    ));
}

#[test]
fn test_price_lookup_in_cart() {
    let cart = [120.0, 449.4, 999.0];
    assert!(price_in_list(449.0, &cart, DEFAULT_PRICE_TOLERANCE));
    assert!(!price_in_list(450.5, &cart, DEFAULT_PRICE_TOLERANCE));
}
