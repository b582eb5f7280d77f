//! Price reconciliation between independently sourced figures.
//!
//! Two checks exist: line items against the displayed cart total, and a
//! rendered product price against the inventory API. Both use one absolute
//! tolerance, [`DEFAULT_PRICE_TOLERANCE`] unless configured otherwise.

use crate::error::{AutomationError, Result};
use serde::Serialize;
use serde_json::Value;

/// Absolute difference, in currency units, still treated as equal.
pub const DEFAULT_PRICE_TOLERANCE: f64 = 1.0;

/// Field names the inventory payload has used for the selling price.
pub const API_PRICE_FIELDS: [&str; 3] = ["price", "selling_price", "sp"];

/// Result of checking line items against a displayed total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingBreakdown {
    pub item_prices: Vec<f64>,
    pub displayed_total: f64,
    pub calculated_sum: f64,
    pub difference: f64,
    pub tolerance: f64,
    pub is_consistent: bool,
}

impl PricingBreakdown {
    pub fn ensure_consistent(&self) -> Result<()> {
        if self.is_consistent {
            return Ok(());
        }
        Err(AutomationError::PriceInconsistency {
            left_label: "total".to_string(),
            left: self.displayed_total,
            right_label: "items".to_string(),
            right: self.calculated_sum,
            difference: self.difference,
            tolerance: self.tolerance,
        })
    }
}

/// Sum `item_prices` and compare with `displayed_total`.
///
/// Consistent iff the absolute difference is strictly below `tolerance`.
pub fn check_sum_consistency(item_prices: &[f64], displayed_total: f64, tolerance: f64) -> PricingBreakdown {
    let calculated_sum: f64 = item_prices.iter().sum();
    let difference = (displayed_total - calculated_sum).abs();

    let breakdown = PricingBreakdown {
        item_prices: item_prices.to_vec(),
        displayed_total,
        calculated_sum,
        difference,
        tolerance,
        is_consistent: difference < tolerance,
    };

    tracing::info!(
        "Pricing validation: items={:?}, total={:.2}, sum={:.2}, diff={:.2}, consistent={}",
        breakdown.item_prices,
        displayed_total,
        calculated_sum,
        difference,
        breakdown.is_consistent
    );

    breakdown
}

/// Outcome of comparing a rendered price with an API price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum CrossSourceVerdict {
    Match {
        ui_price: f64,
        api_price: f64,
        difference: f64,
    },
    Mismatch {
        ui_price: f64,
        api_price: f64,
        difference: f64,
        tolerance: f64,
    },
    /// No usable API price; neither a pass nor a failure.
    Inconclusive { reason: String },
}

impl CrossSourceVerdict {
    pub fn inconclusive(reason: impl Into<String>) -> Self {
        CrossSourceVerdict::Inconclusive {
            reason: reason.into(),
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, CrossSourceVerdict::Match { .. })
    }

    pub fn is_inconclusive(&self) -> bool {
        matches!(self, CrossSourceVerdict::Inconclusive { .. })
    }

    /// `Err(PriceInconsistency)` for a mismatch; `Ok` otherwise.
    pub fn ensure_not_mismatch(&self) -> Result<()> {
        match self {
            CrossSourceVerdict::Mismatch {
                ui_price,
                api_price,
                difference,
                tolerance,
            } => Err(AutomationError::PriceInconsistency {
                left_label: "UI".to_string(),
                left: *ui_price,
                right_label: "API".to_string(),
                right: *api_price,
                difference: *difference,
                tolerance: *tolerance,
            }),
            _ => Ok(()),
        }
    }
}

/// Compare a UI price with an API price; equal iff `|ui - api| <= tolerance`.
///
/// A missing or zero API price is inconclusive.
pub fn compare_cross_source(ui_price: f64, api_price: Option<f64>, tolerance: f64) -> CrossSourceVerdict {
    let api_price = match api_price {
        Some(price) if price != 0.0 => price,
        _ => return CrossSourceVerdict::inconclusive("API price absent or zero under every known field"),
    };

    let difference = (ui_price - api_price).abs();
    if difference <= tolerance {
        tracing::info!(
            "Cross-layer price match: UI={:.2}, API={:.2} (diff={:.2})",
            ui_price,
            api_price,
            difference
        );
        CrossSourceVerdict::Match {
            ui_price,
            api_price,
            difference,
        }
    } else {
        tracing::warn!(
            "Cross-layer price mismatch: UI={:.2}, API={:.2} (diff={:.2}, tolerance={:.2})",
            ui_price,
            api_price,
            difference,
            tolerance
        );
        CrossSourceVerdict::Mismatch {
            ui_price,
            api_price,
            difference,
            tolerance,
        }
    }
}

/// Inventory entry of the first SKU in `response.inventory_details`.
pub fn first_inventory_entry(payload: &Value) -> Option<&Value> {
    payload
        .get("response")?
        .get("inventory_details")?
        .as_object()?
        .values()
        .next()
}

/// Selling price from an inventory payload, trying each of
/// [`API_PRICE_FIELDS`] in turn. Numbers and numeric strings are accepted;
/// zero counts as absent.
pub fn extract_api_price(payload: &Value) -> Option<f64> {
    let sku = first_inventory_entry(payload)?;

    API_PRICE_FIELDS
        .iter()
        .filter_map(|field| sku.get(*field))
        .filter_map(numeric)
        .find(|price| *price != 0.0)
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Whether any of `prices` is within `tolerance` (strictly) of `price`.
pub fn price_in_list(price: f64, prices: &[f64], tolerance: f64) -> bool {
    prices.iter().any(|p| (p - price).abs() < tolerance)
}
