//! Parsing of numbers out of storefront display text.

use regex::Regex;
use std::sync::OnceLock;

fn digits() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("hardcoded regex"))
}

fn product_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/p/(\d+)").expect("hardcoded regex"))
}

/// Numeric value of a price label such as `"Rs. 1,299"`, `"₹1299"`,
/// `"₹.50"` or `"1299.50"`.
///
/// Only ASCII digits and decimal points survive. A `.` counts as a decimal
/// point when a digit follows it and no letter precedes it, so the dot of an
/// abbreviation like `"Rs."` is dropped. Labels with no digits, and malformed
/// leftovers such as `"1.2.3"`, yield `0.0`.
pub fn extract_price(text: &str) -> f64 {
    let chars: Vec<char> = text.chars().collect();
    let cleaned: String = chars
        .iter()
        .enumerate()
        .filter(|(i, c)| c.is_ascii_digit() || (**c == '.' && is_decimal_point(&chars, *i)))
        .map(|(_, c)| *c)
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => value,
        Ok(_) => 0.0,
        Err(_) => {
            tracing::debug!("Unparseable price label {:?} (cleaned {:?})", text, cleaned);
            0.0
        }
    }
}

fn is_decimal_point(chars: &[char], index: usize) -> bool {
    let next_is_digit = chars.get(index + 1).is_some_and(|c| c.is_ascii_digit());
    let after_letter = index > 0 && chars[index - 1].is_alphabetic();
    next_is_digit && !after_letter
}

/// Last integer in a result-count label: `"Showing 1 - 20 of 1,234"` → 1234.
pub fn extract_result_count(text: &str) -> u64 {
    let without_separators = text.replace(',', "");
    digits()
        .find_iter(&without_separators)
        .last()
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// Numeric product id from a product URL (`.../some-name/p/123456?...`).
pub fn extract_product_id(url: &str) -> Option<String> {
    product_id_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
