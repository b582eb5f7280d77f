use crate::error::{AutomationError, Result};
use jsonschema::JSONSchema;
use serde_json::Value;

/// Contract checks for API response bodies.
pub struct SchemaValidator;

impl SchemaValidator {
    /// Validate `body` against a JSON Schema; `(false, reason)` on mismatch.
    pub fn validate(body: &Value, schema: &Value) -> (bool, String) {
        let compiled = match JSONSchema::compile(schema) {
            Ok(compiled) => compiled,
            Err(e) => {
                tracing::warn!("Invalid JSON schema: {}", e);
                return (false, format!("invalid schema: {}", e));
            }
        };

        let result = match compiled.validate(body) {
            Ok(()) => (true, String::new()),
            Err(errors) => {
                let message = errors
                    .map(|e| {
                        let path = e.instance_path.to_string();
                        if path.is_empty() {
                            e.to_string()
                        } else {
                            format!("{} (at {})", e, path)
                        }
                    })
                    .next()
                    .unwrap_or_else(|| "schema mismatch".to_string());
                (false, message)
            }
        };

        if result.0 {
            tracing::debug!("Schema validation passed");
        } else {
            tracing::warn!("Schema validation failed: {}", result.1);
        }
        result
    }

    /// [`SchemaValidator::validate`], as an `ApiValidation` error.
    pub fn ensure_valid(body: &Value, schema: &Value) -> Result<()> {
        match Self::validate(body, schema) {
            (true, _) => Ok(()),
            (false, message) => Err(AutomationError::ApiValidation(message)),
        }
    }

    /// Resolve a dot-separated path such as `"data.products.0.price"`.
    /// Numeric segments index arrays; negative ones count from the end.
    pub fn lookup<'v>(body: &'v Value, field_path: &str) -> std::result::Result<&'v Value, String> {
        let mut current = body;

        for key in field_path.split('.') {
            current = match current {
                Value::Object(map) if map.contains_key(key) => &map[key],
                Value::Array(items) => {
                    let index = key
                        .parse::<i64>()
                        .ok()
                        .and_then(|i| {
                            if i < 0 {
                                items.len().checked_sub(i.unsigned_abs() as usize)
                            } else {
                                Some(i as usize)
                            }
                        })
                        .filter(|i| *i < items.len());
                    match index {
                        Some(i) => &items[i],
                        None => {
                            return Err(format!(
                                "Field not found at: {} (index: {})",
                                field_path, key
                            ))
                        }
                    }
                }
                _ => return Err(format!("Field not found at: {} (key: {})", field_path, key)),
            };
        }

        Ok(current)
    }

    pub fn validate_field_exists(body: &Value, field_path: &str) -> (bool, String) {
        match Self::lookup(body, field_path) {
            Ok(_) => (true, String::new()),
            Err(message) => (false, message),
        }
    }

    /// The value at `price_path` must be a positive number (or numeric
    /// string). Returns the parsed value alongside the verdict.
    pub fn validate_price_field(body: &Value, price_path: &str) -> (bool, f64) {
        let value = match Self::lookup(body, price_path) {
            Ok(value) => value,
            Err(_) => return (false, 0.0),
        };

        let price = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        };

        match price {
            Some(p) if p > 0.0 => (true, p),
            Some(p) => (false, p),
            None => (false, 0.0),
        }
    }
}
