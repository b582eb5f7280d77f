use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found within {}s: {locator}", timeout.as_secs_f64())]
    ElementNotFound { locator: String, timeout: Duration },

    #[error("Page load timed out after {}s: {url}", timeout.as_secs_f64())]
    PageLoadTimeout { url: String, timeout: Duration },

    #[error("Timed out after {}s waiting for {condition}", timeout.as_secs_f64())]
    WaitTimeout { condition: String, timeout: Duration },

    #[error("Stale element reference: {0}")]
    StaleElement(String),

    #[error("API timeout: {0}")]
    ApiTimeout(String),

    #[error("API schema validation failed: {0}")]
    ApiValidation(String),

    #[error("Price mismatch: {left_label}={left:.2}, {right_label}={right:.2}, diff={difference:.2} (tolerance={tolerance:.2})")]
    PriceInconsistency {
        left_label: String,
        left: f64,
        right_label: String,
        right: f64,
        difference: f64,
        tolerance: f64,
    },

    #[error("Cart operation failed: {0}")]
    CartOperation(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
}

/// Failure tag attached to every error for reports and structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    UiElement,
    PageLoad,
    WaitTimeout,
    StaleElement,
    ApiTimeout,
    ApiSchema,
    PriceMismatch,
    Cart,
    Browser,
    Config,
    Io,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UiElement => "UI_ELEMENT",
            ErrorCategory::PageLoad => "PAGE_LOAD",
            ErrorCategory::WaitTimeout => "WAIT_TIMEOUT",
            ErrorCategory::StaleElement => "STALE_ELEMENT",
            ErrorCategory::ApiTimeout => "API_TIMEOUT",
            ErrorCategory::ApiSchema => "API_SCHEMA",
            ErrorCategory::PriceMismatch => "PRICE_MISMATCH",
            ErrorCategory::Cart => "CART",
            ErrorCategory::Browser => "BROWSER",
            ErrorCategory::Config => "CONFIG",
            ErrorCategory::Io => "IO",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fieldless discriminant of [`AutomationError`], used to whitelist
/// retryable failures in a [`crate::retry::RetryPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    ElementNotFound,
    PageLoadTimeout,
    WaitTimeout,
    StaleElement,
    ApiTimeout,
    ApiValidation,
    PriceInconsistency,
    CartOperation,
    Browser,
    Config,
    Io,
}

impl AutomationError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AutomationError::ElementNotFound { .. } => FailureKind::ElementNotFound,
            AutomationError::PageLoadTimeout { .. } => FailureKind::PageLoadTimeout,
            AutomationError::WaitTimeout { .. } => FailureKind::WaitTimeout,
            AutomationError::StaleElement(_) => FailureKind::StaleElement,
            AutomationError::ApiTimeout(_) => FailureKind::ApiTimeout,
            AutomationError::ApiValidation(_) => FailureKind::ApiValidation,
            AutomationError::PriceInconsistency { .. } => FailureKind::PriceInconsistency,
            AutomationError::CartOperation(_) => FailureKind::CartOperation,
            AutomationError::Browser(_) => FailureKind::Browser,
            AutomationError::Config(_) | AutomationError::TomlDeserialize(_) => {
                FailureKind::Config
            }
            AutomationError::Io(_) | AutomationError::Json(_) => FailureKind::Io,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self.kind() {
            FailureKind::ElementNotFound => ErrorCategory::UiElement,
            FailureKind::PageLoadTimeout => ErrorCategory::PageLoad,
            FailureKind::WaitTimeout => ErrorCategory::WaitTimeout,
            FailureKind::StaleElement => ErrorCategory::StaleElement,
            FailureKind::ApiTimeout => ErrorCategory::ApiTimeout,
            FailureKind::ApiValidation => ErrorCategory::ApiSchema,
            FailureKind::PriceInconsistency => ErrorCategory::PriceMismatch,
            FailureKind::CartOperation => ErrorCategory::Cart,
            FailureKind::Browser => ErrorCategory::Browser,
            FailureKind::Config => ErrorCategory::Config,
            FailureKind::Io => ErrorCategory::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, AutomationError>;
