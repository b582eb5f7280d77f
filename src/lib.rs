//! Browser and API end-to-end checks for a storefront.
//!
//! UI checks drive Chrome over the DevTools protocol through page objects;
//! API checks go through a timed, retrying HTTP client. Prices read from both
//! sides are reconciled with a fixed tolerance.

pub mod api;
pub mod browser;
pub mod config;
pub mod data;
pub mod error;
pub mod flows;
pub mod harness;
pub mod logging;
pub mod pages;
pub mod price;
pub mod reconcile;
pub mod retry;
pub mod screenshot;
pub mod wait;

pub use api::{ApiClient, ProductService, SchemaValidator, SearchService, TimedResponse};
pub use browser::{BrowserSession, CDPClient, ElementRef, Locator};
pub use config::{load_settings, Settings};
pub use error::{AutomationError, ErrorCategory, FailureKind, Result};
pub use reconcile::{CrossSourceVerdict, PricingBreakdown};
