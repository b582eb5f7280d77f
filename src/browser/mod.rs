//! Browser-session abstraction and its Chrome DevTools Protocol implementation.
//!
//! Page objects, waits and flows only talk to [`BrowserSession`]; the
//! [`cdp::CDPClient`] drives a real Chrome, and tests use a scripted fake.

pub mod cdp;
#[cfg(test)]
pub(crate) mod fake;
pub mod launcher;

pub use cdp::CDPClient;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// How a [`Locator`] value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocatorStrategy {
    Css,
    XPath,
}

/// Strategy + value pair identifying zero or more elements in a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,
}

impl Locator {
    pub fn css(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            value: value.into(),
        }
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            value: value.into(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strategy {
            LocatorStrategy::Css => write!(f, "css={}", self.value),
            LocatorStrategy::XPath => write!(f, "xpath={}", self.value),
        }
    }
}

/// Handle to one element of the document it was found in.
///
/// `document` identifies that document instance; once the page navigates or
/// the node is detached, operations on the handle fail with
/// [`crate::error::AutomationError::StaleElement`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    pub document: String,
    pub index: u32,
}

/// Everything the framework needs from a live browser.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Load `url` in the active window and block until the document is ready.
    async fn navigate(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    async fn page_source(&self) -> Result<String>;

    /// Evaluate a JavaScript expression and return its JSON value.
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value>;

    /// All elements currently matching `locator`, in document order.
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>>;

    async fn element_text(&self, element: &ElementRef) -> Result<String>;

    async fn element_attribute(&self, element: &ElementRef, name: &str) -> Result<Option<String>>;

    async fn element_displayed(&self, element: &ElementRef) -> Result<bool>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    async fn focus(&self, element: &ElementRef) -> Result<()>;

    /// Clear the field and type `text` into it.
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Press a named key ("Enter", "Tab", "Escape", ...) in the focused element.
    async fn press_key(&self, key: &str) -> Result<()>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Open top-level windows/tabs, oldest first.
    async fn window_handles(&self) -> Result<Vec<String>>;

    async fn switch_to_window(&self, handle: &str) -> Result<()>;

    async fn save_screenshot(&self, path: &Path) -> Result<()>;
}
