use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use crate::price::extract_price;
use crate::retry::{with_retry, RetryPolicy};
use crate::screenshot::screenshot_path;
use crate::wait::{wait_until, Condition, WaitConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Default wait for visibility probes, which answer `false` instead of failing.
pub const VISIBILITY_TIMEOUT: Duration = Duration::from_secs(5);

/// Interactions shared by every page object.
///
/// Lookups wait up to the configured explicit wait; clicks, typing and text
/// reads are retried when the element goes stale underneath them.
pub struct BasePage<'a, S: BrowserSession + ?Sized> {
    session: &'a S,
    settings: &'a Settings,
    wait: WaitConfig,
    retry: RetryPolicy,
}

impl<'a, S: BrowserSession + ?Sized> BasePage<'a, S> {
    pub fn new(session: &'a S, settings: &'a Settings) -> Self {
        Self {
            session,
            settings,
            wait: WaitConfig::from_settings(&settings.browser),
            retry: RetryPolicy::stale_element(),
        }
    }

    pub fn with_wait(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn settings(&self) -> &'a Settings {
        self.settings
    }

    pub fn wait_config(&self) -> WaitConfig {
        self.wait
    }

    /// `limit`, but never longer than the configured explicit wait.
    pub fn capped(&self, limit: Duration) -> Duration {
        limit.min(self.wait.timeout)
    }

    fn wait_for(&self, timeout: Option<Duration>) -> WaitConfig {
        WaitConfig::new(timeout.unwrap_or(self.wait.timeout), self.wait.poll_interval)
    }

    // Navigation

    /// Navigate to `base_url` + `path`.
    pub async fn open(&self, path: &str) -> Result<()> {
        let url = format!(
            "{}{}",
            self.settings.target.base_url.trim_end_matches('/'),
            path
        );
        tracing::info!("Navigating to {}", url);
        self.session.navigate(&url).await
    }

    pub async fn current_url(&self) -> Result<String> {
        self.session.current_url().await
    }

    pub async fn title(&self) -> Result<String> {
        self.session.title().await
    }

    // Element lookup

    /// First element matching `locator`, waiting up to `timeout` (or the
    /// explicit wait) for it to be present.
    pub async fn find_element(&self, locator: &Locator, timeout: Option<Duration>) -> Result<ElementRef> {
        let config = self.wait_for(timeout);
        let outcome = wait_until(
            self.session,
            &Condition::ElementPresent(locator.clone()),
            config,
        )
        .await
        .map_err(|e| not_found(e, locator))?;

        outcome.into_element().ok_or_else(|| AutomationError::ElementNotFound {
            locator: locator.to_string(),
            timeout: config.timeout,
        })
    }

    /// All elements matching `locator`, waiting until at least one exists.
    pub async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        let condition = Condition::ElementCountAtLeast {
            locator: locator.clone(),
            count: 1,
        };
        let outcome = wait_until(self.session, &condition, self.wait)
            .await
            .map_err(|e| not_found(e, locator))?;
        Ok(outcome.into_elements())
    }

    /// Elements matching `locator` right now, without waiting.
    pub async fn query_elements(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        self.session.find_elements(locator).await
    }

    // Interactions

    /// Wait for the element to be clickable, then click it.
    pub async fn click(&self, locator: &Locator) -> Result<()> {
        tracing::info!("Clicking: {}", locator);
        let condition = Condition::ElementClickable(locator.clone());
        let condition = &condition;

        with_retry(&self.retry, "click", move || async move {
            let element = wait_until(self.session, condition, self.wait)
                .await
                .map_err(|e| not_found(e, locator))?
                .into_element()
                .ok_or_else(|| AutomationError::ElementNotFound {
                    locator: locator.to_string(),
                    timeout: self.wait.timeout,
                })?;
            self.session.click(&element).await
        })
        .await
    }

    /// Click the `index`-th element currently matching `locator`.
    /// Returns `false` without clicking when fewer elements exist.
    pub async fn click_nth(&self, locator: &Locator, index: usize) -> Result<bool> {
        with_retry(&self.retry, "click_nth", move || async move {
            let elements = self.session.find_elements(locator).await?;
            match elements.get(index) {
                Some(element) => {
                    tracing::info!("Clicking {} #{}", locator, index);
                    self.session.click(element).await?;
                    Ok(true)
                }
                None => {
                    tracing::warn!(
                        "Index {} out of range for {} ({} elements)",
                        index,
                        locator,
                        elements.len()
                    );
                    Ok(false)
                }
            }
        })
        .await
    }

    /// Clear the field and type `text` into it.
    pub async fn type_text(&self, locator: &Locator, text: &str) -> Result<()> {
        tracing::info!("Typing into {}: '{}'", locator, text);
        with_retry(&self.retry, "type_text", move || async move {
            let element = self.find_element(locator, None).await?;
            self.session.type_text(&element, text).await
        })
        .await
    }

    /// Focus the element and press Enter in it.
    pub async fn press_enter(&self, locator: &Locator) -> Result<()> {
        with_retry(&self.retry, "press_enter", move || async move {
            let element = self.find_element(locator, None).await?;
            self.session.focus(&element).await?;
            self.session.press_key("Enter").await
        })
        .await
    }

    pub async fn get_text(&self, locator: &Locator) -> Result<String> {
        with_retry(&self.retry, "get_text", move || async move {
            let element = self.find_element(locator, None).await?;
            self.session.element_text(&element).await
        })
        .await
    }

    /// Attribute (or property) value; empty when absent.
    pub async fn get_attribute(&self, locator: &Locator, name: &str) -> Result<String> {
        with_retry(&self.retry, "get_attribute", move || async move {
            let element = self.find_element(locator, None).await?;
            self.session.element_attribute(&element, name).await
        })
        .await
        .map(Option::unwrap_or_default)
    }

    /// Text of every element currently matching `locator`, without waiting.
    /// A re-render midway restarts the query and the reads together.
    pub async fn texts(&self, locator: &Locator) -> Result<Vec<String>> {
        with_retry(&self.retry, "texts", move || async move {
            let mut texts = Vec::new();
            for element in self.session.find_elements(locator).await? {
                texts.push(self.session.element_text(&element).await?);
            }
            Ok(texts)
        })
        .await
    }

    /// Text of the first current match; empty when nothing matches.
    pub async fn first_text(&self, locator: &Locator) -> Result<String> {
        with_retry(&self.retry, "first_text", move || async move {
            match self.session.find_elements(locator).await?.first() {
                Some(element) => self.session.element_text(element).await,
                None => Ok(String::new()),
            }
        })
        .await
    }

    /// Whether the element becomes visible within `timeout`.
    pub async fn is_element_visible(&self, locator: &Locator, timeout: Duration) -> Result<bool> {
        let config = WaitConfig::new(timeout, self.wait.poll_interval);
        match wait_until(self.session, &Condition::ElementVisible(locator.clone()), config).await {
            Ok(_) => Ok(true),
            Err(AutomationError::WaitTimeout { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // Scrolling

    pub async fn scroll_to_element(&self, locator: &Locator) -> Result<()> {
        with_retry(&self.retry, "scroll_to_element", move || async move {
            let element = self.find_element(locator, None).await?;
            self.session.scroll_into_view(&element).await
        })
        .await
    }

    pub async fn scroll_to_bottom(&self) -> Result<()> {
        self.session
            .execute_script("window.scrollTo(0, document.body.scrollHeight)")
            .await?;
        Ok(())
    }

    // Screenshots

    /// Save a screenshot under `<report_dir>/screenshots/` and return its path.
    pub async fn take_screenshot(&self, name: &str) -> Result<PathBuf> {
        let path = screenshot_path(&self.settings.report.report_dir, name, chrono::Local::now());
        self.session.save_screenshot(&path).await?;
        tracing::info!("Screenshot saved: {}", path.display());
        Ok(path)
    }

    // Waits

    pub async fn wait_for_url_contains(&self, partial_url: &str, timeout: Option<Duration>) -> Result<()> {
        wait_until(
            self.session,
            &Condition::UrlContains(partial_url.to_string()),
            self.wait_for(timeout),
        )
        .await?;
        Ok(())
    }

    pub async fn wait_for_text_in_element(
        &self,
        locator: &Locator,
        text: &str,
        timeout: Option<Duration>,
    ) -> Result<()> {
        let condition = Condition::TextInElement {
            locator: locator.clone(),
            text: text.to_string(),
        };
        wait_until(self.session, &condition, self.wait_for(timeout)).await?;
        Ok(())
    }

    pub async fn wait_for_page_load(&self) -> Result<()> {
        wait_until(self.session, &Condition::DocumentReady, self.wait).await?;
        Ok(())
    }

    /// Wait until at least `count` elements match, returning them.
    pub async fn wait_for_count(&self, locator: &Locator, count: usize) -> Result<Vec<ElementRef>> {
        let condition = Condition::ElementCountAtLeast {
            locator: locator.clone(),
            count,
        };
        Ok(wait_until(self.session, &condition, self.wait)
            .await?
            .into_elements())
    }

    // Utility

    pub fn parse_price(&self, text: &str) -> f64 {
        extract_price(text)
    }
}

/// Turn a lookup timeout into `ElementNotFound` for `locator`.
fn not_found(err: AutomationError, locator: &Locator) -> AutomationError {
    match err {
        AutomationError::WaitTimeout { timeout, .. } => AutomationError::ElementNotFound {
            locator: locator.to_string(),
            timeout,
        },
        other => other,
    }
}
