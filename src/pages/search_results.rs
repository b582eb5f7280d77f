use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use crate::pages::base::{BasePage, VISIBILITY_TIMEOUT};
use crate::price::extract_result_count;

pub const PRODUCT_CARDS: &str = ".productWrapper a[href*='/p/'], div.productWrapper";
pub const PRODUCT_TITLE: &str = ".productWrapper [class*='title']";
pub const PRODUCT_PRICE: &str = ".productWrapper [class*='price']";
pub const FILTER_SECTION: &str = "div.filters, div.sidebar__inner, [class*='filter']";
pub const RESULTS_COUNT: &str = "span.result-count, [class*='result-count']";
pub const NO_RESULTS: &str = "[class*='no-result'], [class*='empty'], [class*='noResult']";

/// Search results grid, result counter and filter sidebar.
///
/// Single-word queries may redirect to a category page with different markup;
/// multi-word queries stay on this page.
pub struct SearchResultsPage<'a, S: BrowserSession + ?Sized> {
    pub base: BasePage<'a, S>,
}

impl<'a, S: BrowserSession + ?Sized> SearchResultsPage<'a, S> {
    pub fn new(session: &'a S, settings: &'a Settings) -> Self {
        Self::from_base(BasePage::new(session, settings))
    }

    pub fn from_base(base: BasePage<'a, S>) -> Self {
        Self { base }
    }

    /// Product cards once at least one has rendered; empty when none do.
    pub async fn product_cards(&self) -> Result<Vec<ElementRef>> {
        match self.base.wait_for_count(&Locator::css(PRODUCT_CARDS), 1).await {
            Ok(cards) => Ok(cards),
            Err(AutomationError::WaitTimeout { .. }) | Err(AutomationError::StaleElement(_)) => {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn product_count(&self) -> Result<usize> {
        Ok(self.product_cards().await?.len())
    }

    /// Counter text such as "Showing 1 - 20 of 1,234"; empty when absent.
    pub async fn result_count_text(&self) -> Result<String> {
        match self.base.get_text(&Locator::css(RESULTS_COUNT)).await {
            Ok(text) => Ok(text),
            Err(AutomationError::ElementNotFound { .. }) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    /// Total number of results, the last number in the counter text.
    pub async fn result_count(&self) -> Result<u64> {
        Ok(extract_result_count(&self.result_count_text().await?))
    }

    pub async fn click_first_product(&self) -> Result<bool> {
        self.click_product_at_index(0).await
    }

    /// Click the card at `index`; `false` when fewer cards rendered.
    pub async fn click_product_at_index(&self, index: usize) -> Result<bool> {
        if self.product_cards().await?.is_empty() {
            tracing::warn!("No product cards found to click");
            return Ok(false);
        }
        self.base.click_nth(&Locator::css(PRODUCT_CARDS), index).await
    }

    pub async fn first_product_price_text(&self) -> Result<String> {
        self.base.first_text(&Locator::css(PRODUCT_PRICE)).await
    }

    pub async fn first_product_price(&self) -> Result<f64> {
        Ok(self.base.parse_price(&self.first_product_price_text().await?))
    }

    pub async fn first_product_title(&self) -> Result<String> {
        self.base.first_text(&Locator::css(PRODUCT_TITLE)).await
    }

    pub async fn has_results(&self) -> Result<bool> {
        Ok(self.product_count().await? > 0)
    }

    pub async fn has_no_results(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(NO_RESULTS), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    /// Expand the `category` accordion in the sidebar, tick `value`, and wait
    /// for the grid to repopulate.
    pub async fn apply_filter(&self, category: &str, value: &str) -> Result<()> {
        tracing::info!("Applying filter: {} > {}", category, value);

        let category = xpath_literal(category);
        let heading = Locator::xpath(format!(
            "//div[contains(@class, 'filter')]//div[contains(text(), {c})] | \
             //div[contains(@class, 'filter')]//span[contains(text(), {c})]",
            c = category
        ));
        self.base.click(&heading).await?;

        let value = xpath_literal(value);
        let option = Locator::xpath(format!(
            "//label[contains(text(), {v})] | //span[contains(text(), {v})]",
            v = value
        ));
        self.base.click(&option).await?;

        self.base.wait_for_count(&Locator::css(PRODUCT_CARDS), 1).await?;
        Ok(())
    }

    pub async fn is_filter_section_visible(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(FILTER_SECTION), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }
}

/// Quote `value` as an XPath string literal, whatever quotes it contains.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}
