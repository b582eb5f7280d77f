use crate::browser::{BrowserSession, Locator};
use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use crate::pages::base::{BasePage, VISIBILITY_TIMEOUT};
use crate::reconcile::{check_sum_consistency, PricingBreakdown};

pub const CART_ITEMS: &str = "[class*='cart-item'], [class*='product-in-cart']";
pub const ITEM_PRICE: &str = "[class*='item-price'], [class*='selling-price']";
pub const ITEM_TITLE: &str = "[class*='item-name'], [class*='product-name']";
pub const REMOVE_BUTTON: &str = "button[class*='remove'], [class*='delete']";
pub const CART_TOTAL: &str = "[class*='total-price'], [class*='grand-total']";
pub const EMPTY_CART_MSG: &str = "[class*='empty-cart'], [class*='no-items']";

/// Shopping bag at `/checkout/cart`.
///
/// The live storefront only shows a cart to signed-in users; guests are
/// redirected to a login prompt.
pub struct CartPage<'a, S: BrowserSession + ?Sized> {
    pub base: BasePage<'a, S>,
}

impl<'a, S: BrowserSession + ?Sized> CartPage<'a, S> {
    pub fn new(session: &'a S, settings: &'a Settings) -> Self {
        Self::from_base(BasePage::new(session, settings))
    }

    pub fn from_base(base: BasePage<'a, S>) -> Self {
        Self { base }
    }

    pub async fn navigate(&self) -> Result<&Self> {
        self.base.open("/checkout/cart").await?;
        tracing::info!("Cart page loaded");
        Ok(self)
    }

    pub async fn cart_items_count(&self) -> Result<usize> {
        Ok(self.base.query_elements(&Locator::css(CART_ITEMS)).await?.len())
    }

    pub async fn cart_total(&self) -> Result<f64> {
        let text = self.base.get_text(&Locator::css(CART_TOTAL)).await?;
        Ok(self.base.parse_price(&text))
    }

    /// Positive line-item prices, in page order.
    pub async fn item_prices(&self) -> Result<Vec<f64>> {
        Ok(self
            .base
            .texts(&Locator::css(ITEM_PRICE))
            .await?
            .iter()
            .map(|text| self.base.parse_price(text))
            .filter(|price| *price > 0.0)
            .collect())
    }

    pub async fn item_titles(&self) -> Result<Vec<String>> {
        let mut titles = self.base.texts(&Locator::css(ITEM_TITLE)).await?;
        titles.retain(|title| !title.trim().is_empty());
        Ok(titles)
    }

    pub async fn remove_first_item(&self) -> Result<()> {
        tracing::info!("Removing first cart item");
        self.base
            .click(&Locator::css(REMOVE_BUTTON))
            .await
            .map_err(|e| match e {
                AutomationError::ElementNotFound { .. } | AutomationError::WaitTimeout { .. } => {
                    AutomationError::CartOperation(format!("Could not remove cart item: {}", e))
                }
                other => other,
            })
    }

    pub async fn is_cart_empty(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(EMPTY_CART_MSG), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    /// Check the line items against the displayed total.
    pub async fn validate_pricing(&self, tolerance: f64) -> Result<PricingBreakdown> {
        let item_prices = self.item_prices().await?;
        let total = self.cart_total().await?;
        Ok(check_sum_consistency(&item_prices, total, tolerance))
    }
}
