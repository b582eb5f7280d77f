use crate::browser::{BrowserSession, Locator};
use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use crate::pages::base::{BasePage, VISIBILITY_TIMEOUT};
use crate::price::extract_product_id;
use std::time::Duration;

pub const PRODUCT_TITLE: &str = "h1";
pub const SELLING_PRICE: &str = "[class*='price'] span:nth-child(2), \
                                 [class*='css-1d0jf8e'] span:nth-child(2), \
                                 [class*='selling-price'], [class*='final-price']";
pub const MRP_PRICE: &str = "[class*='price'] span:first-child, \
                             [class*='css-1d0jf8e'] span:first-child, \
                             [class*='mrp'], [class*='strike']";
pub const DISCOUNT: &str = "[class*='price'] span:nth-child(3), [class*='discount'], [class*='off']";
/// Case-insensitive text match; covers both the inline and the sticky button.
pub const ADD_TO_BAG: &str = "//button[contains(translate(text(),'ABCDEFGHIJKLMNOPQRSTUVWXYZ',\
                              'abcdefghijklmnopqrstuvwxyz'),'add to bag')]";
pub const PRODUCT_IMAGE: &str = "img[alt='product-thumbnail'], .slide-view-container img, img[class*='product']";

const TITLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Product detail page: title, prices, imagery and the add-to-bag button.
pub struct ProductPage<'a, S: BrowserSession + ?Sized> {
    pub base: BasePage<'a, S>,
}

impl<'a, S: BrowserSession + ?Sized> ProductPage<'a, S> {
    pub fn new(session: &'a S, settings: &'a Settings) -> Self {
        Self::from_base(BasePage::new(session, settings))
    }

    pub fn from_base(base: BasePage<'a, S>) -> Self {
        Self { base }
    }

    pub async fn product_title(&self) -> Result<String> {
        self.base.get_text(&Locator::css(PRODUCT_TITLE)).await
    }

    pub async fn selling_price(&self) -> Result<f64> {
        let text = self.base.get_text(&Locator::css(SELLING_PRICE)).await?;
        Ok(self.base.parse_price(&text))
    }

    /// Original price; `0.0` for products sold without a discount.
    pub async fn mrp_price(&self) -> Result<f64> {
        match self.base.get_text(&Locator::css(MRP_PRICE)).await {
            Ok(text) => Ok(self.base.parse_price(&text)),
            Err(AutomationError::ElementNotFound { .. }) => Ok(0.0),
            Err(e) => Err(e),
        }
    }

    /// Discount label such as "20% Off"; empty when there is none.
    pub async fn discount_text(&self) -> Result<String> {
        match self.base.get_text(&Locator::css(DISCOUNT)).await {
            Ok(text) => Ok(text),
            Err(AutomationError::ElementNotFound { .. }) => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    pub async fn click_add_to_bag(&self) -> Result<()> {
        tracing::info!("Adding product to bag");
        let button = Locator::xpath(ADD_TO_BAG);
        self.base.scroll_to_element(&button).await?;
        self.base.click(&button).await
    }

    pub async fn is_add_to_bag_visible(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::xpath(ADD_TO_BAG), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    pub async fn has_product_image(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(PRODUCT_IMAGE), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    /// Loaded document with a visible title and selling price.
    pub async fn is_product_page(&self) -> Result<bool> {
        self.base.wait_for_page_load().await?;
        if !self
            .base
            .is_element_visible(&Locator::css(PRODUCT_TITLE), self.base.capped(TITLE_TIMEOUT))
            .await?
        {
            return Ok(false);
        }
        self.base
            .is_element_visible(&Locator::css(SELLING_PRICE), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    /// Numeric id from a `/<slug>/p/<id>` URL; empty when the URL has none.
    pub async fn product_id_from_url(&self) -> Result<String> {
        let url = self.base.current_url().await?;
        Ok(extract_product_id(&url).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{FakeElement, FakeSession};
    use crate::pages::{fast_base, test_settings};

    fn pdp() -> FakeSession {
        FakeSession::new()
            .with_url("https://shop.test/maybelline-fit-me/p/228840")
            .with_elements(&Locator::css(PRODUCT_TITLE), vec![FakeElement::new("Maybelline Fit Me")])
            .with_elements(&Locator::css(SELLING_PRICE), vec![FakeElement::new("₹449")])
            .with_elements(&Locator::css(MRP_PRICE), vec![FakeElement::new("MRP:₹599")])
            .with_elements(&Locator::css(DISCOUNT), vec![FakeElement::new("25% Off")])
            .with_elements(&Locator::xpath(ADD_TO_BAG), vec![FakeElement::new("Add to Bag")])
    }

    #[tokio::test]
    async fn test_reads_title_and_prices() {
        let session = pdp();
        let settings = test_settings();
        let page = ProductPage::from_base(fast_base(&session, &settings));

        assert_eq!(page.product_title().await.unwrap(), "Maybelline Fit Me");
        assert_eq!(page.selling_price().await.unwrap(), 449.0);
        assert_eq!(page.mrp_price().await.unwrap(), 599.0);
        assert_eq!(page.discount_text().await.unwrap(), "25% Off");
    }

    #[tokio::test]
    async fn test_undiscounted_product_defaults() {
        let session = FakeSession::new()
            .with_elements(&Locator::css(SELLING_PRICE), vec![FakeElement::new("₹449")]);
        let settings = test_settings();
        let page = ProductPage::from_base(fast_base(&session, &settings));

        assert_eq!(page.mrp_price().await.unwrap(), 0.0);
        assert_eq!(page.discount_text().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_missing_selling_price_fails() {
        let session = FakeSession::new();
        let settings = test_settings();
        let page = ProductPage::from_base(fast_base(&session, &settings));

        let err = page.selling_price().await.unwrap_err();
        assert!(matches!(err, AutomationError::ElementNotFound { .. }));
    }

    #[tokio::test]
    async fn test_add_to_bag_scrolls_then_clicks() {
        let session = pdp();
        let settings = test_settings();
        let page = ProductPage::from_base(fast_base(&session, &settings));

        assert!(page.is_add_to_bag_visible().await.unwrap());
        page.click_add_to_bag().await.unwrap();

        assert_eq!(session.calls("scroll_into_view"), 1);
        assert_eq!(session.clicked(), vec!["Add to Bag"]);
    }

    #[tokio::test]
    async fn test_is_product_page() {
        let settings = test_settings();

        let session = pdp().with_ready_states(&["loading", "complete"]);
        let page = ProductPage::from_base(fast_base(&session, &settings));
        assert!(page.is_product_page().await.unwrap());
        assert!(!page.has_product_image().await.unwrap());

        let listing = FakeSession::new()
            .with_elements(&Locator::css(PRODUCT_TITLE), vec![FakeElement::new("Lipsticks")]);
        let page = ProductPage::from_base(fast_base(&listing, &settings));
        assert!(!page.is_product_page().await.unwrap());
    }

    #[tokio::test]
    async fn test_product_id_from_url() {
        let session = pdp();
        let settings = test_settings();
        let page = ProductPage::from_base(fast_base(&session, &settings));
        assert_eq!(page.product_id_from_url().await.unwrap(), "228840");

        let home = FakeSession::new().with_url("https://shop.test/");
        let page = ProductPage::from_base(fast_base(&home, &settings));
        assert_eq!(page.product_id_from_url().await.unwrap(), "");
    }
}
