use crate::browser::{BrowserSession, Locator};
use crate::config::schema::Settings;
use crate::error::Result;
use crate::pages::base::{BasePage, VISIBILITY_TIMEOUT};

pub const SEARCH_INPUT: &str = "input[type='text']";
pub const SEARCH_SUGGESTIONS: &str = "[class*='suggestion'], [class*='autocomplete']";
pub const LOGO: &str = "a[href='/'] img, [class*='logo']";

/// Storefront landing page: search bar and navigation.
pub struct HomePage<'a, S: BrowserSession + ?Sized> {
    pub base: BasePage<'a, S>,
}

impl<'a, S: BrowserSession + ?Sized> HomePage<'a, S> {
    pub fn new(session: &'a S, settings: &'a Settings) -> Self {
        Self::from_base(BasePage::new(session, settings))
    }

    pub fn from_base(base: BasePage<'a, S>) -> Self {
        Self { base }
    }

    pub async fn navigate(&self) -> Result<&Self> {
        self.base.open("/").await?;
        tracing::info!("Home page loaded");
        Ok(self)
    }

    /// Type `query` into the search bar and submit it.
    pub async fn search_product(&self, query: &str) -> Result<()> {
        tracing::info!("Searching for: '{}'", query);
        let input = Locator::css(SEARCH_INPUT);
        self.base.type_text(&input, query).await?;
        self.base.press_enter(&input).await
    }

    /// The search bar is the page's load marker.
    pub async fn is_loaded(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(SEARCH_INPUT), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }

    /// Type a partial query and report whether the suggestion dropdown shows.
    pub async fn has_search_suggestions(&self, partial: &str) -> Result<bool> {
        self.base.type_text(&Locator::css(SEARCH_INPUT), partial).await?;
        self.base
            .is_element_visible(
                &Locator::css(SEARCH_SUGGESTIONS),
                self.base.capped(VISIBILITY_TIMEOUT),
            )
            .await
    }

    pub async fn is_logo_visible(&self) -> Result<bool> {
        self.base
            .is_element_visible(&Locator::css(LOGO), self.base.capped(VISIBILITY_TIMEOUT))
            .await
    }
}
