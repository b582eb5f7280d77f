//! Multi-page journeys built from the page objects and API services.

use crate::api::{ProductService, TimedResponse};
use crate::browser::{BrowserSession, Locator};
use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use crate::pages::{switch_to_new_window, CartPage, HomePage, ProductPage, SearchResultsPage};
use crate::reconcile::{
    compare_cross_source, extract_api_price, first_inventory_entry, price_in_list, CrossSourceVerdict,
};

/// Search for `query` from the home page and open the first result, following
/// it into a new tab when the storefront opens one.
///
/// Returns whether a product detail page ended up active; `false` when the
/// search found nothing.
pub async fn open_first_search_result<S>(session: &S, settings: &Settings, query: &str) -> Result<bool>
where
    S: BrowserSession + ?Sized,
{
    let home = HomePage::new(session, settings);
    home.navigate().await?;
    home.search_product(query).await?;

    let results = SearchResultsPage::new(session, settings);
    if !results.has_results().await? {
        tracing::warn!("No search results for '{}'", query);
        return Ok(false);
    }

    let baseline = session.window_handles().await?.len();
    if !results.click_first_product().await? {
        return Ok(false);
    }
    switch_to_new_window(session, baseline, results.base.wait_config()).await?;

    ProductPage::new(session, settings).is_product_page().await
}

/// [`open_first_search_result`], then add the product to the bag.
/// Returns the selling price shown on the product page.
pub async fn add_first_result_to_bag<S>(session: &S, settings: &Settings, query: &str) -> Result<f64>
where
    S: BrowserSession + ?Sized,
{
    if !open_first_search_result(session, settings, query).await? {
        return Err(AutomationError::CartOperation(format!(
            "No product page reached for '{}'",
            query
        )));
    }

    let product = ProductPage::new(session, settings);
    let price = product.selling_price().await?;
    product.click_add_to_bag().await?;
    product.base.wait_for_page_load().await?;
    Ok(price)
}

/// Compare the selling price on the active product page with the inventory
/// API's price for the same product id.
///
/// A blocked request (403) or a payload without inventory data is
/// inconclusive; any other non-200 answer is an error.
pub async fn cross_layer_price_check<S>(
    session: &S,
    settings: &Settings,
    products: &ProductService<'_>,
) -> Result<CrossSourceVerdict>
where
    S: BrowserSession + ?Sized,
{
    let product = ProductPage::new(session, settings);
    if !product.is_product_page().await? {
        return Err(AutomationError::ElementNotFound {
            locator: Locator::css(crate::pages::product::PRODUCT_TITLE).to_string(),
            timeout: settings.browser.explicit_wait(),
        });
    }

    let ui_price = product.selling_price().await?;
    let product_id = product.product_id_from_url().await?;
    tracing::info!("UI layer: product_id={}, price={:.2}", product_id, ui_price);

    if ui_price <= 0.0 {
        return Err(AutomationError::Browser(format!("UI price is invalid: {}", ui_price)));
    }
    if product_id.is_empty() {
        let url = product.base.current_url().await?;
        return Err(AutomationError::Browser(format!(
            "Could not extract product id from {}",
            url
        )));
    }

    let response = products.get_product_details(&product_id).await;
    verdict_from_inventory(ui_price, &product_id, &response, settings.pricing.tolerance)
}

/// Judge an inventory API answer against the UI price.
pub fn verdict_from_inventory(
    ui_price: f64,
    product_id: &str,
    response: &TimedResponse,
    tolerance: f64,
) -> Result<CrossSourceVerdict> {
    match response.status_code {
        403 => {
            return Ok(CrossSourceVerdict::inconclusive(
                "Inventory API request blocked (403)",
            ))
        }
        0 => {
            return Err(AutomationError::ApiTimeout(
                response
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "no response".to_string()),
            ))
        }
        200 => {}
        other => {
            return Err(AutomationError::ApiValidation(format!(
                "Inventory API returned {}",
                other
            )))
        }
    }

    let body = response
        .body
        .as_ref()
        .filter(|b| !b.is_null())
        .ok_or_else(|| AutomationError::ApiValidation("API returned empty response body".to_string()))?;

    if first_inventory_entry(body).is_none() {
        return Ok(CrossSourceVerdict::inconclusive(format!(
            "No inventory data for product {}",
            product_id
        )));
    }

    let api_price = extract_api_price(body);
    tracing::info!("API layer: price={:?}", api_price);
    Ok(compare_cross_source(ui_price, api_price, tolerance))
}

/// Whether `product_price` appears among the cart's line items.
pub async fn cart_matches_product_price<S>(session: &S, settings: &Settings, product_price: f64) -> Result<bool>
where
    S: BrowserSession + ?Sized,
{
    let cart = CartPage::new(session, settings);
    cart.navigate().await?;
    cart.base.wait_for_page_load().await?;

    let prices = cart.item_prices().await?;
    let found = price_in_list(product_price, &prices, settings.pricing.tolerance);
    if !found {
        tracing::warn!("Price {:.2} not found in cart prices {:?}", product_price, prices);
    }
    Ok(found)
}
