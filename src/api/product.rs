use crate::api::client::{ApiClient, TimedResponse};
use serde_json::json;

/// Inventory and availability by product id or slug.
pub const INVENTORY_PATH: &str = "/gateway-api/inventory/data/json/";
pub const OFFERS_PATH: &str = "/gateway-api/offer/api/v2/product/customer/offer";

/// Product endpoints of the storefront.
pub struct ProductService<'a> {
    client: &'a ApiClient,
}

impl<'a> ProductService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get_product_details(&self, product_id: &str) -> TimedResponse {
        tracing::info!("API inventory check: id={}", product_id);
        self.client
            .get(INVENTORY_PATH, &[("productId", product_id)])
            .await
    }

    pub async fn get_product_offers(&self, product_ids: &[&str]) -> TimedResponse {
        tracing::info!("API product offers: ids={:?}", product_ids);
        let body = json!({ "skuId": product_ids });
        self.client.post(OFFERS_PATH, &[], Some(&body)).await
    }

    pub async fn get_product_by_slug(&self, slug: &str) -> TimedResponse {
        tracing::info!("API product by slug: {}", slug);
        self.client.get(INVENTORY_PATH, &[("slug", slug)]).await
    }
}
