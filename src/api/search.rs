use crate::api::client::{ApiClient, TimedResponse};

/// Autocomplete suggestions for a query.
pub const SUGGESTIONS_PATH: &str = "/gludo/searchSuggestions";
pub const TRENDING_PATH: &str = "/search/trending";

/// Search endpoints of the storefront.
pub struct SearchService<'a> {
    client: &'a ApiClient,
}

impl<'a> SearchService<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn search_products(&self, query: &str) -> TimedResponse {
        tracing::info!("API search suggestions: query='{}'", query);
        self.client.get(SUGGESTIONS_PATH, &[("q", query)]).await
    }

    pub async fn get_search_suggestions(&self, query: &str) -> TimedResponse {
        self.search_products(query).await
    }

    pub async fn get_trending_searches(&self) -> TimedResponse {
        tracing::info!("API trending searches");
        self.client.get(TRENDING_PATH, &[]).await
    }
}
