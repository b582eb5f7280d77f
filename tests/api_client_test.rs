//! HTTP wrapper tests against a local axum server: timing, body parsing,
//! transport retries and the status-0 failure contract.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use storefront_e2e::api::product::{INVENTORY_PATH, OFFERS_PATH};
use storefront_e2e::api::search::SUGGESTIONS_PATH;
use storefront_e2e::{ApiClient, ProductService, SchemaValidator, SearchService, Settings};

#[derive(Clone, Default)]
struct Hits {
    flaky: Arc<AtomicU32>,
    broken: Arc<AtomicU32>,
    posts: Arc<AtomicU32>,
}

async fn spawn_server(hits: Hits) -> String {
    let app = Router::new()
        .route(
            "/json",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Json(json!({"response": {"products": [{"price": 499}]}}))
            }),
        )
        .route(
            "/text",
            get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "plain body") }),
        )
        .route(
            "/bad-json",
            get(|| async { ([(header::CONTENT_TYPE, "application/json")], "{not json") }),
        )
        .route(
            "/flaky",
            get(|State(hits): State<Hits>| async move {
                if hits.flaky.fetch_add(1, Ordering::SeqCst) < 2 {
                    StatusCode::SERVICE_UNAVAILABLE.into_response()
                } else {
                    Json(json!({"ok": true})).into_response()
                }
            }),
        )
        .route(
            "/broken",
            get(|State(hits): State<Hits>| async move {
                hits.broken.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            })
            .post(|State(hits): State<Hits>| async move {
                hits.posts.fetch_add(1, Ordering::SeqCst);
                StatusCode::BAD_GATEWAY
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        )
        .route(
            "/forbidden",
            get(|| async { (StatusCode::FORBIDDEN, Json(json!({"error": "blocked"}))) }),
        )
        .route(
            SUGGESTIONS_PATH,
            get(|axum::extract::Query(q): axum::extract::Query<std::collections::HashMap<String, String>>| async move {
                let term = q.get("q").cloned().unwrap_or_default();
                Json(json!({"response": {"suggestions": [{"q": format!("{} matte", term), "type": "query"}]}}))
            }),
        )
        .route(
            INVENTORY_PATH,
            get(|| async { Json(json!({"response": {"inventory_details": {"228840": {"sp": "449"}}}})) }),
        )
        .route(
            OFFERS_PATH,
            axum::routing::post(|Json(body): Json<Value>| async move {
                Json(json!({"received": body}))
            }),
        )
        .with_state(hits);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.api.max_retries = 2;
    settings.api.retry_backoff_secs = 0.0;
    settings
}

#[tokio::test]
async fn test_json_body_is_parsed_and_timed() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.get("/json", &[]).await;

    assert_eq!(response.status_code, 200);
    assert!(response.is_success);
    assert!(response.response_time_ms >= 50.0);
    assert_eq!(response.body.as_ref().unwrap()["response"]["products"][0]["price"], 499);
    assert!(response.header("Content-Type").unwrap().contains("json"));
    assert!(response.error_message.is_none());
}

#[tokio::test]
async fn test_non_json_body_is_not_parsed() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.get("/text", &[]).await;

    assert_eq!(response.status_code, 200);
    assert!(response.body.is_none());
}

#[tokio::test]
async fn test_malformed_json_body_is_null_not_an_error() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.get("/bad-json", &[]).await;

    assert_eq!(response.status_code, 200);
    assert!(response.is_success);
    assert!(response.body.is_none());
    assert!(response.error_message.is_none());
}

#[tokio::test]
async fn test_client_error_is_returned_not_retried() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let forbidden = client.get("/forbidden", &[]).await;
    assert_eq!(forbidden.status_code, 403);
    assert!(!forbidden.is_success);
    assert_eq!(forbidden.body.unwrap()["error"], "blocked");

    let missing = client.get("/no-such-route", &[]).await;
    assert_eq!(missing.status_code, 404);
    assert!(!missing.is_success);
}

#[tokio::test]
async fn test_transient_5xx_is_retried() {
    let hits = Hits::default();
    let base = spawn_server(hits.clone()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.get("/flaky", &[]).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(hits.flaky.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_exhausted_retries_report_status_zero() {
    let hits = Hits::default();
    let base = spawn_server(hits.clone()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.get("/broken", &[]).await;

    assert_eq!(response.status_code, 0);
    assert!(!response.is_success);
    assert_eq!(hits.broken.load(Ordering::SeqCst), 3);
    let message = response.error_message.unwrap();
    assert!(message.starts_with("Max retries exceeded"));
    assert!(message.contains("502"));
}

#[tokio::test]
async fn test_post_is_not_retried() {
    let hits = Hits::default();
    let base = spawn_server(hits.clone()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let response = client.post("/broken", &[], Some(&json!({"a": 1}))).await;

    assert_eq!(response.status_code, 502);
    assert_eq!(hits.posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_reports_status_zero() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings())
        .unwrap()
        .with_timeout(Duration::from_millis(200));

    let response = client.get("/slow", &[]).await;

    assert_eq!(response.status_code, 0);
    assert!(response.body.is_none());
    assert_eq!(response.error_message.as_deref(), Some("Timeout after 0.2s"));
    assert!(response.response_time_ms < 2000.0);
}

#[tokio::test]
async fn test_connection_refused_reports_status_zero() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ApiClient::with_base_url(&format!("http://{}", addr), &settings()).unwrap();

    let response = client.head("/anything", &[]).await;

    assert_eq!(response.status_code, 0);
    assert!(response.error_message.is_some());
}

#[tokio::test]
async fn test_services_hit_their_endpoints() {
    let base = spawn_server(Hits::default()).await;
    let client = ApiClient::with_base_url(&base, &settings()).unwrap();

    let suggestions = SearchService::new(&client).get_search_suggestions("lipstick").await;
    assert_eq!(suggestions.status_code, 200);
    let body = suggestions.body.unwrap();
    assert_eq!(body["response"]["suggestions"][0]["q"], "lipstick matte");
    let schema = storefront_e2e::data::load_schema("search_response").unwrap();
    assert!(SchemaValidator::validate(&body, &schema).0);

    let products = ProductService::new(&client);
    let inventory = products.get_product_details("228840").await;
    assert_eq!(
        storefront_e2e::reconcile::extract_api_price(inventory.body.as_ref().unwrap()),
        Some(449.0)
    );

    let offers = products.get_product_offers(&["1", "2"]).await;
    assert_eq!(offers.body.unwrap()["received"], json!({"skuId": ["1", "2"]}));
}
