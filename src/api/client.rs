use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN, REFERER, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Statuses retried at the transport level.
pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

/// Longest pause between two transport retries.
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// One HTTP exchange, measured.
///
/// `status_code == 0` means no response was received; `error_message` then
/// says why.
#[derive(Debug, Clone, Serialize)]
pub struct TimedResponse {
    pub status_code: u16,
    pub response_time_ms: f64,
    pub body: Option<Value>,
    pub headers: HashMap<String, String>,
    pub is_success: bool,
    pub error_message: Option<String>,
}

impl TimedResponse {
    fn failure(started: Instant, message: String) -> Self {
        Self {
            status_code: 0,
            response_time_ms: elapsed_ms(started),
            body: None,
            headers: HashMap::new(),
            is_success: false,
            error_message: Some(message),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers.get(&name).map(String::as_str)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

/// Pooled HTTP client for the storefront's JSON endpoints.
///
/// Never fails on transport problems: timeouts and connection errors come
/// back as a [`TimedResponse`] with status 0.
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    backoff_factor: f64,
}

impl ApiClient {
    /// Client for `target.api_base_url`, presenting the browser identity the
    /// storefront CDN expects.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_base_url(&settings.target.api_base_url, settings)
    }

    pub fn with_base_url(base_url: &str, settings: &Settings) -> Result<Self> {
        let origin = settings.target.base_url.trim_end_matches('/');

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, header_value(&settings.browser.user_agent)?);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/plain, */*"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(REFERER, header_value(&format!("{}/", origin))?);
        headers.insert(ORIGIN, header_value(origin)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| AutomationError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            timeout: settings.api.timeout(),
            max_retries: settings.api.max_retries,
            backoff_factor: settings.api.retry_backoff_secs,
        })
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> TimedResponse {
        self.request(Method::GET, path, params, None).await
    }

    pub async fn post(&self, path: &str, params: &[(&str, &str)], body: Option<&Value>) -> TimedResponse {
        self.request(Method::POST, path, params, body).await
    }

    pub async fn put(&self, path: &str, params: &[(&str, &str)], body: Option<&Value>) -> TimedResponse {
        self.request(Method::PUT, path, params, body).await
    }

    pub async fn delete(&self, path: &str, params: &[(&str, &str)]) -> TimedResponse {
        self.request(Method::DELETE, path, params, None).await
    }

    /// Lightweight reachability check.
    pub async fn head(&self, path: &str, params: &[(&str, &str)]) -> TimedResponse {
        self.request(Method::HEAD, path, params, None).await
    }

    /// Release pooled connections.
    pub fn close(self) {
        tracing::debug!("API client for {} closed", self.base_url);
    }

    /// Issue one request, timing it from dispatch to full body (or failure).
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<&Value>,
    ) -> TimedResponse {
        let url = format!("{}{}", self.base_url, path);
        tracing::info!("{} {} params={:?}", method, url, params);

        let started = Instant::now();
        let mut retries = 0u32;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .timeout(self.timeout);
            if !params.is_empty() {
                request = request.query(params);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if is_retry_status(status) && is_idempotent(&method) {
                        if retries < self.max_retries {
                            retries += 1;
                            self.back_off(retries, &url, &status.to_string()).await;
                            continue;
                        }
                        let message = format!(
                            "Max retries exceeded with url: {} (too many {} error responses)",
                            url,
                            status.as_u16()
                        );
                        tracing::error!("Request failed: {} - {}", url, message);
                        return TimedResponse::failure(started, message);
                    }
                    return self.finish(response, started, &url).await;
                }
                Err(e) if e.is_timeout() => {
                    let elapsed = elapsed_ms(started);
                    tracing::warn!("Request timed out after {:.1}ms: {}", elapsed, url);
                    return TimedResponse::failure(
                        started,
                        format!("Timeout after {}s", self.timeout.as_secs_f64()),
                    );
                }
                Err(e) if e.is_connect() && retries < self.max_retries => {
                    retries += 1;
                    self.back_off(retries, &url, &e.to_string()).await;
                }
                Err(e) => {
                    tracing::error!("Request failed: {} - {}", url, e);
                    return TimedResponse::failure(started, e.to_string());
                }
            }
        }
    }

    async fn back_off(&self, retry: u32, url: &str, reason: &str) {
        let delay = backoff_delay(self.backoff_factor, retry);
        tracing::warn!(
            "Retry {}/{} for {} after {:?}: {}",
            retry,
            self.max_retries,
            url,
            delay,
            reason
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn finish(&self, response: reqwest::Response, started: Instant, url: &str) -> TimedResponse {
        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) if e.is_timeout() => {
                tracing::warn!("Response body timed out: {}", url);
                return TimedResponse::failure(
                    started,
                    format!("Timeout after {}s", self.timeout.as_secs_f64()),
                );
            }
            Err(e) => {
                tracing::error!("Failed to read response body: {} - {}", url, e);
                return TimedResponse::failure(started, e.to_string());
            }
        };
        let response_time_ms = elapsed_ms(started);

        let body = if is_json {
            serde_json::from_slice::<Value>(&bytes).ok()
        } else {
            None
        };

        tracing::info!(
            "Response: {} in {:.1}ms ({} bytes)",
            status.as_u16(),
            response_time_ms,
            bytes.len()
        );

        TimedResponse {
            status_code: status.as_u16(),
            response_time_ms,
            body,
            headers,
            is_success: status.as_u16() < 400,
            error_message: None,
        }
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AutomationError::Config(format!("Invalid header value {:?}: {}", value, e)))
}

fn is_retry_status(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

/// Methods safe to resend after a server error.
fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}

/// Exponential backoff before the `retry`-th retry: none before the first,
/// then `factor * 2^(retry - 1)`, capped at [`BACKOFF_MAX`].
fn backoff_delay(factor: f64, retry: u32) -> Duration {
    if retry <= 1 || factor <= 0.0 {
        return Duration::ZERO;
    }
    let secs = factor * 2f64.powi(retry as i32 - 1);
    Duration::from_secs_f64(secs.min(BACKOFF_MAX.as_secs_f64()))
}
