//! Per-test browser lifecycle: one fresh session per UI test, a screenshot
//! when the test fails, and a guaranteed close.

use crate::browser::{BrowserSession, CDPClient};
use crate::config::schema::Settings;
use crate::error::Result;
use crate::screenshot::capture_screenshot;
use futures::future::BoxFuture;

/// Run `body` against an existing session.
///
/// On failure, and when `report.screenshot_on_failure` is set, a
/// `FAIL_<name>` screenshot is captured before the error is returned.
pub async fn run_with_session<S, T, F>(session: &S, settings: &Settings, name: &str, body: F) -> Result<T>
where
    S: BrowserSession + ?Sized,
    F: for<'a> FnOnce(&'a S, &'a Settings) -> BoxFuture<'a, Result<T>>,
{
    tracing::info!("UI test started: {}", name);
    let result = body(session, settings).await;

    match &result {
        Ok(_) => tracing::info!("UI test passed: {}", name),
        Err(e) => {
            tracing::error!("UI test failed: {} [{}] {}", name, e.category().as_str(), e);
            if settings.report.screenshot_on_failure {
                capture_screenshot(session, &settings.report.report_dir, &format!("FAIL_{}", name))
                    .await;
            }
        }
    }

    result
}

/// Launch (or attach to) a browser per `settings`, run `body`, and close the
/// browser whatever the outcome.
pub async fn run_ui_test<T, F>(settings: &Settings, name: &str, body: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a CDPClient, &'a Settings) -> BoxFuture<'a, Result<T>>,
{
    let session = CDPClient::from_settings(&settings.browser).await?;
    tracing::info!("Browser session created for {}", name);

    let result = run_with_session(&session, settings, name, body).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Failed to close browser after {}: {}", name, e);
    }
    result
}
