//! Page objects for the storefront.
//!
//! Each page wraps a [`BasePage`] over any [`crate::browser::BrowserSession`],
//! so the same objects drive a real Chrome and the scripted test session.

pub mod base;
pub mod cart;
pub mod home;
pub mod product;
pub mod search_results;

pub use base::{BasePage, VISIBILITY_TIMEOUT};
pub use cart::CartPage;
pub use home::HomePage;
pub use product::ProductPage;
pub use search_results::SearchResultsPage;

use crate::browser::BrowserSession;
use crate::error::{AutomationError, Result};
use crate::wait::{wait_until, Condition, WaitConfig};

/// Wait for a window beyond the `baseline` count to open, then make the newest
/// one active. Returns `false`, leaving the current window active, when none
/// opens in time.
pub async fn switch_to_new_window<S>(session: &S, baseline: usize, wait: WaitConfig) -> Result<bool>
where
    S: BrowserSession + ?Sized,
{
    match wait_until(session, &Condition::WindowCountGreaterThan(baseline), wait).await {
        Ok(_) => {}
        Err(AutomationError::WaitTimeout { .. }) => {
            tracing::debug!("No new window opened; staying on the current one");
            return Ok(false);
        }
        Err(e) => return Err(e),
    }

    let handles = session.window_handles().await?;
    match handles.last() {
        Some(newest) => {
            session.switch_to_window(newest).await?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[cfg(test)]
pub(crate) fn test_settings() -> crate::config::Settings {
    let mut settings = crate::config::Settings::default();
    settings.target.base_url = "https://shop.test/".to_string();
    settings
}

#[cfg(test)]
pub(crate) fn fast_base<'a>(
    session: &'a crate::browser::fake::FakeSession,
    settings: &'a crate::config::Settings,
) -> BasePage<'a, crate::browser::fake::FakeSession> {
    use crate::error::FailureKind;
    use crate::retry::RetryPolicy;
    use std::time::Duration;

    BasePage::new(session, settings)
        .with_wait(WaitConfig::new(Duration::from_millis(150), Duration::from_millis(10)))
        .with_retry(RetryPolicy::new(3, Duration::from_millis(5), vec![FailureKind::StaleElement]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::FakeSession;
    use std::time::Duration;

    fn quick() -> WaitConfig {
        WaitConfig::new(Duration::from_millis(150), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_switches_to_newest_window() {
        let session = FakeSession::new().open_window_after("W2", 1);

        assert!(switch_to_new_window(&session, 1, quick()).await.unwrap());
        assert_eq!(session.active_window(), "W2");
    }

    #[tokio::test]
    async fn test_stays_put_when_no_window_opens() {
        let session = FakeSession::new().with_windows(&["W1", "W0"]);

        assert!(!switch_to_new_window(&session, 2, quick()).await.unwrap());
        assert_eq!(session.active_window(), "W1");
        assert_eq!(session.calls("switch_to_window"), 0);
    }
}
