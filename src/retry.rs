//! Bounded retry of operations that race a re-rendering document.
//!
//! ```rust,ignore
//! let policy = RetryPolicy::stale_element();
//! let text = with_retry(&policy, "get_text", || async {
//!     session.element_text(&element).await
//! })
//! .await?;
//! ```

use crate::error::{FailureKind, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// Which failures are retried, how often, and how far apart.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total tries including the first one. Never below 1.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub delay: Duration,
    /// Failure kinds worth another attempt; anything else propagates at once.
    pub retry_on: Vec<FailureKind>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration, retry_on: Vec<FailureKind>) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            retry_on,
        }
    }

    /// Policy for element interactions: 3 attempts, 500ms apart, stale
    /// references only.
    pub fn stale_element() -> Self {
        Self::new(3, Duration::from_millis(500), vec![FailureKind::StaleElement])
    }

    pub fn is_retryable(&self, kind: FailureKind) -> bool {
        self.retry_on.contains(&kind)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::stale_element()
    }
}

/// Run `operation` under `policy`.
///
/// The last failure is returned as-is once attempts run out. No delay is
/// spent before the first attempt or after the last one.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !policy.is_retryable(err.kind()) => return Err(err),
            Err(err) if attempt >= max_attempts => {
                error!(
                    operation = op_name,
                    attempts = max_attempts,
                    category = %err.category(),
                    "All {} attempts exhausted for {}: {}",
                    max_attempts,
                    op_name,
                    err
                );
                return Err(err);
            }
            Err(err) => {
                warn!(
                    operation = op_name,
                    attempt,
                    "Retry {}/{} for {}: {}",
                    attempt,
                    max_attempts,
                    op_name,
                    err
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
        }
    }
}
