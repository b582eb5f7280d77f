//! Polling waits against live browser state.
//!
//! A [`Condition`] is re-evaluated on every tick of [`wait_until`] until it is
//! satisfied or the deadline passes. Conditions only read browser state, so
//! evaluating them any number of times is safe.

use crate::browser::{BrowserSession, ElementRef, Locator};
use crate::config::schema::BrowserSettings;
use crate::error::{AutomationError, Result};
use regex::Regex;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(15);

/// Deadline and tick interval of a single wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(timeout, DEFAULT_POLL_INTERVAL)
    }

    /// The explicit wait configured for page interactions.
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self::with_timeout(settings.explicit_wait())
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WAIT_TIMEOUT, DEFAULT_POLL_INTERVAL)
    }
}

/// Call `probe` until it yields a value or `config.timeout` elapses.
///
/// The probe always runs at least once, including when the timeout is zero.
/// An `Err` from the probe ends the wait immediately.
pub async fn poll_until<T, F, Fut>(config: WaitConfig, description: &str, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        if let Some(value) = probe().await? {
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!("Wait timed out after {:?}: {}", config.timeout, description);
            return Err(AutomationError::WaitTimeout {
                condition: description.to_string(),
                timeout: config.timeout,
            });
        }

        let remaining = deadline - now;
        tokio::time::sleep(config.poll_interval.min(remaining)).await;
    }
}

/// Browser-state predicates understood by [`wait_until`].
#[derive(Debug, Clone)]
pub enum Condition {
    /// `document.readyState` is `"complete"`.
    DocumentReady,
    ElementPresent(Locator),
    ElementVisible(Locator),
    /// Visible and not disabled.
    ElementClickable(Locator),
    /// First match has non-blank text.
    ElementHasText(Locator),
    TextInElement { locator: Locator, text: String },
    ElementCountAtLeast { locator: Locator, count: usize },
    ElementCountChanged { locator: Locator, initial: usize },
    WindowCountEquals(usize),
    WindowCountGreaterThan(usize),
    UrlContains(String),
    /// Current URL differs from the captured baseline.
    UrlChanged(String),
    UrlMatches(Regex),
}

/// What a satisfied condition resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Satisfied,
    Element(ElementRef),
    Elements(Vec<ElementRef>),
}

impl Outcome {
    pub fn into_element(self) -> Option<ElementRef> {
        match self {
            Outcome::Element(element) => Some(element),
            Outcome::Elements(elements) => elements.into_iter().next(),
            Outcome::Satisfied => None,
        }
    }

    pub fn into_elements(self) -> Vec<ElementRef> {
        match self {
            Outcome::Element(element) => vec![element],
            Outcome::Elements(elements) => elements,
            Outcome::Satisfied => Vec::new(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::DocumentReady => write!(f, "document ready"),
            Condition::ElementPresent(l) => write!(f, "presence of {}", l),
            Condition::ElementVisible(l) => write!(f, "visibility of {}", l),
            Condition::ElementClickable(l) => write!(f, "{} to be clickable", l),
            Condition::ElementHasText(l) => write!(f, "non-empty text in {}", l),
            Condition::TextInElement { locator, text } => {
                write!(f, "text '{}' in {}", text, locator)
            }
            Condition::ElementCountAtLeast { locator, count } => {
                write!(f, "at least {} elements matching {}", count, locator)
            }
            Condition::ElementCountChanged { locator, initial } => {
                write!(f, "count of {} to change from {}", locator, initial)
            }
            Condition::WindowCountEquals(n) => write!(f, "window count == {}", n),
            Condition::WindowCountGreaterThan(n) => write!(f, "window count > {}", n),
            Condition::UrlContains(part) => write!(f, "url containing '{}'", part),
            Condition::UrlChanged(original) => write!(f, "url to change from '{}'", original),
            Condition::UrlMatches(pattern) => write!(f, "url matching /{}/", pattern),
        }
    }
}

impl Condition {
    /// Evaluate once. `Ok(None)` means "not yet".
    pub async fn evaluate<S>(&self, session: &S) -> Result<Option<Outcome>>
    where
        S: BrowserSession + ?Sized,
    {
        let outcome = match self {
            Condition::DocumentReady => {
                let state = session.execute_script("document.readyState").await?;
                (state.as_str() == Some("complete")).then_some(Outcome::Satisfied)
            }
            Condition::ElementPresent(locator) => session
                .find_elements(locator)
                .await?
                .into_iter()
                .next()
                .map(Outcome::Element),
            Condition::ElementVisible(locator) => match first(session, locator).await? {
                Some(el) if session.element_displayed(&el).await? => Some(Outcome::Element(el)),
                _ => None,
            },
            Condition::ElementClickable(locator) => match first(session, locator).await? {
                Some(el) if session.element_displayed(&el).await? => {
                    let disabled = session.element_attribute(&el, "disabled").await?;
                    match disabled.as_deref() {
                        None | Some("false") => Some(Outcome::Element(el)),
                        _ => None,
                    }
                }
                _ => None,
            },
            Condition::ElementHasText(locator) => match first(session, locator).await? {
                Some(el) if !session.element_text(&el).await?.trim().is_empty() => {
                    Some(Outcome::Element(el))
                }
                _ => None,
            },
            Condition::TextInElement { locator, text } => match first(session, locator).await? {
                Some(el) if session.element_text(&el).await?.contains(text.as_str()) => {
                    Some(Outcome::Element(el))
                }
                _ => None,
            },
            Condition::ElementCountAtLeast { locator, count } => {
                let elements = session.find_elements(locator).await?;
                (elements.len() >= *count).then_some(Outcome::Elements(elements))
            }
            Condition::ElementCountChanged { locator, initial } => {
                let elements = session.find_elements(locator).await?;
                (elements.len() != *initial).then_some(Outcome::Elements(elements))
            }
            Condition::WindowCountEquals(n) => {
                (session.window_handles().await?.len() == *n).then_some(Outcome::Satisfied)
            }
            Condition::WindowCountGreaterThan(n) => {
                (session.window_handles().await?.len() > *n).then_some(Outcome::Satisfied)
            }
            Condition::UrlContains(part) => session
                .current_url()
                .await?
                .contains(part.as_str())
                .then_some(Outcome::Satisfied),
            Condition::UrlChanged(original) => {
                (session.current_url().await? != *original).then_some(Outcome::Satisfied)
            }
            Condition::UrlMatches(pattern) => pattern
                .is_match(&session.current_url().await?)
                .then_some(Outcome::Satisfied),
        };

        Ok(outcome)
    }

    /// Like [`Condition::evaluate`], but a stale element counts as "not yet".
    async fn probe<S>(&self, session: &S) -> Result<Option<Outcome>>
    where
        S: BrowserSession + ?Sized,
    {
        match self.evaluate(session).await {
            Err(AutomationError::StaleElement(_)) => Ok(None),
            other => other,
        }
    }
}

async fn first<S>(session: &S, locator: &Locator) -> Result<Option<ElementRef>>
where
    S: BrowserSession + ?Sized,
{
    Ok(session.find_elements(locator).await?.into_iter().next())
}

/// Block until `condition` holds, failing with `WaitTimeout` at the deadline.
pub async fn wait_until<S>(session: &S, condition: &Condition, config: WaitConfig) -> Result<Outcome>
where
    S: BrowserSession + ?Sized,
{
    let description = condition.to_string();
    poll_until(config, &description, move || condition.probe(session)).await
}
