//! Failure screenshots under `<report_dir>/screenshots/`.

use crate::browser::BrowserSession;
use chrono::{DateTime, Local};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn unsafe_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_-]").expect("hardcoded regex"))
}

/// Replace everything but ASCII letters, digits, `_` and `-` with `_`.
pub fn sanitize_name(name: &str) -> String {
    unsafe_chars().replace_all(name, "_").into_owned()
}

/// `<report_dir>/screenshots/<name>_<YYYYmmdd_HHMMSS>.png`
pub fn screenshot_path(report_dir: &Path, name: &str, now: DateTime<Local>) -> PathBuf {
    report_dir.join("screenshots").join(format!(
        "{}_{}.png",
        sanitize_name(name),
        now.format("%Y%m%d_%H%M%S")
    ))
}

/// Save a screenshot of the active window.
///
/// Never fails: a capture error is logged and yields `None`, so a broken
/// browser cannot mask the failure being recorded.
pub async fn capture_screenshot<S>(session: &S, report_dir: &Path, name: &str) -> Option<PathBuf>
where
    S: BrowserSession + ?Sized,
{
    let path = screenshot_path(report_dir, name, Local::now());
    match session.save_screenshot(&path).await {
        Ok(()) => {
            tracing::info!("Screenshot captured: {}", path.display());
            Some(path)
        }
        Err(e) => {
            tracing::warn!("Failed to capture screenshot: {}", e);
            None
        }
    }
}
