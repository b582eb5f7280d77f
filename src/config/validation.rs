use crate::config::schema::Settings;
use crate::error::{AutomationError, Result};

/// Validate settings once at startup, before any browser or HTTP work.
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_url("target.base_url", &settings.target.base_url)?;
    validate_url("target.api_base_url", &settings.target.api_base_url)?;

    let browser = &settings.browser;
    if browser.window_width == 0 || browser.window_height == 0 {
        return Err(AutomationError::Config(format!(
            "Window size must be non-zero, got {}x{}",
            browser.window_width, browser.window_height
        )));
    }

    if browser.explicit_wait_secs == 0 {
        return Err(AutomationError::Config(
            "browser.explicit_wait_secs must be greater than zero".to_string(),
        ));
    }

    if browser.page_load_timeout_secs == 0 {
        return Err(AutomationError::Config(
            "browser.page_load_timeout_secs must be greater than zero".to_string(),
        ));
    }

    if !browser.remote_endpoint.is_empty() {
        validate_url("browser.remote_endpoint", &browser.remote_endpoint)?;
    }

    if settings.api.timeout_secs == 0 {
        return Err(AutomationError::Config(
            "api.timeout_secs must be greater than zero".to_string(),
        ));
    }

    let backoff = settings.api.retry_backoff_secs;
    if !backoff.is_finite() || backoff < 0.0 {
        return Err(AutomationError::Config(format!(
            "api.retry_backoff_secs must be a non-negative number, got {}",
            backoff
        )));
    }

    let tolerance = settings.pricing.tolerance;
    if !tolerance.is_finite() || tolerance < 0.0 {
        return Err(AutomationError::Config(format!(
            "pricing.tolerance must be a non-negative number, got {}",
            tolerance
        )));
    }

    if settings.logging.level.trim().is_empty() {
        return Err(AutomationError::Config(
            "logging.level cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_url(field: &str, url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(AutomationError::Config(format!("{} cannot be empty", field)));
    }

    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(AutomationError::Config(format!(
            "Invalid {}: {}. Must start with http:// or https://",
            field, url
        )));
    }

    Ok(())
}
