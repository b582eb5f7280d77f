use crate::config::schema::{LogFormat, Settings};
use crate::config::validation::validate_settings;
use crate::error::{AutomationError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Prefix for every environment override, e.g. `AUTO_BASE_URL`.
pub const ENV_PREFIX: &str = "AUTO_";

const LOCAL_CONFIG_FILE: &str = "e2e.toml";

/// Resolve the settings file: `AUTO_CONFIG`, then `./e2e.toml`, then the
/// platform config directory.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(format!("{}CONFIG", ENV_PREFIX)) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|p| p.join("storefront-e2e"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Load settings for this process: file, then `AUTO_*` overrides, then
/// validation. The result is read-only for the rest of the run.
pub fn load_settings() -> Result<Settings> {
    let mut settings = load_settings_from(&get_config_path())?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Read a TOML settings file. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        tracing::info!("Settings file not found at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        AutomationError::Config(format!("Failed to read settings from {:?}: {}", path, e))
    })?;

    let settings: Settings = toml::from_str(&content)?;

    tracing::info!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Apply `AUTO_*` overrides. `lookup` receives the full variable name.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(v) = get("BASE_URL") {
        settings.target.base_url = v;
    }
    if let Some(v) = get("API_BASE_URL") {
        settings.target.api_base_url = v;
    }
    if let Some(v) = get("CHROME_PATH") {
        settings.browser.chrome_path = Some(PathBuf::from(v));
    }
    if let Some(v) = get("HEADLESS") {
        settings.browser.headless = parse_bool("HEADLESS", &v)?;
    }
    if let Some(v) = get("WINDOW_WIDTH") {
        settings.browser.window_width = parse_value("WINDOW_WIDTH", &v)?;
    }
    if let Some(v) = get("WINDOW_HEIGHT") {
        settings.browser.window_height = parse_value("WINDOW_HEIGHT", &v)?;
    }
    if let Some(v) = get("EXPLICIT_WAIT") {
        settings.browser.explicit_wait_secs = parse_value("EXPLICIT_WAIT", &v)?;
    }
    if let Some(v) = get("PAGE_LOAD_TIMEOUT") {
        settings.browser.page_load_timeout_secs = parse_value("PAGE_LOAD_TIMEOUT", &v)?;
    }
    if let Some(v) = get("REMOTE_ENDPOINT") {
        settings.browser.remote_endpoint = v;
    }
    if let Some(v) = get("API_TIMEOUT") {
        settings.api.timeout_secs = parse_value("API_TIMEOUT", &v)?;
    }
    if let Some(v) = get("API_MAX_RETRIES") {
        settings.api.max_retries = parse_value("API_MAX_RETRIES", &v)?;
    }
    if let Some(v) = get("API_RETRY_BACKOFF") {
        settings.api.retry_backoff_secs = parse_value("API_RETRY_BACKOFF", &v)?;
    }
    if let Some(v) = get("PRICE_TOLERANCE") {
        settings.pricing.tolerance = parse_value("PRICE_TOLERANCE", &v)?;
    }
    if let Some(v) = get("REPORT_DIR") {
        settings.report.report_dir = PathBuf::from(v);
    }
    if let Some(v) = get("SCREENSHOT_ON_FAILURE") {
        settings.report.screenshot_on_failure = parse_bool("SCREENSHOT_ON_FAILURE", &v)?;
    }
    if let Some(v) = get("LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = get("LOG_FORMAT") {
        settings.logging.format = match v.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "text" => LogFormat::Text,
            other => {
                return Err(AutomationError::Config(format!(
                    "{}LOG_FORMAT must be json or text, got {}",
                    ENV_PREFIX, other
                )))
            }
        };
    }
    if let Some(v) = get("ENVIRONMENT") {
        settings.environment = v;
    }

    Ok(())
}

fn parse_value<T: FromStr>(name: &str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| {
        AutomationError::Config(format!("Invalid value for {}{}: {:?}", ENV_PREFIX, name, raw))
    })
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AutomationError::Config(format!(
            "Invalid boolean for {}{}: {:?}",
            ENV_PREFIX, name, raw
        ))),
    }
}
