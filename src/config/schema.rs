use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Browser-like user agent. The storefront CDN rejects bot-looking clients,
/// so both Chrome and the API client present the same identity.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub target: TargetSettings,

    #[serde(default)]
    pub browser: BrowserSettings,

    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub pricing: PricingSettings,

    #[serde(default)]
    pub report: ReportSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    /// Free-form environment tag (local, ci, staging)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target: TargetSettings::default(),
            browser: BrowserSettings::default(),
            api: ApiSettings::default(),
            pricing: PricingSettings::default(),
            report: ReportSettings::default(),
            logging: LoggingSettings::default(),
            environment: default_environment(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetSettings {
    /// Storefront origin used by page objects
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Origin for backend JSON endpoints
    #[serde(default = "default_base_url")]
    pub api_base_url: String,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_base_url: default_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BrowserSettings {
    /// Chrome executable; `None` means discover it on the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Default explicit wait for element lookups, in seconds
    #[serde(default = "default_explicit_wait")]
    pub explicit_wait_secs: u64,

    #[serde(default = "default_page_load_timeout")]
    pub page_load_timeout_secs: u64,

    /// DevTools HTTP endpoint of an already running browser
    /// (e.g. "http://chrome:9222"). Empty means launch locally.
    #[serde(default)]
    pub remote_endpoint: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Extra Chrome arguments
    #[serde(default)]
    pub custom_args: Vec<String>,
}

impl BrowserSettings {
    pub fn explicit_wait(&self) -> Duration {
        Duration::from_secs(self.explicit_wait_secs)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            window_width: default_window_width(),
            window_height: default_window_height(),
            explicit_wait_secs: default_explicit_wait(),
            page_load_timeout_secs: default_page_load_timeout(),
            remote_endpoint: String::new(),
            user_agent: default_user_agent(),
            custom_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSettings {
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// Transport-level retries for 500/502/503/504 and connection errors
    #[serde(default = "default_api_max_retries")]
    pub max_retries: u32,

    /// Exponential backoff factor in seconds
    #[serde(default = "default_api_retry_backoff")]
    pub retry_backoff_secs: f64,
}

impl ApiSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_api_timeout(),
            max_retries: default_api_max_retries(),
            retry_backoff_secs: default_api_retry_backoff(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingSettings {
    /// Absolute tolerance, in currency units, for price reconciliation
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSettings {
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    #[serde(default = "default_true")]
    pub screenshot_on_failure: bool,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            report_dir: default_report_dir(),
            screenshot_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::Json,
        }
    }
}

fn default_base_url() -> String {
    "https://www.nykaa.com".to_string()
}

fn default_environment() -> String {
    "local".to_string()
}

fn default_true() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_explicit_wait() -> u64 {
    15
}

fn default_page_load_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_api_timeout() -> u64 {
    15
}

fn default_api_max_retries() -> u32 {
    2
}

fn default_api_retry_backoff() -> f64 {
    1.0
}

fn default_tolerance() -> f64 {
    crate::reconcile::DEFAULT_PRICE_TOLERANCE
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

fn default_log_level() -> String {
    "info".to_string()
}
