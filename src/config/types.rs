use crate::auth::Credentials;
use serde::Deserialize;

/// Default sign-in surface of the publication platform
pub const DEFAULT_SIGN_IN_URL: &str = "https://substack.com/sign-in";

/// Main configuration structure for Press-Harvest
///
/// Every section has defaults, so an empty file (or no file at all) yields a
/// runnable configuration once publications are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URLs of the publications to harvest
    pub publications: Vec<String>,
    pub harvest: HarvestConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
    pub output: OutputConfig,
    pub discovery: DiscoveryConfig,
}

/// Crawl pacing and mode configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Maximum number of posts to fetch per publication run (0 = no cap)
    #[serde(rename = "max-items")]
    pub max_items: usize,

    /// Maximum number of fetches in flight at once
    #[serde(rename = "max-concurrent")]
    pub max_concurrent: usize,

    /// Lower bound of the randomized delay before each fetch (seconds)
    #[serde(rename = "delay-min")]
    pub delay_min: f64,

    /// Upper bound of the randomized delay before each fetch (seconds)
    #[serde(rename = "delay-max")]
    pub delay_max: f64,

    /// Only materialize posts newer than the stored watermark
    pub continuous: bool,

    /// Repeat the whole harvest every N minutes (0 = run once)
    #[serde(rename = "interval-minutes")]
    pub interval_minutes: u64,

    /// URLs containing any of these substrings are never fetched
    #[serde(rename = "exclude-keywords")]
    pub exclude_keywords: Vec<String>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_items: 0,
            max_concurrent: 3,
            delay_min: 1.0,
            delay_max: 3.0,
            continuous: false,
            interval_minutes: 0,
            exclude_keywords: vec![
                "about".to_string(),
                "archive".to_string(),
                "podcast".to_string(),
            ],
        }
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub headless: bool,

    /// Explicit Chrome/Chromium executable
    #[serde(rename = "browser-path")]
    pub browser_path: Option<String>,

    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    /// Number of independent browser sessions (1 = one serialized session)
    #[serde(rename = "pool-size")]
    pub pool_size: usize,

    /// Upper bound on any single browser operation (seconds)
    #[serde(rename = "operation-timeout-secs")]
    pub operation_timeout_secs: u64,

    /// Wait after navigation for client-side rendering to finish (milliseconds)
    #[serde(rename = "settle-delay-ms")]
    pub settle_delay_ms: u64,

    /// Consecutive relaunch attempts before a session is declared failed
    #[serde(rename = "max-reconnect-attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: false,
            browser_path: None,
            user_agent: None,
            pool_size: 1,
            operation_timeout_secs: 30,
            settle_delay_ms: 3000,
            max_reconnect_attempts: 1,
        }
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Log in with email and password before harvesting
    pub login: bool,

    /// Let the operator log in by hand in a visible browser window
    #[serde(rename = "manual-login")]
    pub manual_login: bool,

    pub email: Option<String>,
    pub password: Option<String>,

    #[serde(rename = "sign-in-url")]
    pub sign_in_url: String,

    /// How long to look for evidence of a successful login (seconds)
    #[serde(rename = "confirm-timeout-secs")]
    pub confirm_timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login: false,
            manual_login: false,
            email: None,
            password: None,
            sign_in_url: DEFAULT_SIGN_IN_URL.to_string(),
            confirm_timeout_secs: 10,
        }
    }
}

impl AuthConfig {
    /// Returns credentials when programmatic login is enabled and both parts are present
    pub fn credentials(&self) -> Option<Credentials> {
        if !self.login {
            return None;
        }
        match (&self.email, &self.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some(Credentials::new(email.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

/// Output directory configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for markdown artifacts and state files
    #[serde(rename = "markdown-dir")]
    pub markdown_dir: String,

    /// Root directory for HTML artifacts
    #[serde(rename = "html-dir")]
    pub html_dir: String,

    /// Directory for the aggregated per-publication JSON results
    #[serde(rename = "data-dir")]
    pub data_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            markdown_dir: "substack_md_files".to_string(),
            html_dir: "substack_html_pages".to_string(),
            data_dir: "data".to_string(),
        }
    }
}

/// Sitemap/feed discovery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Timeout for each discovery request (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Number of most recent feed items used when the sitemap is unavailable
    #[serde(rename = "feed-limit")]
    pub feed_limit: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            feed_limit: 22,
        }
    }
}
