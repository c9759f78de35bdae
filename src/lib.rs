//! Press-Harvest: an incremental article harvester
//!
//! This crate harvests the posts of one or more author publications by rendering
//! each page in a controlled browser session, converting the extracted content to
//! markdown and HTML artifacts, and persisting enough state to make repeated runs
//! idempotent.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod output;
pub mod session;
pub mod state;
pub mod storage;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Press-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Browser session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Browser session disconnected: {0}")]
    Disconnected(String),

    #[error("Session operation '{operation}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Session pool is closed")]
    PoolClosed,

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Session could not be recreated after {attempts} attempt(s)")]
    Unrecoverable { attempts: u32 },
}

impl SessionError {
    /// Returns true when the error means the underlying browser connection is gone
    ///
    /// Timeouts are deliberately excluded: a slow page is not a dead session.
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            SessionError::Disconnected(_) | SessionError::Unrecoverable { .. }
        )
    }
}

/// Errors raised while pulling post fields out of rendered HTML
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No content container found on {url}")]
    MissingContent { url: String },
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Result type alias for Press-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for browser session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Coordinator;
pub use output::RunSummary;
pub use state::{FetchOutcome, ScrapeState};
pub use url::{publication_name, slug_from_url};
