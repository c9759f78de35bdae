//! Configuration module for Press-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! CLI flags are layered on top by the binary before [`validate`] runs.
//!
//! # Example
//!
//! ```no_run
//! use press_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting with concurrency {}", config.harvest.max_concurrent);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    AuthConfig, Config, DiscoveryConfig, HarvestConfig, OutputConfig, SessionConfig,
    DEFAULT_SIGN_IN_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

pub use validation::validate;
