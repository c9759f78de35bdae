use crate::config::types::{
    AuthConfig, Config, DiscoveryConfig, HarvestConfig, OutputConfig, SessionConfig,
};
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent fetches
const MAX_CONCURRENCY: usize = 16;

/// Validates the entire configuration
///
/// Runs before any network activity; an error here terminates the process.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_publications(&config.publications)?;
    validate_harvest_config(&config.harvest)?;
    validate_session_config(&config.session, &config.harvest)?;
    validate_auth_config(&config.auth, &config.session)?;
    validate_output_config(&config.output)?;
    validate_discovery_config(&config.discovery)?;
    Ok(())
}

/// Validates the publication list
fn validate_publications(publications: &[String]) -> Result<(), ConfigError> {
    if publications.is_empty() {
        return Err(ConfigError::Validation(
            "at least one publication URL is required".to_string(),
        ));
    }

    for publication in publications {
        let url = Url::parse(publication).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid publication URL '{}': {}", publication, e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "Publication URL '{}' must use http or https",
                publication
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Publication URL '{}' has no host",
                publication
            )));
        }
    }

    Ok(())
}

/// Validates crawl pacing configuration
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max-concurrent must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrent
        )));
    }

    if !config.delay_min.is_finite() || config.delay_min < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-min must be a non-negative number, got {}",
            config.delay_min
        )));
    }

    if !config.delay_max.is_finite() || config.delay_max < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay-max must be a non-negative number, got {}",
            config.delay_max
        )));
    }

    if config.delay_min > config.delay_max {
        return Err(ConfigError::Validation(format!(
            "delay-min ({}) cannot be greater than delay-max ({})",
            config.delay_min, config.delay_max
        )));
    }

    Ok(())
}

/// Validates browser session configuration
fn validate_session_config(
    config: &SessionConfig,
    harvest: &HarvestConfig,
) -> Result<(), ConfigError> {
    if config.pool_size == 0 || config.pool_size > harvest.max_concurrent {
        return Err(ConfigError::Validation(format!(
            "pool-size must be between 1 and max-concurrent ({}), got {}",
            harvest.max_concurrent, config.pool_size
        )));
    }

    if config.operation_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "operation-timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(path) = &config.browser_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "browser-path cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates authentication configuration
fn validate_auth_config(config: &AuthConfig, session: &SessionConfig) -> Result<(), ConfigError> {
    if config.manual_login && session.headless {
        return Err(ConfigError::Validation(
            "manual-login requires a visible browser and cannot be combined with headless"
                .to_string(),
        ));
    }

    if config.manual_login && session.pool_size > 1 {
        return Err(ConfigError::Validation(format!(
            "manual-login supports a single browser session, got pool-size {}",
            session.pool_size
        )));
    }

    if config.login || config.manual_login {
        Url::parse(&config.sign_in_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid sign-in-url '{}': {}", config.sign_in_url, e))
        })?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("markdown-dir", &config.markdown_dir),
        ("html-dir", &config.html_dir),
        ("data-dir", &config.data_dir),
    ] {
        if value.is_empty() {
            return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
        }
    }

    Ok(())
}

/// Validates discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.feed_limit == 0 {
        return Err(ConfigError::Validation(
            "feed-limit must be >= 1".to_string(),
        ));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "discovery timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
