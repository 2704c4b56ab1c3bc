use crate::config::types::{
    Config, NotifyConfig, NotifyTransport, SourceConfig, StoreConfig, UserAgentConfig, WatchConfig,
    MAX_LEASE_SECONDS,
};
use crate::listing::is_size_token;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_source_config(&config.source)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_watch_config(&config.watch)?;
    validate_store_config(&config.store)?;
    validate_notify_config(&config.notify)?;
    Ok(())
}

/// Validates the watched page settings
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    validate_http_url("url", &config.url)?;

    if let Some(base_url) = &config.base_url {
        validate_http_url("base-url", base_url)?;
    }

    if config.unit_selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "unit-selector cannot be empty".to_string(),
        ));
    }

    Selector::parse(&config.unit_selector).map_err(|e| {
        ConfigError::Validation(format!(
            "unit-selector '{}' is not a valid CSS selector: {:?}",
            config.unit_selector, e
        ))
    })?;

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler-name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;

    validate_email("contact-email", &config.contact_email)?;

    Ok(())
}

/// Validates change-detection settings
fn validate_watch_config(config: &WatchConfig) -> Result<(), ConfigError> {
    if config.target_sizes.is_empty() {
        return Err(ConfigError::Validation(
            "target-sizes must list at least one size".to_string(),
        ));
    }

    if let Some(bad) = config.target_sizes.iter().find(|size| !is_size_token(size)) {
        return Err(ConfigError::Validation(format!(
            "target size '{}' must look like '3+1'",
            bad
        )));
    }

    if config.lease_seconds > MAX_LEASE_SECONDS {
        return Err(ConfigError::Validation(format!(
            "lease-seconds must be at most {}, got {}",
            MAX_LEASE_SECONDS, config.lease_seconds
        )));
    }

    Ok(())
}

/// Validates snapshot storage settings
fn validate_store_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.path().trim().is_empty() {
        return Err(ConfigError::Validation(
            "store path cannot be empty".to_string(),
        ));
    }

    if let StoreConfig::Sqlite { history, .. } = config {
        if *history < 1 {
            return Err(ConfigError::Validation(format!(
                "store history must be >= 1, got {}",
                history
            )));
        }
    }

    Ok(())
}

/// Validates notification settings
fn validate_notify_config(config: &NotifyConfig) -> Result<(), ConfigError> {
    if config.subject.chars().any(char::is_control) {
        return Err(ConfigError::Validation(
            "subject cannot contain line breaks or control characters".to_string(),
        ));
    }

    match &config.transport {
        NotifyTransport::Log => return Ok(()),
        NotifyTransport::MailDrop { directory } => {
            if directory.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "mail-drop directory cannot be empty".to_string(),
                ));
            }
        }
        NotifyTransport::Http {
            endpoint,
            api_key_env,
        } => {
            validate_http_url("endpoint", endpoint)?;
            if api_key_env.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "api-key-env cannot be empty".to_string(),
                ));
            }
        }
    }

    validate_email("from", &config.from)?;

    if config.to.is_empty() {
        return Err(ConfigError::Validation(format!(
            "{} notifications need at least one recipient in 'to'",
            config.transport.name()
        )));
    }

    for recipient in &config.to {
        validate_email("to", recipient)?;
    }

    Ok(())
}

/// Validates that `value` parses as an http or https URL
fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(field: &str, email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    if email.chars().any(|c| c.is_whitespace() || c.is_control() || !c.is_ascii()) {
        return Err(ConfigError::Validation(format!(
            "{} must be a plain ASCII address without spaces: '{}'",
            field, email
        )));
    }

    // Basic email format check: must contain @ and have text on both sides
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format in {}: '{}'",
            field, email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format in {}: '{}'",
            field, email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain in {}: '{}'",
            field, email
        )));
    }

    Ok(())
}
