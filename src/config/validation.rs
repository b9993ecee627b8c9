use crate::config::types::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_concurrent_pages < 1 || config.max_concurrent_pages > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_pages must be between 1 and 64, got {}",
            config.max_concurrent_pages
        )));
    }

    for (name, secs) in [
        ("navigation_timeout_secs", config.navigation_timeout_secs),
        ("network_idle_timeout_secs", config.network_idle_timeout_secs),
        ("probe_timeout_secs", config.probe_timeout_secs),
        ("scroll_timeout_secs", config.scroll_timeout_secs),
    ] {
        if secs < 1 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1s, got {}s",
                name, secs
            )));
        }
    }

    if config.scroll_step_px < 1 {
        return Err(ConfigError::Validation(
            "scroll_step_px must be >= 1".to_string(),
        ));
    }

    if config.viewport_height_px < 1 {
        return Err(ConfigError::Validation(
            "viewport_height_px must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
///
/// The assembled `User-Agent` value must be sendable as an HTTP header.
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    let is_token = |s: &str| {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };

    if !is_token(&config.crawler_name) {
        return Err(ConfigError::Validation(format!(
            "crawler_name must be a non-empty product token, got '{}'",
            config.crawler_name
        )));
    }
    if !is_token(&config.crawler_version) {
        return Err(ConfigError::Validation(format!(
            "crawler_version must be a non-empty product token, got '{}'",
            config.crawler_version
        )));
    }

    let contact = Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("contact_url: {}", e)))?;
    if !matches!(contact.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "contact_url must be http(s), got {}",
            config.contact_url
        )));
    }

    match config.contact_email.split_once('@') {
        Some((user, host)) if !user.is_empty() && host.contains('.') => {}
        _ => {
            return Err(ConfigError::Validation(format!(
                "contact_email is not an address: '{}'",
                config.contact_email
            )))
        }
    }

    reqwest::header::HeaderValue::from_str(&config.header_value()).map_err(|_| {
        ConfigError::Validation("user agent contains characters not allowed in a header".to_string())
    })?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    if config.report_path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "report_path cannot be empty".to_string(),
        ));
    }
    if config.database_path == config.report_path {
        return Err(ConfigError::Validation(
            "report_path would overwrite the database".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_crawler_config_is_valid() {
        assert!(validate_crawler_config(&CrawlerConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = CrawlerConfig {
            max_concurrent_pages: 0,
            ..CrawlerConfig::default()
        };
        assert!(matches!(
            validate_crawler_config(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = CrawlerConfig {
            probe_timeout_secs: 0,
            ..CrawlerConfig::default()
        };
        let err = validate_crawler_config(&config).unwrap_err();
        assert!(err.to_string().contains("probe_timeout_secs"));
    }

    #[test]
    fn test_zero_page_budget_rejected() {
        let config = CrawlerConfig {
            max_pages: 0,
            ..CrawlerConfig::default()
        };
        assert!(validate_crawler_config(&config).is_err());
    }

    fn user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "ResourceAudit".to_string(),
            crawler_version: "0.1".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_user_agent_accepted() {
        assert!(validate_user_agent_config(&user_agent()).is_ok());
    }

    #[test]
    fn test_user_agent_name_must_be_token() {
        let mut config = user_agent();
        config.crawler_name = "Resource Audit".to_string();
        assert!(validate_user_agent_config(&config).is_err());
        config.crawler_name = String::new();
        assert!(validate_user_agent_config(&config).is_err());
    }

    #[test]
    fn test_contact_checks() {
        let mut config = user_agent();
        config.contact_url = "ftp://example.com".to_string();
        assert!(matches!(
            validate_user_agent_config(&config),
            Err(ConfigError::InvalidUrl(_))
        ));

        let mut config = user_agent();
        for bad in ["", "admin", "@example.com", "admin@localhost"] {
            config.contact_email = bad.to_string();
            assert!(validate_user_agent_config(&config).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_report_cannot_replace_database() {
        let config = OutputConfig {
            database_path: "./audit.db".to_string(),
            report_path: "./audit.db".to_string(),
        };
        assert!(validate_output_config(&config).is_err());
    }
}
