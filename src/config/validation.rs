use crate::config::types::{Config, CrawlerConfig, OutputConfig, SectionDiscovery, SiteConfig, UserAgentConfig};
use crate::hierarchy::NodeKind;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_site_config(&config.site, config.crawler.section_discovery)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.content_timeout == 0 {
        return Err(ConfigError::Validation(
            "content_timeout must be at least 1ms".to_string(),
        ));
    }

    if config.listing_timeout == 0 {
        return Err(ConfigError::Validation(
            "listing_timeout must be at least 1ms".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the target site description
fn validate_site_config(
    config: &SiteConfig,
    discovery: SectionDiscovery,
) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "site name cannot be empty".to_string(),
        ));
    }

    validate_http_url("root_url", &config.root_url)?;
    validate_http_url("base_url", &config.base_url)?;
    validate_levels(&config.levels)?;

    if discovery == SectionDiscovery::Worker && !config.levels.contains(&NodeKind::Chapter) {
        return Err(ConfigError::Validation(
            "worker section discovery needs a 'chapter' level".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}

/// Levels must descend strictly and end at sections
fn validate_levels(levels: &[NodeKind]) -> Result<(), ConfigError> {
    let Some(last) = levels.last() else {
        return Err(ConfigError::Validation(
            "levels cannot be empty".to_string(),
        ));
    };

    if *last != NodeKind::Section {
        return Err(ConfigError::Validation(format!(
            "levels must end with 'section', got '{}'",
            last.as_str()
        )));
    }

    for pair in levels.windows(2) {
        if pair[0].depth() >= pair[1].depth() {
            return Err(ConfigError::Validation(format!(
                "levels must descend part > title > chapter > section, got '{}' before '{}'",
                pair[0].as_str(),
                pair[1].as_str()
            )));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || domain.is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
