use crate::config::types::{
    AiAgentEntry, Config, CrawlerConfig, OutputConfig, RobotsConfig, SiteConfig, UserAgentConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_robots_config(&config.robots)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_output_config(&config.output)?;
    validate_site_config(&config.site)?;
    validate_ai_agents(&config.ai_agents)?;
    Ok(())
}

/// Validates crawler configuration
///
/// `max_pages` is not rejected here: the crawl budget clamps it to 5..=50.
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_depth < 1 || config.max_depth > 10 {
        return Err(ConfigError::Validation(format!(
            "max_depth must be between 1 and 10, got {}",
            config.max_depth
        )));
    }

    if config.fetch_timeout_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "fetch_timeout_ms must be >= 100ms, got {}ms",
            config.fetch_timeout_ms
        )));
    }

    Ok(())
}

/// Validates robots matching limits
fn validate_robots_config(config: &RobotsConfig) -> Result<(), ConfigError> {
    if config.max_pattern_length < 16 {
        return Err(ConfigError::Validation(format!(
            "max_pattern_length must be >= 16, got {}",
            config.max_pattern_length
        )));
    }

    if config.regex_size_limit < 1024 {
        return Err(ConfigError::Validation(format!(
            "regex_size_limit must be >= 1024 bytes, got {}",
            config.regex_size_limit
        )));
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

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the audited site
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let site = validate_http_url(&config.url, "site url")?;

    for link in &config.known_links {
        let url = site
            .join(link)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid known link '{}': {}", link, e)))?;

        if url.origin() != site.origin() {
            return Err(ConfigError::Validation(format!(
                "Known link '{}' is not on the audited origin {}",
                link,
                site.origin().ascii_serialization()
            )));
        }
    }

    Ok(())
}

/// Validates AI agent entries
fn validate_ai_agents(agents: &[AiAgentEntry]) -> Result<(), ConfigError> {
    for agent in agents {
        if agent.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "ai-agent name cannot be empty".to_string(),
            ));
        }

        if agent.token.trim().is_empty() || agent.token.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "ai-agent '{}' must have a non-empty token without whitespace",
                agent.name
            )));
        }
    }

    Ok(())
}

fn validate_http_url(raw: &str, label: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", label, raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use HTTP or HTTPS",
            label, raw
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::Validation(format!(
            "{} '{}' has no host",
            label, raw
        )));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config {
            crawler: CrawlerConfig {
                max_pages: 20,
                max_depth: 5,
                seed_link_sample: 20,
                fetch_timeout_ms: 5000,
                respect_robots: false,
            },
            robots: RobotsConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "SiteGauge".to_string(),
                crawler_version: "0.1".to_string(),
                contact_url: "https://example.com/bot".to_string(),
            },
            output: OutputConfig {
                database_path: "./sitegauge.db".to_string(),
                summary_path: "./summary.md".to_string(),
            },
            site: SiteConfig {
                url: "https://example.com/".to_string(),
                known_links: vec!["/about".to_string()],
            },
            ai_agents: vec![],
        }
    }

    #[test]
    fn test_valid_config() {
        let config = create_valid_config();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_max_pages_out_of_range_is_not_rejected() {
        let mut config = create_valid_config();
        config.crawler.max_pages = 500;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_max_depth() {
        let mut config = create_valid_config();
        config.crawler.max_depth = 0;
        assert!(validate(&config).is_err());

        config.crawler.max_depth = 11;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_fetch_timeout() {
        let mut config = create_valid_config();
        config.crawler.fetch_timeout_ms = 50;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_pattern_ceiling() {
        let mut config = create_valid_config();
        config.robots.max_pattern_length = 4;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_crawler_name() {
        let mut config = create_valid_config();
        config.user_agent.crawler_name = "Site Gauge!".to_string();
        assert!(validate(&config).is_err());

        config.user_agent.crawler_name = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_contact_url() {
        let mut config = create_valid_config();
        config.user_agent.contact_url = "not a url".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_empty_output_paths() {
        let mut config = create_valid_config();
        config.output.database_path = String::new();
        assert!(validate(&config).is_err());

        let mut config = create_valid_config();
        config.output.summary_path = String::new();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_site_url_must_be_http() {
        let mut config = create_valid_config();
        config.site.url = "ftp://example.com/".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_known_link_must_share_origin() {
        let mut config = create_valid_config();
        config.site.known_links = vec!["https://other.com/page".to_string()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_ai_agent_token_validation() {
        let mut config = create_valid_config();
        config.ai_agents = vec![AiAgentEntry {
            name: "Bot".to_string(),
            token: "Two Words".to_string(),
        }];
        assert!(validate(&config).is_err());

        config.ai_agents[0].token = "GPTBot".to_string();
        assert!(validate(&config).is_ok());
    }
}
