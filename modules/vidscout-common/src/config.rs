use std::env;

use crate::error::ResearchError;
use crate::types::DEFAULT_PAGES_TO_CRAWL;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TRANSCRIPT_API_URL: &str = "http://localhost:8082/get-transcript";

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    // Language model
    pub openai_api_key: Option<String>,
    pub openai_model: String,

    // Sources
    pub apify_token: Option<String>,
    pub transcript_api_url: String,
    pub crawl_pages_default: u32,

    // Web server
    pub api_host: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Missing credentials are allowed; the pieces that need them degrade at
    /// request time. Malformed numbers are a configuration error.
    pub fn from_env() -> Result<Self, ResearchError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ResearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            apify_token: get("APIFY_TOKEN"),
            transcript_api_url: get("TRANSCRIPT_API_URL")
                .unwrap_or_else(|| DEFAULT_TRANSCRIPT_API_URL.to_string()),
            crawl_pages_default: parse_or("CRAWL_PAGES_DEFAULT", get("CRAWL_PAGES_DEFAULT"), DEFAULT_PAGES_TO_CRAWL)?,
            api_host: get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: parse_or("API_PORT", get("API_PORT"), 3000)?,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "[REDACTED]"))
            .field("openai_model", &self.openai_model)
            .field("apify_token", &self.apify_token.as_ref().map(|_| "[REDACTED]"))
            .field("transcript_api_url", &self.transcript_api_url)
            .field("crawl_pages_default", &self.crawl_pages_default)
            .field("api_host", &self.api_host)
            .field("api_port", &self.api_port)
            .finish()
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, ResearchError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ResearchError::Config(format!("{key} must be a number, got {raw:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ResearchError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.openai_api_key.is_none());
        assert!(config.apify_token.is_none());
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.transcript_api_url, DEFAULT_TRANSCRIPT_API_URL);
        assert_eq!(config.crawl_pages_default, 2);
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "  "), ("CRAWL_PAGES_DEFAULT", "")]).unwrap();
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.crawl_pages_default, 2);
    }

    #[test]
    fn overrides_are_read() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("APIFY_TOKEN", "apify-test"),
            ("CRAWL_PAGES_DEFAULT", "4"),
            ("API_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.crawl_pages_default, 4);
        assert_eq!(config.api_port, 8080);
    }

    #[test]
    fn malformed_number_is_config_error() {
        let err = config_from(&[("API_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ResearchError::Config(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-secret")]).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
    }
}
