//! Tagging client configuration.
//!
//! Defaults point at the public regional endpoints. Override via environment
//! variables or explicit construction for emulators, signing proxies and
//! tests.

use url::Url;
use zeroize::Zeroizing;

use crate::rate_limit::RateLimitConfig;

/// Placeholder substituted with the routing region in endpoint templates.
pub const REGION_PLACEHOLDER: &str = "{region}";

const DEFAULT_ENDPOINT_TEMPLATE: &str = "https://tagging.{region}.amazonaws.com";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the tagging API clients.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct TaggingConfig {
    /// Endpoint URL template; `{region}` is replaced per client.
    pub endpoint_template: String,
    /// Optional bearer token, sent to signing proxies in front of the service.
    pub api_token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Pacing shared by every call.
    pub rate_limit: RateLimitConfig,
}

impl std::fmt::Debug for TaggingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggingConfig")
            .field("endpoint_template", &self.endpoint_template)
            .field("api_token", &self.api_token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            endpoint_template: DEFAULT_ENDPOINT_TEMPLATE.to_string(),
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl TaggingConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `AWSTAGS_ENDPOINT_TEMPLATE` (default: `https://tagging.{region}.amazonaws.com`)
    /// - `AWSTAGS_API_TOKEN` (optional)
    /// - `AWSTAGS_TIMEOUT_SECS` (default: 30)
    /// - `AWSTAGS_RATE_LIMIT_PER_SEC` (default: 5)
    /// - `AWSTAGS_RATE_LIMIT_BURST` (default: 1)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = RateLimitConfig::default();
        let config = Self {
            endpoint_template: std::env::var("AWSTAGS_ENDPOINT_TEMPLATE")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT_TEMPLATE.to_string()),
            api_token: std::env::var("AWSTAGS_API_TOKEN").ok().map(Zeroizing::new),
            timeout_secs: env_parse("AWSTAGS_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?,
            rate_limit: RateLimitConfig {
                per_second: env_parse("AWSTAGS_RATE_LIMIT_PER_SEC", defaults.per_second)?,
                burst: env_parse("AWSTAGS_RATE_LIMIT_BURST", defaults.burst)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// A configuration routing every region to `{base_url}/{region}` (for
    /// testing against a local mock server).
    pub fn local_mock(base_url: &str) -> Self {
        Self {
            endpoint_template: format!("{}/{REGION_PLACEHOLDER}", base_url.trim_end_matches('/')),
            timeout_secs: 5,
            ..Self::default()
        }
    }

    /// Check the template and rate limit without connecting anywhere.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_for("us-east-1")?;
        self.rate_limit.validate()
    }

    /// Whether requests would go straight to AWS, which rejects unsigned
    /// calls.
    pub fn targets_aws_directly(&self) -> bool {
        self.endpoint_for("us-east-1")
            .ok()
            .and_then(|url| url.host_str().map(|h| h.ends_with(".amazonaws.com")))
            .unwrap_or(false)
    }

    /// Endpoint URL for `region`.
    pub fn endpoint_for(&self, region: &str) -> Result<Url, ConfigError> {
        let valid = !region.is_empty()
            && region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !valid {
            return Err(ConfigError::InvalidRegion(region.to_string()));
        }

        let raw = self.endpoint_template.replace(REGION_PLACEHOLDER, region);
        Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(raw, e.to_string()))
    }
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid region {0:?}")]
    InvalidRegion(String),
    #[error("invalid value for {0}: {1:?}")]
    InvalidValue(String, String),
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_endpoint_is_regional() {
        let cfg = TaggingConfig::default();
        assert_eq!(
            cfg.endpoint_for("eu-west-1").unwrap().as_str(),
            "https://tagging.eu-west-1.amazonaws.com/"
        );
    }

    #[test]
    fn only_aws_hosts_count_as_direct() {
        assert!(TaggingConfig::default().targets_aws_directly());
        assert!(!TaggingConfig::local_mock("http://127.0.0.1:9000").targets_aws_directly());
        let proxied = TaggingConfig {
            endpoint_template: "http://localhost:8080/tagging.{region}.amazonaws.com".into(),
            ..TaggingConfig::default()
        };
        assert!(!proxied.targets_aws_directly());
    }

    #[test]
    fn local_mock_routes_region_into_path() {
        let cfg = TaggingConfig::local_mock("http://127.0.0.1:9000/");
        assert_eq!(
            cfg.endpoint_for("us-east-1").unwrap().as_str(),
            "http://127.0.0.1:9000/us-east-1"
        );
        assert_eq!(cfg.timeout_secs, 5);
    }

    #[test]
    fn rejects_region_that_would_change_the_url() {
        let cfg = TaggingConfig::default();
        for region in ["", "us-east-1/../x", "US-EAST-1", "a.b"] {
            assert_eq!(
                cfg.endpoint_for(region),
                Err(ConfigError::InvalidRegion(region.to_string()))
            );
        }
    }

    #[test]
    fn rejects_unparseable_template() {
        let cfg = TaggingConfig {
            endpoint_template: "not a url {region}".into(),
            ..TaggingConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidUrl(..))));
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = TaggingConfig {
            api_token: Some(Zeroizing::new("secret-token".into())),
            ..TaggingConfig::default()
        };
        let printed = format!("{cfg:?}");
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("secret-token"));
    }

    #[test]
    fn env_parse_uses_default_when_var_absent() {
        assert_eq!(env_parse("AWSTAGS_NONEXISTENT_VAR_12345", 7u64).unwrap(), 7);
    }

    #[test]
    fn env_parse_rejects_garbage() {
        // Temporarily set an invalid number.
        std::env::set_var("AWSTAGS_TEST_BAD_NUMBER", "five");
        let result = env_parse("AWSTAGS_TEST_BAD_NUMBER", 5u64);
        std::env::remove_var("AWSTAGS_TEST_BAD_NUMBER");
        assert_eq!(
            result,
            Err(ConfigError::InvalidValue(
                "AWSTAGS_TEST_BAD_NUMBER".into(),
                "five".into()
            ))
        );
    }
}
