//! Per-provider adapter settings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Settings shared by every invocation of one source adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Disabled adapters register no tools.
    #[serde(default = "AdapterConfig::default_enabled")]
    pub enabled: bool,

    pub base_url: String,

    /// Upper bound for a whole invocation, retries included.
    /// Default: 30000
    #[serde(default = "AdapterConfig::default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bearer token sent with every upstream request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,

    #[serde(default)]
    pub retry: RetryPolicy,
}

impl AdapterConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_timeout_ms() -> u64 {
        30_000
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            enabled: true,
            base_url: base_url.into(),
            timeout_ms: Self::default_timeout_ms(),
            token: None,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Token::new(token));
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Exponential backoff for retriable upstream failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Additional attempts after the first. Default: 2
    #[serde(default = "RetryPolicy::default_max_retries")]
    pub max_retries: u32,

    /// Default: 250
    #[serde(default = "RetryPolicy::default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Default: 4000
    #[serde(default = "RetryPolicy::default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    fn default_max_retries() -> u32 {
        2
    }

    fn default_initial_backoff_ms() -> u64 {
        250
    }

    fn default_max_backoff_ms() -> u64 {
        4_000
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: Self::default_max_retries(),
            initial_backoff_ms: Self::default_initial_backoff_ms(),
            max_backoff_ms: Self::default_max_backoff_ms(),
        }
    }
}

/// A credential that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub(crate) fn redacted() -> Self {
        Self("***".to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

/// Adapter settings keyed by provider prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "SourcesConfig::default_riksdagen")]
    pub riksdagen: AdapterConfig,

    #[serde(default = "SourcesConfig::default_skatteverket")]
    pub skatteverket: AdapterConfig,
}

impl SourcesConfig {
    pub const RIKSDAGEN: &'static str = "riksdagen";
    pub const SKATTEVERKET: &'static str = "skatteverket";

    fn default_riksdagen() -> AdapterConfig {
        AdapterConfig::new("https://data.riksdagen.se")
    }

    fn default_skatteverket() -> AdapterConfig {
        AdapterConfig::new("https://skatteverket.entryscape.net/rowstore/dataset")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &AdapterConfig)> {
        [
            (Self::RIKSDAGEN, &self.riksdagen),
            (Self::SKATTEVERKET, &self.skatteverket),
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&'static str, &mut AdapterConfig)> {
        [
            (Self::RIKSDAGEN, &mut self.riksdagen),
            (Self::SKATTEVERKET, &mut self.skatteverket),
        ]
        .into_iter()
    }

    pub fn get(&self, name: &str) -> Option<&AdapterConfig> {
        self.iter().find(|(n, _)| *n == name).map(|(_, c)| c)
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            riksdagen: Self::default_riksdagen(),
            skatteverket: Self::default_skatteverket(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 350,
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(350));
        assert_eq!(policy.backoff(40), Duration::from_millis(350));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let config = AdapterConfig::new("http://localhost").with_token("s3cret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("Token(***)"));
        assert_eq!(config.token.as_ref().map(Token::expose), Some("s3cret"));
    }

    #[test]
    fn test_base_trims_trailing_slash() {
        let config = AdapterConfig::new("https://data.riksdagen.se/");
        assert_eq!(config.base(), "https://data.riksdagen.se");
    }

    #[test]
    fn test_sources_lookup() {
        let sources = SourcesConfig::default();
        assert!(sources.get("riksdagen").is_some());
        assert!(sources.get("Riksdagen").is_none());
        assert_eq!(sources.iter().count(), 2);
    }
}
