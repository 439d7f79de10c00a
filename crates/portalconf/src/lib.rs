//! Configuration loading for the dataportal gateway.
//!
//! Configuration is read once at process start and is read-only afterwards.
//! Every source adapter receives its own [`AdapterConfig`] by value; nothing
//! in the running gateway mutates configuration.
//!
//! # Config File Locations
//!
//! Files are loaded in order (later wins, tables merge key by key):
//! 1. `/etc/dataportal/config.toml` (system)
//! 2. `~/.config/dataportal/config.toml` (user)
//! 3. `./dataportal.toml` or the `--config` path (local override)
//! 4. Environment variables (`DATAPORTAL_*`)
//!
//! # Example Config
//!
//! ```toml
//! [bind]
//! host = "127.0.0.1"
//! http_port = 8090
//!
//! [telemetry]
//! otlp_endpoint = "127.0.0.1:4317"
//! log_level = "info"
//!
//! [sources.riksdagen]
//! base_url = "https://data.riksdagen.se"
//! timeout_ms = 30000
//!
//! [sources.skatteverket.retry]
//! max_retries = 3
//! ```

pub mod infra;
pub mod loader;
pub mod source;

pub use infra::{BindConfig, TelemetryConfig};
pub use loader::{discover_config_files_with_override, ConfigSources};
pub use source::{AdapterConfig, RetryPolicy, SourcesConfig, Token};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PortalConfig {
    #[serde(default)]
    pub bind: BindConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// One section per upstream data provider.
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl PortalConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(None)?;
        Ok(config)
    }

    /// Load configuration with an optional CLI path replacing `./dataportal.toml`.
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let (config, _sources) = Self::load_with_sources_from(config_path)?;
        Ok(config)
    }

    /// Load configuration and report which files and variables contributed.
    pub fn load_with_sources_from(
        config_path: Option<&Path>,
    ) -> Result<(Self, ConfigSources), ConfigError> {
        let files = loader::discover_config_files_with_override(config_path);
        let (mut config, mut sources) = loader::load_files(&files)?;

        loader::apply_env_overrides(&mut config, &mut sources);
        config.validate()?;

        Ok((config, sources))
    }

    /// Reject values that would make an adapter unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, source) in self.sources.iter() {
            if source.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "sources.{name}.base_url must not be empty"
                )));
            }
            if source.timeout_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "sources.{name}.timeout_ms must be greater than zero"
                )));
            }
            if source.retry.initial_backoff_ms > source.retry.max_backoff_ms {
                return Err(ConfigError::Invalid(format!(
                    "sources.{name}.retry.initial_backoff_ms exceeds max_backoff_ms"
                )));
            }
        }
        Ok(())
    }

    /// Serialize config to TOML with tokens redacted.
    pub fn to_toml(&self) -> String {
        let mut redacted = self.clone();
        for (_, source) in redacted.sources.iter_mut() {
            if source.token.is_some() {
                source.token = Some(Token::redacted());
            }
        }

        let body = toml::to_string_pretty(&redacted)
            .unwrap_or_else(|e| format!("# failed to render config: {e}\n"));
        format!("# dataportal configuration\n\n{body}")
    }
}
