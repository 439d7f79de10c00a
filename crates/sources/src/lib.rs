//! Source adapters for Swedish open data.
//!
//! Each source is a [`ToolProvider`] built from its [`AdapterConfig`]. The
//! adapters return upstream JSON lightly reshaped; the output contract is
//! enforced by the gateway against the schemas published here.

pub mod http;
pub mod riksdagen;
pub mod skatteverket;

use http::SourceBuildError;
use portalconf::{AdapterConfig, SourcesConfig};
use serde::de::DeserializeOwned;
use serde_json::Value;
use switchboard::{AdapterError, RegistryBuilder, RegistryError, ToolProvider};
use thiserror::Error;
use tracing::info;

pub use riksdagen::RiksdagenProvider;
pub use skatteverket::SkatteverketProvider;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Build(#[from] SourceBuildError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Decode already validated arguments into an operation's request type.
pub(crate) fn parse_arguments<T: DeserializeOwned>(arguments: Value) -> Result<T, AdapterError> {
    serde_json::from_value(arguments)
        .map_err(|e| AdapterError::InvalidRequest(format!("invalid arguments: {e}")))
}

/// Build a provider for every enabled source.
pub fn providers(sources: &SourcesConfig) -> Result<Vec<Box<dyn ToolProvider>>, SourceBuildError> {
    let mut providers: Vec<Box<dyn ToolProvider>> = Vec::new();
    if enabled(SourcesConfig::RIKSDAGEN, &sources.riksdagen) {
        providers.push(Box::new(RiksdagenProvider::new(sources.riksdagen.clone())?));
    }
    if enabled(SourcesConfig::SKATTEVERKET, &sources.skatteverket) {
        providers.push(Box::new(SkatteverketProvider::new(
            sources.skatteverket.clone(),
        )?));
    }
    Ok(providers)
}

fn enabled(name: &str, config: &AdapterConfig) -> bool {
    if !config.enabled {
        info!(source = name, "source disabled, skipping");
    }
    config.enabled
}

/// Register every enabled source on `builder`.
pub fn register_enabled(
    builder: &mut RegistryBuilder,
    sources: &SourcesConfig,
) -> Result<usize, AssemblyError> {
    let mut total = 0;
    for provider in providers(sources)? {
        let count = builder.register_provider(provider.as_ref())?;
        info!(prefix = provider.prefix(), tools = count, "📚 registered source");
        total += count;
    }
    Ok(total)
}
