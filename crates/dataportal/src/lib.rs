//! dataportal - an MCP gateway over Swedish open data.
//!
//! Wires the configured source adapters into a [`Gateway`] and exposes it as
//! MCP tools over streamable HTTP or stdio.

pub mod mcp;
pub mod serve;
pub mod stdio;
pub mod telemetry;

use anyhow::{Context, Result};
use portalconf::PortalConfig;
use std::sync::Arc;
use switchboard::{Gateway, Registry};
use tracing::info;

/// Build the registry from every enabled source and wrap it in a gateway.
pub fn build_gateway(config: &PortalConfig) -> Result<Gateway> {
    let mut builder = Registry::builder();
    let count = sources::register_enabled(&mut builder, &config.sources)
        .context("Failed to register sources")?;

    let registry = builder.build();
    info!(
        tools = count,
        providers = ?registry.prefixes(),
        "🗂️  Tool registry ready"
    );
    Ok(Gateway::new(Arc::new(registry)))
}

/// Shared MCP state over a freshly built gateway.
pub fn build_state(config: &PortalConfig) -> Result<Arc<mcp::McpState>> {
    let gateway = build_gateway(config)?;
    Ok(Arc::new(mcp::McpState::new(Arc::new(gateway))))
}
