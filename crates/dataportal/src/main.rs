//! dataportal - MCP gateway over Swedish open data
//!
//! Subcommands:
//! - `dataportal serve` - Run the MCP gateway over streamable HTTP
//! - `dataportal stdio` - Run the MCP gateway over stdin/stdout
//! - `dataportal tools` - List registered tools and their schemas
//! - `dataportal config` - Print the effective configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use portalconf::PortalConfig;
use std::path::PathBuf;

use dataportal::{build_gateway, build_state, serve, stdio, telemetry};

#[derive(Parser)]
#[command(name = "dataportal")]
#[command(about = "MCP gateway over Swedish open data")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP gateway over streamable HTTP
    Serve {
        /// HTTP port to bind (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Config file used in place of ./dataportal.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// OTLP gRPC endpoint for OpenTelemetry (e.g., "localhost:4317")
        #[arg(long)]
        otlp_endpoint: Option<String>,
    },

    /// Run the MCP gateway over newline-delimited stdin/stdout
    Stdio {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List registered tools with their input and output schemas
    Tools {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration (tokens redacted)
    Config {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load(path: Option<&PathBuf>) -> Result<PortalConfig> {
    let (config, sources) = PortalConfig::load_with_sources_from(path.map(PathBuf::as_path))
        .context("Failed to load configuration")?;
    tracing::debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            config,
            otlp_endpoint,
        } => {
            let mut config = load(config.as_ref())?;
            if let Some(port) = port {
                config.bind.http_port = port;
            }
            if otlp_endpoint.is_some() {
                config.telemetry.otlp_endpoint = otlp_endpoint;
            }

            telemetry::init(
                &config.telemetry.log_level,
                config.telemetry.otlp_endpoint.as_deref(),
                true,
            )
            .context("Failed to initialize telemetry")?;

            tracing::info!("🇸🇪 dataportal MCP gateway starting");
            tracing::info!("   Bind: {}", config.bind.addr());

            let state = build_state(&config)?;
            let result = serve::run(state, &config.bind.addr()).await;
            telemetry::shutdown();
            result
        }

        Commands::Stdio { config } => {
            let config = load(config.as_ref())?;
            telemetry::init(
                &config.telemetry.log_level,
                config.telemetry.otlp_endpoint.as_deref(),
                false,
            )
            .context("Failed to initialize telemetry")?;

            let state = build_state(&config)?;
            let result = stdio::run(state).await;
            telemetry::shutdown();
            result
        }

        Commands::Tools { config } => {
            let config = load(config.as_ref())?;
            let gateway = build_gateway(&config)?;

            for tool in gateway.registry().descriptors() {
                println!("{}", tool.name);
                if let Some(title) = &tool.title {
                    println!("  {title}");
                }
                println!("  {}", tool.description);
                println!(
                    "  input:  {}",
                    serde_json::to_string(&tool.input_schema).unwrap_or_default()
                );
                println!(
                    "  output: {}",
                    serde_json::to_string(&tool.output_schema).unwrap_or_default()
                );
                println!();
            }
            Ok(())
        }

        Commands::Config { config } => {
            let config = load(config.as_ref())?;
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}
