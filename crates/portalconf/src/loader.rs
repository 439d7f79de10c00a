//! Config file discovery, loading, and environment variable overlay.

use crate::{ConfigError, PortalConfig, Token};
use std::env;
use std::path::{Path, PathBuf};

/// Information about where config values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Config files that were loaded (in order)
    pub files: Vec<PathBuf>,
    /// Environment variables that overrode config values
    pub env_overrides: Vec<String>,
}

/// Discover config files, optionally with a CLI override path.
///
/// If `cli_path` is provided and exists, it replaces the local override.
/// Returns paths in load order (system, user, local/cli).
pub fn discover_config_files_with_override(cli_path: Option<&Path>) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let system = PathBuf::from("/etc/dataportal/config.toml");
    if system.exists() {
        files.push(system);
    }

    // XDG_CONFIG_HOME or ~/.config
    if let Some(config_dir) = directories::BaseDirs::new().map(|d| d.config_dir().to_path_buf()) {
        let user = config_dir.join("dataportal/config.toml");
        if user.exists() {
            files.push(user);
        }
    }

    if let Some(path) = cli_path {
        if path.exists() {
            files.push(path.to_path_buf());
            return files;
        }
    }

    let local = PathBuf::from("dataportal.toml");
    if local.exists() {
        files.push(local);
    }

    files
}

/// Load and merge the given files on top of the compiled defaults.
pub fn load_files(files: &[PathBuf]) -> Result<(PortalConfig, ConfigSources), ConfigError> {
    let mut sources = ConfigSources::default();
    let mut merged = defaults_table()?;

    for path in files {
        let table = load_table_from_file(path)?;
        merge_tables(&mut merged, table);
        sources.files.push(path.clone());
    }

    let config: PortalConfig = toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse {
            path: files.last().cloned().unwrap_or_default(),
            message: e.to_string(),
        })?;

    Ok((config, sources))
}

fn defaults_table() -> Result<toml::Table, ConfigError> {
    match toml::Value::try_from(PortalConfig::default()) {
        Ok(toml::Value::Table(table)) => Ok(table),
        Ok(_) => Err(ConfigError::Invalid("defaults are not a table".to_string())),
        Err(e) => Err(ConfigError::Invalid(e.to_string())),
    }
}

/// Read a TOML file into a raw table.
pub fn load_table_from_file(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    contents.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Merge `overlay` into `base` key by key; nested tables merge recursively.
pub fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Apply environment variable overrides to config.
pub fn apply_env_overrides(config: &mut PortalConfig, sources: &mut ConfigSources) {
    apply_overrides(config, sources, env::vars());
}

/// Apply `DATAPORTAL_*` style overrides from any key/value iterator.
pub fn apply_overrides<I>(config: &mut PortalConfig, sources: &mut ConfigSources, vars: I)
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut vars: Vec<(String, String)> = vars.into_iter().collect();
    // RUST_LOG and OTEL_* are applied after their DATAPORTAL_* counterparts.
    vars.sort_by_key(|(k, _)| !k.starts_with("DATAPORTAL_"));

    for (key, value) in vars {
        if apply_one(config, &key, value) {
            sources.env_overrides.push(key);
        }
    }
}

fn apply_one(config: &mut PortalConfig, key: &str, value: String) -> bool {
    match key {
        "DATAPORTAL_BIND_HOST" => {
            config.bind.host = value;
            return true;
        }
        "DATAPORTAL_HTTP_PORT" => {
            if let Ok(port) = value.parse() {
                config.bind.http_port = port;
                return true;
            }
            return false;
        }
        "DATAPORTAL_OTLP_ENDPOINT" | "OTEL_EXPORTER_OTLP_ENDPOINT" => {
            config.telemetry.otlp_endpoint = Some(value);
            return true;
        }
        "DATAPORTAL_LOG_LEVEL" | "RUST_LOG" => {
            config.telemetry.log_level = value;
            return true;
        }
        _ => {}
    }

    let Some(rest) = key.strip_prefix("DATAPORTAL_") else {
        return false;
    };

    for (name, source) in config.sources.iter_mut() {
        let Some(field) = rest
            .strip_prefix(&name.to_ascii_uppercase())
            .and_then(|r| r.strip_prefix('_'))
        else {
            continue;
        };

        return match field {
            "BASE_URL" => {
                source.base_url = value;
                true
            }
            "TOKEN" => {
                source.token = Some(Token::new(value));
                true
            }
            "TIMEOUT_MS" => value.parse::<u64>().map(|v| source.timeout_ms = v).is_ok(),
            "MAX_RETRIES" => value.parse::<u32>().map(|v| source.retry.max_retries = v).is_ok(),
            "ENABLED" => parse_bool(&value).map(|v| source.enabled = v).is_some(),
            _ => false,
        };
    }

    false
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
