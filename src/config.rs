use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use wd_router::DEFAULT_URL_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Leading path clients mount the protocol under, e.g. `/wd/hub`.
    pub url_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8910,
            url_prefix: DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// A loaded configuration and where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    pub from_file: bool,
}

pub fn default_config_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("Failed to get config directory")?;
    path.push("wirehub");
    path.push("config.yaml");
    Ok(path)
}

/// Reads the configuration file. The default location may be absent, in
/// which case defaults apply; an explicit path must exist.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !fs::try_exists(&path).await.unwrap_or(false) {
        if explicit.is_some() {
            bail!("config file {} does not exist", path.display());
        }
        return Ok(LoadedConfig {
            config: Config::default(),
            path,
            from_file: false,
        });
    }

    let raw = fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let config = if raw.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
    };
    Ok(LoadedConfig {
        config,
        path,
        from_file: true,
    })
}
