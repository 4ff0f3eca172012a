//! # Config File
//!
//! Optional `lgrep.toml` supplying defaults that command line flags
//! override.
//!
//! ```toml
//! [client]
//! endpoint = "http://es.internal:9200/"
//! request_timeout_ms = 10000
//!
//! [search]
//! size = 50
//! index = "logstash-*"
//! format = ".host .message"
//! ```

use std::path::Path;
use std::time::Duration;

use lg_core::ClientConfig;
use serde::Deserialize;

/// Config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "lgrep.toml";

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub search: SearchSection,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ClientSection {
    pub endpoint: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct SearchSection {
    pub size: Option<i64>,
    pub index: Option<String>,
    pub format: Option<String>,
}

fn default_connect_timeout() -> u64 {
    5_000
}
fn default_request_timeout() -> u64 {
    30_000
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

impl Config {
    /// Load `path`. A missing file is only an error when it was asked for
    /// explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default())
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Client settings, with `endpoint` (flag or environment) taking
    /// precedence over the file.
    pub fn client_config(&self, endpoint: Option<&str>) -> ClientConfig {
        let endpoint = endpoint
            .map(str::to_string)
            .or_else(|| self.client.endpoint.clone())
            .unwrap_or_else(|| lg_core::DEFAULT_ENDPOINT.to_string());
        ClientConfig {
            endpoint,
            connect_timeout: Duration::from_millis(self.client.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.client.request_timeout_ms),
        }
    }
}
