//! Top-level gateway configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ChainConfig, ConfigError, JsonRpcConfig, LogConfig};

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GatewayConfig {
    /// JSON-RPC and WebSocket server settings.
    #[serde(default)]
    pub json_rpc: JsonRpcConfig,

    /// Chain identity.
    #[serde(default)]
    pub chain: ChainConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl GatewayConfig {
    /// Loads the configuration from `path`, or defaults when `None`.
    ///
    /// Files with a `.json` extension are parsed as JSON, anything else as TOML.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;

        let config = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };
        config.json_rpc.validate()?;
        Ok(config)
    }

    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parses a JSON document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }
}
