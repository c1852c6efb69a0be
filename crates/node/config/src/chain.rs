//! Chain configuration.

use serde::{Deserialize, Serialize};

/// Default Ethereum chain id.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// Chain identity reported to Ethereum clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Chain id returned by `eth_chainId` and used for legacy transactions.
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self { chain_id: DEFAULT_CHAIN_ID }
    }
}

const fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_config_defaults() {
        assert_eq!(ChainConfig::default().chain_id, DEFAULT_CHAIN_ID);
        let config: ChainConfig = toml::from_str("").expect("deserialize");
        assert_eq!(config.chain_id, DEFAULT_CHAIN_ID);
    }
}
