//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Default log filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info,evmgate_rpc=debug`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string() }
    }
}

fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}
