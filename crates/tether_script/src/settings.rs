//! Bridge settings

use crate::promise::DEFAULT_PROMISE_ID_PREFIX;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Script runtime and bridge settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// Prefix of the global names host deferreds are registered under.
    pub promise_id_prefix: String,
    /// Script heap limit in bytes.
    pub memory_limit: Option<usize>,
    /// Script stack limit in bytes.
    pub max_stack_size: Option<usize>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl BridgeSettings {
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            promise_id_prefix: DEFAULT_PROMISE_ID_PREFIX.to_string(),
            memory_limit: None,
            max_stack_size: None,
            log_filter: "info".to_string(),
        }
    }
}
