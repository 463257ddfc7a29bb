//! Configuration types for the appraisal action engine.
//!
//! Configuration is loaded from YAML:
//!
//! - **appraisal.yaml**: engine settings (store backend, audit, retry limits)
//! - **rules.yaml**: the rule catalog, grouped by appraisal template

pub mod audit;
pub mod catalog;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use audit::AuditConfig;
pub use catalog::{CatalogIssue, RuleCatalogDefinition};
pub use store::{StoreBackend, StoreConfig};

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution store settings.
    #[serde(default)]
    pub store: StoreConfig,

    /// Audit trail settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Re-reads attempted by `register_trigger` after a uniqueness conflict.
    #[serde(default = "default_register_retry_limit")]
    pub register_retry_limit: u32,

    /// Rule catalog file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            audit: AuditConfig::default(),
            register_retry_limit: default_register_retry_limit(),
            catalog_file: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that parse but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend == StoreBackend::File {
            if self.store.directory.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "store.directory must not be empty for the file backend".to_string(),
                ));
            }
            if self.store.lock_timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "store.lock_timeout_ms must be greater than 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn default_register_retry_limit() -> u32 {
    3
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
