//! CLI command implementations for the appraisal action engine.

pub mod check;
pub mod evaluate;
pub mod lifecycle;
pub mod status;

use anyhow::{Context, Result};
use appraisal_actions::LifecycleManager;
use appraisal_core::{EngineConfig, StoreBackend};
use std::path::Path;

/// Load the engine configuration.
///
/// Without a file the CLI keeps executions and the audit trail in
/// `.appraisal/`, since every command runs in a fresh process.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            if config.store.backend == StoreBackend::Memory {
                tracing::warn!("Memory store configured; executions are lost when the command exits");
            }
            Ok(config)
        }
        None => {
            let mut config = EngineConfig::default();
            config.store.backend = StoreBackend::File;
            config.audit.directory = Some(config.store.directory.display().to_string());
            Ok(config)
        }
    }
}

/// Open the lifecycle manager described by the configuration.
pub fn open_lifecycle(config: &EngineConfig) -> Result<LifecycleManager> {
    LifecycleManager::from_config(config).context("Failed to open execution store")
}
