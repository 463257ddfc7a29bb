//! Execution store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where execution records live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Directory for the file backend's `executions.redb`.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    /// How long an operation waits for another process to release the
    /// file backend's database.
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            directory: default_directory(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Store backend type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local, lost on exit.
    #[default]
    Memory,
    /// redb database shared by every process using the directory.
    File,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".appraisal")
}

fn default_lock_timeout_ms() -> u64 {
    5000
}
