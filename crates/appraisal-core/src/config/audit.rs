//! Audit trail configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the action audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Also print events to stdout.
    #[serde(default)]
    pub stdout: bool,

    /// Directory holding `audit.log`. Events are only kept in memory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            stdout: false,
            directory: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}
