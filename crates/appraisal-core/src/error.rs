//! Error types for the core crate.

use thiserror::Error;

/// Errors raised while parsing or validating shared types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A wire string did not name any variant of a closed enumeration.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },

    /// A rule definition is structurally unusable.
    #[error("rule '{rule_code}' is malformed: {reason}")]
    MalformedRule { rule_code: String, reason: String },
}
