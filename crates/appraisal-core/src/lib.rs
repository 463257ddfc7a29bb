//! # appraisal-core
//!
//! Shared types for the appraisal outcome action engine: action rules,
//! triggers, execution records, section scores and YAML configuration.

pub mod config;
pub mod error;
pub mod execution;
pub mod rule;
pub mod scores;

pub use config::{
    AuditConfig, CatalogIssue, ConfigError, EngineConfig, RuleCatalogDefinition, StoreBackend,
    StoreConfig,
};
pub use error::CoreError;
pub use execution::{ActionExecution, ExecutionStatus, OutcomeLink, Trigger};
pub use rule::{
    ActionRule, ActionTerms, ActionType, ConditionType, Operator, OutcomeKind, Section,
};
pub use scores::{ParticipantScores, SectionScoreHistory, SectionScores};
