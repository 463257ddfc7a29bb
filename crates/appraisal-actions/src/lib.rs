//! # appraisal-actions
//!
//! Execution lifecycle for appraisal outcome actions.
//!
//! - [`LifecycleManager`] turns triggers into [`ActionExecution`] records
//!   and moves them through `execute`, `dismiss` and `acknowledge`
//! - [`OverrideWorkflow`] resolves a pending action with a second-party
//!   approval and a written reason
//! - [`FinalizationGate`] answers whether pending mandatory actions block
//!   an appraisal from being finalized
//! - [`ActionEngine`] runs scores through the evaluator and registers the
//!   resulting triggers for one participant
//!
//! At most one execution per (participant, rule) is pending at any time.
//! This is enforced by [`ExecutionStore::insert_pending`], an atomic
//! check-and-insert; transitions are compare-and-set on the execution id.
//!
//! [`ActionExecution`]: appraisal_core::ActionExecution

pub mod engine;
pub mod error;
pub mod file_store;
pub mod gate;
pub mod lifecycle;
pub mod override_flow;
pub mod providers;
pub mod store;

pub use engine::{ActionEngine, ProcessingReport, RegistrationFailure};
pub use error::{ActionError, StoreError};
pub use file_store::FileExecutionStore;
pub use gate::{FinalizationDecision, FinalizationGate};
pub use lifecycle::LifecycleManager;
pub use override_flow::{OverrideContext, OverrideWorkflow};
pub use providers::{
    RuleCatalog, ScoreProvider, ScoresFile, StaticRuleCatalog, StaticScoreProvider,
};
pub use store::{ExecutionStore, MemoryExecutionStore, open_store};
