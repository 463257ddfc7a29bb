//! Error types for action execution.

use appraisal_audit::AuditError;
use appraisal_core::{ActionType, ExecutionStatus};

/// Errors raised by an [`ExecutionStore`](crate::store::ExecutionStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(
        "execution {existing_id} is already pending for participant {participant_id} and rule {rule_id}"
    )]
    PendingConflict {
        participant_id: String,
        rule_id: String,
        existing_id: String,
    },

    #[error("execution {id} is {actual}, expected {expected}")]
    StatusMismatch {
        id: String,
        expected: ExecutionStatus,
        actual: ExecutionStatus,
    },

    #[error("record {actual} cannot replace execution {expected}")]
    IdMismatch { expected: String, actual: String },

    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("Lock error")]
    LockError,

    #[error("store {0} stayed locked past the lock timeout")]
    Busy(String),

    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by lifecycle, override and gate operations.
///
/// Every error is local to one execution; callers processing a batch keep
/// going after a failure.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Execution not found: {0}")]
    NotFound(String),

    #[error("cannot {operation} execution {id}: status is {from}")]
    InvalidTransition {
        id: String,
        from: ExecutionStatus,
        operation: &'static str,
    },

    #[error("outcome does not match action type {action_type} of execution {id}")]
    OutcomeMismatch { id: String, action_type: ActionType },

    #[error("execution {id} is mandatory; it can only be executed or overridden")]
    MandatoryActionCannotBeDismissed { id: String },

    #[error("an override requires a non-empty reason")]
    ReasonRequired,

    #[error("{approver} cannot approve an override of their own action")]
    SelfApprovalNotPermitted { approver: String },

    #[error(
        "could not register rule {rule_id} for participant {participant_id} after {attempts} attempts"
    )]
    RegistrationConflict {
        participant_id: String,
        rule_id: String,
        attempts: u32,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("collaborator failed: {0}")]
    Collaborator(anyhow::Error),
}

impl ActionError {
    /// Whether the error is a refused operation rather than an infrastructure failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ActionError::InvalidTransition { .. }
                | ActionError::OutcomeMismatch { .. }
                | ActionError::MandatoryActionCannotBeDismissed { .. }
                | ActionError::ReasonRequired
                | ActionError::SelfApprovalNotPermitted { .. }
        )
    }
}
