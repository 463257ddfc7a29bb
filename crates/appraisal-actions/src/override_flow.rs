//! Override/approval workflow.
//!
//! An override resolves a pending execution without performing the action.
//! It needs a written reason and an approver who is a different person
//! from the reviewer of the appraisal and from whoever triggered the
//! evaluation. Like `executed`, `overridden` satisfies a mandatory action.

use appraisal_core::ActionExecution;
use appraisal_rules::Combination;
use serde::{Deserialize, Serialize};

use crate::error::ActionError;
use crate::lifecycle::LifecycleManager;

/// Identities of the calling context an approver must differ from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideContext {
    /// Reviewer of the appraisal: the natural executor of the action.
    pub reviewer_id: String,

    /// Actor whose event caused the evaluation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,
}

impl OverrideContext {
    pub fn new(reviewer_id: impl Into<String>) -> Self {
        Self {
            reviewer_id: reviewer_id.into(),
            triggered_by: None,
        }
    }

    pub fn triggered_by(mut self, actor: impl Into<String>) -> Self {
        self.triggered_by = Some(actor.into());
        self
    }
}

/// Gates the `overridden` transition behind a distinct approver.
#[derive(Clone)]
pub struct OverrideWorkflow {
    lifecycle: LifecycleManager,
}

impl OverrideWorkflow {
    pub fn new(lifecycle: LifecycleManager) -> Self {
        Self { lifecycle }
    }

    /// Approve skipping a pending action.
    ///
    /// Checks run in order: the execution must be pending, the trimmed
    /// reason must be non-empty, then the approver must be independent.
    pub async fn override_execution(
        &self,
        id: &str,
        reason: &str,
        approved_by: &str,
        context: &OverrideContext,
    ) -> Result<ActionExecution, ActionError> {
        const OPERATION: &str = "override";
        let current = self.lifecycle.get(id).await?;

        if !current.is_pending() {
            let error = LifecycleManager::invalid_transition(&current, OPERATION);
            return self
                .lifecycle
                .reject(&current, OPERATION, approved_by, error)
                .await;
        }

        let reason = reason.trim();
        if reason.is_empty() {
            return self
                .lifecycle
                .reject(&current, OPERATION, approved_by, ActionError::ReasonRequired)
                .await;
        }

        if !Self::approver_is_independent(approved_by, context, &current) {
            let error = ActionError::SelfApprovalNotPermitted {
                approver: approved_by.to_string(),
            };
            return self
                .lifecycle
                .reject(&current, OPERATION, approved_by, error)
                .await;
        }

        let mut updated = current.clone();
        updated.approve_override(reason, approved_by);
        let overridden = self
            .lifecycle
            .commit(&current, updated, OPERATION, approved_by)
            .await?;

        tracing::info!(
            execution = %overridden.id,
            participant = %overridden.participant_id,
            approver = approved_by,
            reviewer = %context.reviewer_id,
            "Action overridden"
        );
        self.lifecycle.record(
            self.lifecycle
                .audit()
                .log_overridden(&overridden, &context.reviewer_id)
                .await,
        );
        Ok(overridden)
    }

    /// The approver differs from every identity involved in the action.
    fn approver_is_independent(
        approved_by: &str,
        context: &OverrideContext,
        execution: &ActionExecution,
    ) -> bool {
        let approver = approved_by.trim();
        if approver.is_empty() {
            return false;
        }

        let involved = std::iter::once(context.reviewer_id.as_str())
            .chain(context.triggered_by.as_deref())
            .chain(execution.triggered_by.as_deref());

        Combination::All.combine(involved.map(|identity| identity.trim() != approver))
    }
}
