//! Finalization gate.
//!
//! Read-only queries used by the appraisal finalization process. A
//! participant is blocked while any mandatory execution is pending.

use appraisal_core::ActionExecution;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ActionError;
use crate::store::ExecutionStore;

/// Outcome of a finalization check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FinalizationDecision {
    Allowed,
    Blocked { mandatory: Vec<ActionExecution> },
}

impl FinalizationDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, FinalizationDecision::Allowed)
    }
}

/// Answers whether a participant's appraisal may be finalized.
#[derive(Clone)]
pub struct FinalizationGate {
    store: Arc<dyn ExecutionStore>,
}

impl FinalizationGate {
    pub fn new(store: Arc<dyn ExecutionStore>) -> Self {
        Self { store }
    }

    /// True while at least one mandatory execution is pending.
    pub async fn has_blocking_actions(&self, participant_id: &str) -> Result<bool, ActionError> {
        let executions = self.store.list_for_participant(participant_id).await?;
        Ok(executions.iter().any(ActionExecution::is_blocking))
    }

    /// Pending mandatory executions, most urgent first.
    pub async fn mandatory_pending(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ActionExecution>, ActionError> {
        self.pending(participant_id, true).await
    }

    /// Pending advisory executions, most urgent first.
    pub async fn advisory_pending(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ActionExecution>, ActionError> {
        self.pending(participant_id, false).await
    }

    /// Decide whether finalization may proceed.
    pub async fn decide(&self, participant_id: &str) -> Result<FinalizationDecision, ActionError> {
        let mandatory = self.mandatory_pending(participant_id).await?;
        if mandatory.is_empty() {
            return Ok(FinalizationDecision::Allowed);
        }

        tracing::info!(
            participant = participant_id,
            blocking = mandatory.len(),
            "Finalization blocked by pending mandatory actions"
        );
        Ok(FinalizationDecision::Blocked { mandatory })
    }

    async fn pending(
        &self,
        participant_id: &str,
        mandatory: bool,
    ) -> Result<Vec<ActionExecution>, ActionError> {
        let mut pending: Vec<ActionExecution> = self
            .store
            .list_for_participant(participant_id)
            .await?
            .into_iter()
            .filter(|e| e.is_pending() && e.terms.is_mandatory == mandatory)
            .collect();

        pending.sort_by(|a, b| {
            a.terms
                .priority
                .cmp(&b.terms.priority)
                .then_with(|| a.triggered_at.cmp(&b.triggered_at))
                .then_with(|| a.rule_code.cmp(&b.rule_code))
        });
        Ok(pending)
    }
}
