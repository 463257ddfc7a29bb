//! Per-participant orchestration.
//!
//! Score Provider -> Rule Evaluator -> Lifecycle Manager, for one
//! participant at a time. Participants share no mutable state, so callers
//! may process several concurrently.

use appraisal_core::{ActionExecution, SectionScoreHistory};
use appraisal_rules::{Evaluation, RuleEvaluator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ActionError;
use crate::gate::FinalizationGate;
use crate::lifecycle::LifecycleManager;
use crate::override_flow::OverrideWorkflow;
use crate::providers::{RuleCatalog, ScoreProvider};

/// A trigger that could not be registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub rule_id: String,
    pub rule_code: String,
    pub error: String,
}

/// Result of processing one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    pub participant_id: String,
    pub template_id: String,
    /// Fired and skipped rules.
    pub evaluation: Evaluation,
    /// Pending executions for the fired rules, new or pre-existing.
    pub executions: Vec<ActionExecution>,
    pub failures: Vec<RegistrationFailure>,
}

/// Wires the collaborators to the evaluator and lifecycle manager.
#[derive(Clone)]
pub struct ActionEngine {
    catalog: Arc<dyn RuleCatalog>,
    scores: Arc<dyn ScoreProvider>,
    evaluator: RuleEvaluator,
    lifecycle: LifecycleManager,
}

impl ActionEngine {
    pub fn new(
        catalog: Arc<dyn RuleCatalog>,
        scores: Arc<dyn ScoreProvider>,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            catalog,
            scores,
            evaluator: RuleEvaluator::new(),
            lifecycle,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    /// Override workflow over the same store.
    pub fn overrides(&self) -> OverrideWorkflow {
        OverrideWorkflow::new(self.lifecycle.clone())
    }

    /// Finalization gate over the same store.
    pub fn gate(&self) -> FinalizationGate {
        FinalizationGate::new(self.lifecycle.store().clone())
    }

    /// Evaluate a participant's scores and register every fired rule.
    pub async fn process_participant(
        &self,
        participant_id: &str,
        template_id: &str,
        triggered_by: Option<&str>,
    ) -> Result<ProcessingReport, ActionError> {
        let rules = self
            .catalog
            .active_rules(template_id)
            .await
            .map_err(ActionError::Collaborator)?;
        let current = self
            .scores
            .current_scores(participant_id)
            .await
            .map_err(ActionError::Collaborator)?;
        let history = if rules.iter().any(|r| r.condition_type.uses_history()) {
            self.scores
                .score_history(participant_id)
                .await
                .map_err(ActionError::Collaborator)?
        } else {
            SectionScoreHistory::new()
        };

        let evaluation = self.evaluator.evaluate_with_report(&current, &history, &rules);
        let results = self
            .lifecycle
            .register_triggers(participant_id, &evaluation.triggers, triggered_by)
            .await;

        let mut executions = Vec::new();
        let mut failures = Vec::new();
        for (trigger, result) in evaluation.triggers.iter().zip(results) {
            match result {
                Ok(execution) => executions.push(execution),
                Err(e) => failures.push(RegistrationFailure {
                    rule_id: trigger.rule_id.clone(),
                    rule_code: trigger.rule_code.clone(),
                    error: e.to_string(),
                }),
            }
        }

        tracing::info!(
            participant = participant_id,
            template = template_id,
            fired = evaluation.triggers.len(),
            registered = executions.len(),
            failed = failures.len(),
            "Processed participant"
        );

        Ok(ProcessingReport {
            participant_id: participant_id.to_string(),
            template_id: template_id.to_string(),
            evaluation,
            executions,
            failures,
        })
    }
}
