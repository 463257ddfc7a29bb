//! Execution lifecycle manager.
//!
//! Turns triggers into execution records and advances them:
//!
//! ```text
//! pending --execute-->  executed --acknowledge--> completed
//! pending --override--> overridden   (see OverrideWorkflow)
//! pending --dismiss-->  dismissed    (advisory only)
//! ```
//!
//! The manager is stateless between calls. Uniqueness of pending records
//! and the atomicity of transitions live in the [`ExecutionStore`].

use appraisal_audit::{AuditError, AuditLogger};
use appraisal_core::{ActionExecution, EngineConfig, ExecutionStatus, OutcomeLink, Trigger};
use std::sync::Arc;

use crate::error::{ActionError, StoreError};
use crate::store::{ExecutionStore, open_store};

const DEFAULT_REGISTER_RETRY_LIMIT: u32 = 3;

/// Creates and advances action executions.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn ExecutionStore>,
    audit: Arc<AuditLogger>,
    register_retry_limit: u32,
}

impl LifecycleManager {
    /// Create a manager over a store and audit logger.
    pub fn new(store: Arc<dyn ExecutionStore>, audit: Arc<AuditLogger>) -> Self {
        Self {
            store,
            audit,
            register_retry_limit: DEFAULT_REGISTER_RETRY_LIMIT,
        }
    }

    /// Create a manager from engine configuration.
    pub fn from_config(config: &EngineConfig) -> Result<Self, ActionError> {
        let store = open_store(&config.store)?;
        let audit = Arc::new(AuditLogger::new(config.audit.clone())?);
        Ok(Self::new(store, audit).with_retry_limit(config.register_retry_limit))
    }

    /// Set how many times registration re-reads after losing an insert race.
    pub fn with_retry_limit(mut self, limit: u32) -> Self {
        self.register_retry_limit = limit;
        self
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    /// Get an execution by id.
    pub async fn get(&self, id: &str) -> Result<ActionExecution, ActionError> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ActionError::NotFound(id.to_string()))
    }

    /// Every execution of a participant, in creation order.
    pub async fn list(&self, participant_id: &str) -> Result<Vec<ActionExecution>, ActionError> {
        Ok(self.store.list_for_participant(participant_id).await?)
    }

    /// Create the pending execution for a trigger.
    ///
    /// Idempotent: while an execution for the same participant and rule is
    /// pending, that record is returned unchanged.
    pub async fn register_trigger(
        &self,
        participant_id: &str,
        trigger: &Trigger,
        triggered_by: Option<&str>,
    ) -> Result<ActionExecution, ActionError> {
        let mut conflicts = 0;

        loop {
            if let Some(existing) = self
                .store
                .find_pending(participant_id, &trigger.rule_id)
                .await?
            {
                tracing::debug!(
                    execution = %existing.id,
                    participant = participant_id,
                    rule_code = %trigger.rule_code,
                    "Execution already pending"
                );
                return Ok(existing);
            }

            let candidate = ActionExecution::pending(
                participant_id,
                trigger,
                triggered_by.map(str::to_string),
            );

            match self.store.insert_pending(candidate).await {
                Ok(created) => {
                    tracing::info!(
                        execution = %created.id,
                        participant = participant_id,
                        rule_code = %created.rule_code,
                        action = %created.terms.action_type,
                        mandatory = created.terms.is_mandatory,
                        "Action triggered"
                    );
                    self.record(self.audit.log_triggered(&created).await);
                    return Ok(created);
                }
                Err(StoreError::PendingConflict { existing_id, .. }) => {
                    conflicts += 1;
                    if conflicts > self.register_retry_limit {
                        return Err(ActionError::RegistrationConflict {
                            participant_id: participant_id.to_string(),
                            rule_id: trigger.rule_id.clone(),
                            attempts: conflicts,
                        });
                    }
                    tracing::debug!(
                        existing = %existing_id,
                        attempt = conflicts,
                        "Concurrent registration won; re-reading"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Register a batch of triggers. One failure does not stop the rest.
    pub async fn register_triggers(
        &self,
        participant_id: &str,
        triggers: &[Trigger],
        triggered_by: Option<&str>,
    ) -> Vec<Result<ActionExecution, ActionError>> {
        let mut results = Vec::with_capacity(triggers.len());
        for trigger in triggers {
            let result = self
                .register_trigger(participant_id, trigger, triggered_by)
                .await;
            if let Err(ref e) = result {
                tracing::warn!(
                    participant = participant_id,
                    rule_code = %trigger.rule_code,
                    error = %e,
                    "Failed to register trigger"
                );
            }
            results.push(result);
        }
        results
    }

    /// Mark a pending execution as performed.
    ///
    /// `outcome` must link the document the action type creates (an IDP for
    /// `create_idp` and so on) and nothing for the other action types.
    pub async fn execute(
        &self,
        id: &str,
        by: &str,
        outcome: OutcomeLink,
    ) -> Result<ActionExecution, ActionError> {
        const OPERATION: &str = "execute";
        let current = self.get(id).await?;

        if !current.is_pending() {
            let error = Self::invalid_transition(&current, OPERATION);
            return self.reject(&current, OPERATION, by, error).await;
        }

        let required = current.terms.action_type.required_outcome();
        if !outcome.satisfies(required) {
            let error = ActionError::OutcomeMismatch {
                id: current.id.clone(),
                action_type: current.terms.action_type,
            };
            return self.reject(&current, OPERATION, by, error).await;
        }

        let mut updated = current.clone();
        updated.execute(by, outcome);
        let executed = self.commit(&current, updated, OPERATION, by).await?;

        tracing::info!(
            execution = %executed.id,
            participant = %executed.participant_id,
            action = %executed.terms.action_type,
            by,
            "Action executed"
        );
        self.record(self.audit.log_executed(&executed).await);
        Ok(executed)
    }

    /// Dismiss a pending advisory execution.
    pub async fn dismiss(&self, id: &str, by: &str) -> Result<ActionExecution, ActionError> {
        const OPERATION: &str = "dismiss";
        let current = self.get(id).await?;

        if !current.is_pending() {
            let error = Self::invalid_transition(&current, OPERATION);
            return self.reject(&current, OPERATION, by, error).await;
        }

        if current.terms.is_mandatory {
            let error = ActionError::MandatoryActionCannotBeDismissed {
                id: current.id.clone(),
            };
            return self.reject(&current, OPERATION, by, error).await;
        }

        let mut updated = current.clone();
        updated.dismiss(by);
        let dismissed = self.commit(&current, updated, OPERATION, by).await?;

        tracing::info!(
            execution = %dismissed.id,
            participant = %dismissed.participant_id,
            by,
            "Action dismissed"
        );
        self.record(self.audit.log_dismissed(&dismissed).await);
        Ok(dismissed)
    }

    /// Acknowledge an executed action.
    ///
    /// Best effort: on any status other than `executed` the record is
    /// returned unchanged.
    pub async fn acknowledge(
        &self,
        id: &str,
        by: &str,
        notes: Option<String>,
    ) -> Result<ActionExecution, ActionError> {
        let current = self.get(id).await?;

        if current.status != ExecutionStatus::Executed {
            tracing::debug!(
                execution = %current.id,
                status = %current.status,
                "Ignoring acknowledgment"
            );
            return Ok(current);
        }

        let mut updated = current.clone();
        updated.acknowledge(by, notes);

        match self
            .store
            .compare_and_set(id, ExecutionStatus::Executed, updated)
            .await
        {
            Ok(completed) => {
                tracing::info!(execution = %completed.id, by, "Action acknowledged");
                self.record(self.audit.log_acknowledged(&completed).await);
                Ok(completed)
            }
            Err(StoreError::StatusMismatch { .. }) => self.get(id).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a transition out of `pending`. A lost race becomes `InvalidTransition`.
    pub(crate) async fn commit(
        &self,
        current: &ActionExecution,
        updated: ActionExecution,
        operation: &'static str,
        actor: &str,
    ) -> Result<ActionExecution, ActionError> {
        match self
            .store
            .compare_and_set(&current.id, ExecutionStatus::Pending, updated)
            .await
        {
            Ok(committed) => Ok(committed),
            Err(StoreError::StatusMismatch { actual, .. }) => {
                let error = ActionError::InvalidTransition {
                    id: current.id.clone(),
                    from: actual,
                    operation,
                };
                self.reject(current, operation, actor, error).await
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Record a refused operation and return it as an error.
    pub(crate) async fn reject<T>(
        &self,
        execution: &ActionExecution,
        operation: &str,
        actor: &str,
        error: ActionError,
    ) -> Result<T, ActionError> {
        tracing::warn!(
            execution = %execution.id,
            operation,
            actor,
            error = %error,
            "Transition rejected"
        );
        self.record(
            self.audit
                .log_transition_rejected(execution, operation, actor, &error.to_string())
                .await,
        );
        Err(error)
    }

    pub(crate) fn invalid_transition(
        execution: &ActionExecution,
        operation: &'static str,
    ) -> ActionError {
        ActionError::InvalidTransition {
            id: execution.id.clone(),
            from: execution.status,
            operation,
        }
    }

    /// Audit failures never undo a committed mutation.
    pub(crate) fn record(&self, result: Result<(), AuditError>) {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryExecutionStore;
    use crate::store::tests::trigger;
    use appraisal_audit::{AuditEventType, AuditFilter};
    use appraisal_core::ActionType;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn manager() -> LifecycleManager {
        LifecycleManager::new(
            Arc::new(MemoryExecutionStore::new()),
            Arc::new(AuditLogger::in_memory()),
        )
    }

    #[tokio::test]
    async fn test_register_is_idempotent_while_pending() {
        let lifecycle = manager();
        let t = trigger("r1", ActionType::BlockFinalization, true);

        let first = lifecycle.register_trigger("emp-1", &t, None).await.unwrap();
        let second = lifecycle.register_trigger("emp-1", &t, None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(lifecycle.list("emp-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_after_resolution_creates_new_execution() {
        let lifecycle = manager();
        let t = trigger("r1", ActionType::NotifyHr, false);

        let first = lifecycle.register_trigger("emp-1", &t, None).await.unwrap();
        lifecycle.execute(&first.id, "reviewer", OutcomeLink::None).await.unwrap();
        let second = lifecycle.register_trigger("emp-1", &t, None).await.unwrap();

        assert_ne!(first.id, second.id);
        assert!(second.is_pending());
    }

    #[tokio::test]
    async fn test_execute_requires_matching_outcome() {
        let lifecycle = manager();
        let exec = lifecycle
            .register_trigger("emp-1", &trigger("r1", ActionType::CreateIdp, true), None)
            .await
            .unwrap();

        for wrong in [
            OutcomeLink::None,
            OutcomeLink::Pip("pip-1".to_string()),
            OutcomeLink::Idp(String::new()),
        ] {
            let err = lifecycle.execute(&exec.id, "reviewer", wrong).await.unwrap_err();
            assert!(matches!(err, ActionError::OutcomeMismatch { .. }));
        }
        assert!(lifecycle.get(&exec.id).await.unwrap().is_pending());

        let executed = lifecycle
            .execute(&exec.id, "reviewer", OutcomeLink::Idp("idp-1".to_string()))
            .await
            .unwrap();
        assert_eq!(executed.status, ExecutionStatus::Executed);
        assert_eq!(executed.created_idp_id(), Some("idp-1"));
        assert_eq!(executed.executed_by.as_deref(), Some("reviewer"));
    }

    #[tokio::test]
    async fn test_non_document_actions_take_no_outcome() {
        let lifecycle = manager();
        let exec = lifecycle
            .register_trigger("emp-1", &trigger("r1", ActionType::NotifyHr, false), None)
            .await
            .unwrap();

        let err = lifecycle
            .execute(&exec.id, "reviewer", OutcomeLink::Idp("idp-1".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::OutcomeMismatch { .. }));

        lifecycle.execute(&exec.id, "reviewer", OutcomeLink::None).await.unwrap();
    }

    #[tokio::test]
    async fn test_terminal_states_refuse_transitions() {
        let lifecycle = manager();
        let exec = lifecycle
            .register_trigger("emp-1", &trigger("r1", ActionType::NotifyHr, false), None)
            .await
            .unwrap();
        lifecycle.dismiss(&exec.id, "reviewer").await.unwrap();

        let err = lifecycle.execute(&exec.id, "reviewer", OutcomeLink::None).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::InvalidTransition {
                from: ExecutionStatus::Dismissed,
                operation: "execute",
                ..
            }
        ));
        let err = lifecycle.dismiss(&exec.id, "reviewer").await.unwrap_err();
        assert!(matches!(err, ActionError::InvalidTransition { .. }));

        // Acknowledge is ignored, not an error
        let same = lifecycle.acknowledge(&exec.id, "reviewer", None).await.unwrap();
        assert_eq!(same.status, ExecutionStatus::Dismissed);
    }

    #[tokio::test]
    async fn test_mandatory_cannot_be_dismissed() {
        let lifecycle = manager();
        let exec = lifecycle
            .register_trigger("emp-1", &trigger("r1", ActionType::BlockFinalization, true), None)
            .await
            .unwrap();

        let err = lifecycle.dismiss(&exec.id, "reviewer").await.unwrap_err();
        assert!(matches!(err, ActionError::MandatoryActionCannotBeDismissed { .. }));
        assert!(err.is_rejection());
        assert!(lifecycle.get(&exec.id).await.unwrap().is_pending());

        let rejected = lifecycle
            .audit()
            .query(AuditFilter {
                event_type: Some(AuditEventType::TransitionRejected),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].operation.as_deref(), Some("dismiss"));
    }

    #[tokio::test]
    async fn test_acknowledge_completes_executed() {
        let lifecycle = manager();
        let exec = lifecycle
            .register_trigger("emp-1", &trigger("r1", ActionType::ScheduleCoaching, false), None)
            .await
            .unwrap();
        lifecycle.execute(&exec.id, "reviewer", OutcomeLink::None).await.unwrap();

        let completed = lifecycle
            .acknowledge(&exec.id, "emp-1", Some("Booked for March".to_string()))
            .await
            .unwrap();
        assert_eq!(completed.status, ExecutionStatus::Completed);
        assert_eq!(completed.acknowledged_by.as_deref(), Some("emp-1"));
        assert_eq!(completed.acknowledgment_notes.as_deref(), Some("Booked for March"));

        let history = lifecycle.audit().history(&exec.id).await.unwrap();
        let types: Vec<_> = history.iter().map(|e| e.event_type).collect();
        assert_eq!(
            types,
            vec![
                AuditEventType::ActionTriggered,
                AuditEventType::ActionExecuted,
                AuditEventType::ActionAcknowledged,
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_execution() {
        let lifecycle = manager();
        let err = lifecycle.dismiss("missing", "reviewer").await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound(_)));
    }

    /// Hides pending records from the first `find_pending` call, as if a
    /// concurrent registration committed between the read and the insert.
    struct StaleReadStore {
        inner: MemoryExecutionStore,
        stale: AtomicBool,
    }

    #[async_trait]
    impl ExecutionStore for StaleReadStore {
        async fn insert_pending(
            &self,
            execution: ActionExecution,
        ) -> Result<ActionExecution, StoreError> {
            self.inner.insert_pending(execution).await
        }

        async fn find_pending(
            &self,
            participant_id: &str,
            rule_id: &str,
        ) -> Result<Option<ActionExecution>, StoreError> {
            if self.stale.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_pending(participant_id, rule_id).await
        }

        async fn get(&self, id: &str) -> Result<Option<ActionExecution>, StoreError> {
            self.inner.get(id).await
        }

        async fn compare_and_set(
            &self,
            id: &str,
            expected: ExecutionStatus,
            updated: ActionExecution,
        ) -> Result<ActionExecution, StoreError> {
            self.inner.compare_and_set(id, expected, updated).await
        }

        async fn list_for_participant(
            &self,
            participant_id: &str,
        ) -> Result<Vec<ActionExecution>, StoreError> {
            self.inner.list_for_participant(participant_id).await
        }
    }

    async fn stale_store_with_winner(t: &Trigger) -> (Arc<StaleReadStore>, ActionExecution) {
        let inner = MemoryExecutionStore::new();
        let winner = inner
            .insert_pending(ActionExecution::pending("emp-1", t, None))
            .await
            .unwrap();
        let store = Arc::new(StaleReadStore {
            inner,
            stale: AtomicBool::new(true),
        });
        (store, winner)
    }

    #[tokio::test]
    async fn test_register_returns_winner_after_conflict() {
        let t = trigger("r1", ActionType::NotifyHr, false);
        let (store, winner) = stale_store_with_winner(&t).await;
        let lifecycle = LifecycleManager::new(store, Arc::new(AuditLogger::in_memory()));

        let registered = lifecycle.register_trigger("emp-1", &t, None).await.unwrap();
        assert_eq!(registered.id, winner.id);
    }

    #[tokio::test]
    async fn test_register_gives_up_after_retry_limit() {
        let t = trigger("r1", ActionType::NotifyHr, false);
        let (store, _) = stale_store_with_winner(&t).await;
        let lifecycle =
            LifecycleManager::new(store, Arc::new(AuditLogger::in_memory())).with_retry_limit(0);

        let err = lifecycle.register_trigger("emp-1", &t, None).await.unwrap_err();
        assert!(matches!(
            err,
            ActionError::RegistrationConflict { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_register_triggers_reports_each() {
        let lifecycle = manager();
        let triggers = vec![
            trigger("r1", ActionType::CreateIdp, true),
            trigger("r2", ActionType::NotifyHr, false),
        ];

        let results = lifecycle.register_triggers("emp-1", &triggers, Some("scheduler")).await;
        assert_eq!(results.len(), 2);
        for result in results {
            let exec = result.unwrap();
            assert_eq!(exec.triggered_by.as_deref(), Some("scheduler"));
        }
    }

    #[tokio::test]
    async fn test_from_config_with_defaults() {
        let lifecycle = LifecycleManager::from_config(&EngineConfig::default()).unwrap();
        assert_eq!(lifecycle.register_retry_limit, 3);
    }
}
