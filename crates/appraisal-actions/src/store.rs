//! Execution persistence.
//!
//! The at-most-one-pending invariant is enforced here, at the persistence
//! boundary: `insert_pending` is an atomic check-and-insert keyed by
//! `(participant_id, rule_id)`, and every status change is a single-record
//! compare-and-set keyed by execution id.
//!
//! [`MemoryExecutionStore`] makes both atomic within one process.
//! [`FileExecutionStore`] makes them atomic across every process sharing
//! the store directory.

use appraisal_core::{ActionExecution, ExecutionStatus, StoreBackend, StoreConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::StoreError;
use crate::file_store::FileExecutionStore;

/// Storage seam for execution records. Records are never deleted.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a pending execution unless one is already pending for the same
    /// participant and rule, in which case `StoreError::PendingConflict` is returned.
    async fn insert_pending(&self, execution: ActionExecution)
    -> Result<ActionExecution, StoreError>;

    /// The pending execution for a participant and rule, if any.
    async fn find_pending(
        &self,
        participant_id: &str,
        rule_id: &str,
    ) -> Result<Option<ActionExecution>, StoreError>;

    /// Get an execution by id.
    async fn get(&self, id: &str) -> Result<Option<ActionExecution>, StoreError>;

    /// Replace execution `id` with `updated` only if its status is still
    /// `expected`. Fails with `StoreError::StatusMismatch` otherwise.
    async fn compare_and_set(
        &self,
        id: &str,
        expected: ExecutionStatus,
        updated: ActionExecution,
    ) -> Result<ActionExecution, StoreError>;

    /// Every execution of a participant, in creation order.
    async fn list_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ActionExecution>, StoreError>;
}

/// Open the store described by the configuration.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn ExecutionStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryExecutionStore::new())),
        StoreBackend::File => Ok(Arc::new(
            FileExecutionStore::new(&config.directory)?
                .with_lock_timeout(Duration::from_millis(config.lock_timeout_ms)),
        )),
    }
}

/// Execution records plus the index of pending ones.
#[derive(Debug, Default)]
pub(crate) struct ExecutionIndex {
    executions: HashMap<String, ActionExecution>,
    order: Vec<String>,
    pending: HashMap<(String, String), String>,
}

impl ExecutionIndex {
    /// Fail if a pending execution exists for the same pair.
    pub(crate) fn check_insert(&self, execution: &ActionExecution) -> Result<(), StoreError> {
        let key = (execution.participant_id.clone(), execution.rule_id.clone());
        match self.pending.get(&key) {
            Some(existing_id) => Err(StoreError::PendingConflict {
                participant_id: execution.participant_id.clone(),
                rule_id: execution.rule_id.clone(),
                existing_id: existing_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Fail unless execution `id` exists with status `expected`.
    pub(crate) fn check_transition(
        &self,
        id: &str,
        expected: ExecutionStatus,
        updated: &ActionExecution,
    ) -> Result<(), StoreError> {
        if updated.id != id {
            return Err(StoreError::IdMismatch {
                expected: id.to_string(),
                actual: updated.id.clone(),
            });
        }

        let current = self
            .executions
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if current.status != expected {
            return Err(StoreError::StatusMismatch {
                id: id.to_string(),
                expected,
                actual: current.status,
            });
        }
        Ok(())
    }

    /// Upsert a record and keep the pending index in step.
    pub(crate) fn apply(&mut self, execution: ActionExecution) {
        let key = (execution.participant_id.clone(), execution.rule_id.clone());
        if execution.is_pending() {
            self.pending.insert(key, execution.id.clone());
        } else if self.pending.get(&key) == Some(&execution.id) {
            self.pending.remove(&key);
        }

        let id = execution.id.clone();
        if self.executions.insert(id.clone(), execution).is_none() {
            self.order.push(id);
        }
    }

    pub(crate) fn find_pending(&self, participant_id: &str, rule_id: &str) -> Option<ActionExecution> {
        self.pending
            .get(&(participant_id.to_string(), rule_id.to_string()))
            .and_then(|id| self.executions.get(id))
            .cloned()
    }

    pub(crate) fn get(&self, id: &str) -> Option<ActionExecution> {
        self.executions.get(id).cloned()
    }

    pub(crate) fn list_for_participant(&self, participant_id: &str) -> Vec<ActionExecution> {
        self.order
            .iter()
            .filter_map(|id| self.executions.get(id))
            .filter(|e| e.participant_id == participant_id)
            .cloned()
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.executions.len()
    }

}

/// In-memory execution store.
#[derive(Debug, Default)]
pub struct MemoryExecutionStore {
    index: RwLock<ExecutionIndex>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored executions.
    pub fn len(&self) -> Result<usize, StoreError> {
        let index = self.index.read().map_err(|_| StoreError::LockError)?;
        Ok(index.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn insert_pending(
        &self,
        execution: ActionExecution,
    ) -> Result<ActionExecution, StoreError> {
        let mut index = self.index.write().map_err(|_| StoreError::LockError)?;
        index.check_insert(&execution)?;
        index.apply(execution.clone());
        Ok(execution)
    }

    async fn find_pending(
        &self,
        participant_id: &str,
        rule_id: &str,
    ) -> Result<Option<ActionExecution>, StoreError> {
        let index = self.index.read().map_err(|_| StoreError::LockError)?;
        Ok(index.find_pending(participant_id, rule_id))
    }

    async fn get(&self, id: &str) -> Result<Option<ActionExecution>, StoreError> {
        let index = self.index.read().map_err(|_| StoreError::LockError)?;
        Ok(index.get(id))
    }

    async fn compare_and_set(
        &self,
        id: &str,
        expected: ExecutionStatus,
        updated: ActionExecution,
    ) -> Result<ActionExecution, StoreError> {
        let mut index = self.index.write().map_err(|_| StoreError::LockError)?;
        index.check_transition(id, expected, &updated)?;
        index.apply(updated.clone());
        Ok(updated)
    }

    async fn list_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<ActionExecution>, StoreError> {
        let index = self.index.read().map_err(|_| StoreError::LockError)?;
        Ok(index.list_for_participant(participant_id))
    }
}
