//! Audit logger implementation.
//!
//! Provides the main `AuditLogger` type with helper methods for recording
//! each step of an action execution's lifecycle.

use appraisal_core::{ActionExecution, AuditConfig};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::AuditError;
use crate::event::{AuditEvent, AuditEventType};
use crate::storage::{
    AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage,
};

/// The main audit logger.
pub struct AuditLogger {
    config: AuditConfig,
    storage: Arc<dyn AuditStorage>,
}

impl AuditLogger {
    /// Create a new audit logger with the given configuration.
    pub fn new(config: AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else {
            match Self::resolve_log_path(&config) {
                Some(path) if config.stdout => Arc::new(DualStorage::new(&path)?),
                Some(path) => Arc::new(FileStorage::new(&path)?),
                None if config.stdout => Arc::new(ConsoleStorage::new()),
                None => Arc::new(MemoryStorage::new()),
            }
        };

        Ok(Self { config, storage })
    }

    /// Create a logger with a custom storage backend.
    pub fn with_storage(config: AuditConfig, storage: Arc<dyn AuditStorage>) -> Self {
        Self { config, storage }
    }

    /// Create a disabled (no-op) logger.
    pub fn disabled() -> Self {
        Self {
            config: AuditConfig {
                enabled: false,
                ..Default::default()
            },
            storage: Arc::new(NullStorage::new()),
        }
    }

    /// Create a logger that keeps events in memory (useful for tests).
    pub fn in_memory() -> Self {
        Self {
            config: AuditConfig::default(),
            storage: Arc::new(MemoryStorage::new()),
        }
    }

    fn resolve_log_path(config: &AuditConfig) -> Option<PathBuf> {
        config.directory.as_ref().map(|dir| {
            let mut path = PathBuf::from(dir);
            path.push("audit.log");
            path
        })
    }

    /// Check if logging is enabled.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Log an audit event.
    pub async fn log(&self, event: AuditEvent) -> Result<(), AuditError> {
        if !self.config.enabled {
            return Ok(());
        }

        // Also log to tracing for structured logging integration
        tracing::debug!(
            event_id = %event.event_id,
            event_type = %event.event_type,
            participant = %event.participant_id,
            execution = %event.execution_id,
            "Audit event"
        );

        self.storage.store(event).await
    }

    /// Log the creation of a pending execution.
    pub async fn log_triggered(&self, execution: &ActionExecution) -> Result<(), AuditError> {
        let mut builder = AuditEvent::for_execution(AuditEventType::ActionTriggered, execution)
            .meta(serde_json::json!({
                "section": execution.triggered_section,
                "score": execution.triggered_score,
                "mandatory": execution.terms.is_mandatory,
            }));
        if let Some(ref by) = execution.triggered_by {
            builder = builder.actor(by);
        }
        self.log(builder.build()).await
    }

    /// Log a successful execute.
    pub async fn log_executed(&self, execution: &ActionExecution) -> Result<(), AuditError> {
        let mut builder = AuditEvent::for_execution(AuditEventType::ActionExecuted, execution);
        if let Some(ref by) = execution.executed_by {
            builder = builder.actor(by);
        }
        if let Ok(outcome) = serde_json::to_value(&execution.outcome) {
            builder = builder.meta(serde_json::json!({ "outcome": outcome }));
        }
        self.log(builder.build()).await
    }

    /// Log an approved override. The approver is the actor; the reviewer
    /// they are independent of goes in `meta`.
    pub async fn log_overridden(
        &self,
        execution: &ActionExecution,
        reviewer: &str,
    ) -> Result<(), AuditError> {
        let mut builder = AuditEvent::for_execution(AuditEventType::ActionOverridden, execution)
            .meta(serde_json::json!({ "reviewer": reviewer }));
        if let Some(ref approver) = execution.override_approved_by {
            builder = builder.actor(approver).approver(approver);
        }
        if let Some(ref reason) = execution.override_reason {
            builder = builder.reason(reason);
        }
        self.log(builder.build()).await
    }

    /// Log a dismissal.
    pub async fn log_dismissed(&self, execution: &ActionExecution) -> Result<(), AuditError> {
        let mut builder = AuditEvent::for_execution(AuditEventType::ActionDismissed, execution);
        if let Some(ref by) = execution.dismissed_by {
            builder = builder.actor(by);
        }
        self.log(builder.build()).await
    }

    /// Log an acknowledgment.
    pub async fn log_acknowledged(&self, execution: &ActionExecution) -> Result<(), AuditError> {
        let mut builder = AuditEvent::for_execution(AuditEventType::ActionAcknowledged, execution);
        if let Some(ref by) = execution.acknowledged_by {
            builder = builder.actor(by);
        }
        if let Some(ref notes) = execution.acknowledgment_notes {
            builder = builder.reason(notes);
        }
        self.log(builder.build()).await
    }

    /// Log a refused lifecycle operation.
    pub async fn log_transition_rejected(
        &self,
        execution: &ActionExecution,
        operation: &str,
        actor: &str,
        error: &str,
    ) -> Result<(), AuditError> {
        let event = AuditEvent::for_execution(AuditEventType::TransitionRejected, execution)
            .operation(operation)
            .actor(actor)
            .error(error)
            .build();

        self.log(event).await
    }

    /// Query audit events with filters.
    pub async fn query(&self, filter: AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }

    /// Count audit events matching a filter (ignores limit/offset).
    pub async fn count(&self, filter: AuditFilter) -> Result<usize, AuditError> {
        self.storage.count(filter).await
    }

    /// Get an audit event by ID.
    pub async fn get(&self, event_id: uuid::Uuid) -> Result<Option<AuditEvent>, AuditError> {
        self.storage.get(event_id).await
    }

    /// Full history of one execution, oldest first.
    pub async fn history(&self, execution_id: &str) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(AuditFilter {
            execution_id: Some(execution_id.to_string()),
            ..Default::default()
        })
        .await
    }
}

/// Filter for querying audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Filter by participant.
    pub participant_id: Option<String>,
    /// Filter by execution.
    pub execution_id: Option<String>,
    /// Filter by event type.
    pub event_type: Option<AuditEventType>,
    /// Filter by start time.
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Filter by end time.
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

impl AuditFilter {
    /// Whether an event passes every set criterion. Ignores limit/offset.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        if let Some(ref participant) = self.participant_id {
            if &event.participant_id != participant {
                return false;
            }
        }
        if let Some(ref execution) = self.execution_id {
            if &event.execution_id != execution {
                return false;
            }
        }
        if let Some(event_type) = self.event_type {
            if event.event_type != event_type {
                return false;
            }
        }
        if let Some(start) = self.start_time {
            if event.occurred_at < start {
                return false;
            }
        }
        if let Some(end) = self.end_time {
            if event.occurred_at > end {
                return false;
            }
        }
        true
    }
}
