//! Audit event types.
//!
//! One event is recorded for every change to an action execution and for
//! every rejected attempt to change one. Events of one execution share its
//! id, so the full history of a firing can be replayed from the trail.

use appraisal_core::{ActionExecution, ActionType, ExecutionStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Type of audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A pending execution was created for a fired rule.
    ActionTriggered,
    /// The action was performed.
    ActionExecuted,
    /// The action was resolved by an approved override.
    ActionOverridden,
    /// An advisory action was dismissed.
    ActionDismissed,
    /// An executed action was acknowledged.
    ActionAcknowledged,
    /// A lifecycle operation was refused.
    TransitionRejected,
}

impl std::fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ActionTriggered => write!(f, "ACTION_TRIGGERED"),
            Self::ActionExecuted => write!(f, "ACTION_EXECUTED"),
            Self::ActionOverridden => write!(f, "ACTION_OVERRIDDEN"),
            Self::ActionDismissed => write!(f, "ACTION_DISMISSED"),
            Self::ActionAcknowledged => write!(f, "ACTION_ACKNOWLEDGED"),
            Self::TransitionRejected => write!(f, "TRANSITION_REJECTED"),
        }
    }
}

/// An audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: Uuid,

    /// When the event occurred.
    pub occurred_at: DateTime<Utc>,

    /// Event type.
    pub event_type: AuditEventType,

    /// Execution the event belongs to.
    pub execution_id: String,

    /// Appraisal participant.
    pub participant_id: String,

    /// Rule code of the fired rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_code: Option<String>,

    /// Action requested by the rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<ActionType>,

    /// Status after the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,

    /// Who performed the operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// Who approved an override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,

    /// Override justification or acknowledgment notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Operation attempted (for rejected transitions).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,

    /// Error message (for rejected transitions).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Additional metadata.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub meta: serde_json::Value,
}

impl AuditEvent {
    /// Create a new audit event with the given type and core fields.
    pub fn new(
        event_type: AuditEventType,
        execution_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            event_type,
            execution_id: execution_id.into(),
            participant_id: participant_id.into(),
            rule_code: None,
            action_type: None,
            status: None,
            actor: None,
            approver: None,
            reason: None,
            operation: None,
            error: None,
            meta: serde_json::Value::Null,
        }
    }

    /// Create a builder for an audit event.
    pub fn builder(
        event_type: AuditEventType,
        execution_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, execution_id, participant_id)
    }

    /// Start a builder pre-filled from an execution record.
    pub fn for_execution(event_type: AuditEventType, execution: &ActionExecution) -> AuditEventBuilder {
        AuditEventBuilder::new(event_type, &execution.id, &execution.participant_id)
            .rule_code(&execution.rule_code)
            .action_type(execution.terms.action_type)
            .status(execution.status)
    }

    /// Format the event as a human-readable log line.
    ///
    /// Format: `[timestamp] EVENT_TYPE participant=... execution=... [rule=...]`
    pub fn to_log_line(&self) -> String {
        let mut line = format!(
            "[{}] {} participant={} execution={}",
            self.occurred_at.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
            self.event_type,
            self.participant_id,
            self.execution_id,
        );

        if let Some(ref rule_code) = self.rule_code {
            line.push_str(&format!(" rule={}", rule_code));
        }

        if let Some(action_type) = self.action_type {
            line.push_str(&format!(" action={}", action_type));
        }

        if let Some(status) = self.status {
            line.push_str(&format!(" status={}", status));
        }

        if let Some(ref actor) = self.actor {
            line.push_str(&format!(" actor={}", actor));
        }

        if let Some(ref approver) = self.approver {
            line.push_str(&format!(" approver={}", approver));
        }

        if let Some(ref operation) = self.operation {
            line.push_str(&format!(" operation={}", operation));
        }

        if let Some(ref reason) = self.reason {
            line.push_str(&format!(" reason=\"{}\"", reason.replace('"', "'")));
        }

        if let Some(ref error) = self.error {
            line.push_str(&format!(" error=\"{}\"", error.replace('"', "'")));
        }

        line
    }
}

/// Builder for creating audit events.
#[derive(Debug)]
pub struct AuditEventBuilder {
    event: AuditEvent,
}

impl AuditEventBuilder {
    /// Create a new builder with required fields.
    pub fn new(
        event_type: AuditEventType,
        execution_id: impl Into<String>,
        participant_id: impl Into<String>,
    ) -> Self {
        Self {
            event: AuditEvent::new(event_type, execution_id, participant_id),
        }
    }

    pub fn rule_code(mut self, rule_code: impl Into<String>) -> Self {
        self.event.rule_code = Some(rule_code.into());
        self
    }

    pub fn action_type(mut self, action_type: ActionType) -> Self {
        self.event.action_type = Some(action_type);
        self
    }

    pub fn status(mut self, status: ExecutionStatus) -> Self {
        self.event.status = Some(status);
        self
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.event.actor = Some(actor.into());
        self
    }

    pub fn approver(mut self, approver: impl Into<String>) -> Self {
        self.event.approver = Some(approver.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.event.reason = Some(reason.into());
        self
    }

    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        self.event.operation = Some(operation.into());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.event.error = Some(error.into());
        self
    }

    pub fn meta(mut self, meta: serde_json::Value) -> Self {
        self.event.meta = meta;
        self
    }

    /// Build the audit event.
    pub fn build(self) -> AuditEvent {
        self.event
    }
}
