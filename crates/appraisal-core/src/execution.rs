//! Triggers and execution records.
//!
//! A [`Trigger`] is the in-memory result of a rule matching. An
//! [`ActionExecution`] is the persistent audit record of one firing and its
//! lifecycle:
//!
//! ```text
//! pending --execute-->            executed --acknowledge--> completed
//! pending --override (approved)-> overridden
//! pending --dismiss (advisory)--> dismissed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rule::{ActionTerms, OutcomeKind, Section};

/// A rule that fired for one participant's scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub rule_id: String,
    pub rule_code: String,
    pub template_id: String,
    pub section: Section,
    /// Current score of the section.
    pub score: f64,
    /// The value that was compared: the score itself, or the delta for trends.
    pub observed: f64,
    pub terms: ActionTerms,
}

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Executed,
    Overridden,
    Dismissed,
    Completed,
}

impl ExecutionStatus {
    /// Everything except `pending` is permanent.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Pending)
    }

    /// Whether the status satisfies a mandatory action.
    pub fn resolves_mandatory(&self) -> bool {
        match self {
            ExecutionStatus::Executed | ExecutionStatus::Overridden | ExecutionStatus::Completed => {
                true
            }
            ExecutionStatus::Pending | ExecutionStatus::Dismissed => false,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Executed => "executed",
            ExecutionStatus::Overridden => "overridden",
            ExecutionStatus::Dismissed => "dismissed",
            ExecutionStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Document created by executing an action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OutcomeLink {
    #[default]
    None,
    Idp(String),
    Pip(String),
    SuccessionNomination(String),
}

impl OutcomeLink {
    /// The kind of document linked, if any.
    pub fn kind(&self) -> Option<OutcomeKind> {
        match self {
            OutcomeLink::None => None,
            OutcomeLink::Idp(_) => Some(OutcomeKind::Idp),
            OutcomeLink::Pip(_) => Some(OutcomeKind::Pip),
            OutcomeLink::SuccessionNomination(_) => Some(OutcomeKind::SuccessionNomination),
        }
    }

    /// Whether this link is what `required` asks for. Empty ids never match.
    pub fn satisfies(&self, required: Option<OutcomeKind>) -> bool {
        let id_present = match self {
            OutcomeLink::None => true,
            OutcomeLink::Idp(id) | OutcomeLink::Pip(id) | OutcomeLink::SuccessionNomination(id) => {
                !id.trim().is_empty()
            }
        };
        id_present && self.kind() == required
    }
}

/// One firing instance of a rule for one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecution {
    pub id: String,
    pub participant_id: String,
    pub rule_id: String,
    pub rule_code: String,
    pub template_id: String,
    pub terms: ActionTerms,

    pub triggered_at: DateTime<Utc>,
    pub triggered_score: f64,
    pub triggered_section: Section,
    /// Actor whose event caused the evaluation, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<String>,

    pub status: ExecutionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_by: Option<String>,
    #[serde(default)]
    pub outcome: OutcomeLink,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_approved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_approved_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dismissed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acknowledgment_notes: Option<String>,
}

impl ActionExecution {
    /// Create a pending execution for a trigger.
    pub fn pending(
        participant_id: impl Into<String>,
        trigger: &Trigger,
        triggered_by: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            participant_id: participant_id.into(),
            rule_id: trigger.rule_id.clone(),
            rule_code: trigger.rule_code.clone(),
            template_id: trigger.template_id.clone(),
            terms: trigger.terms,
            triggered_at: Utc::now(),
            triggered_score: trigger.score,
            triggered_section: trigger.section,
            triggered_by,
            status: ExecutionStatus::Pending,
            executed_at: None,
            executed_by: None,
            outcome: OutcomeLink::None,
            override_reason: None,
            override_approved_by: None,
            override_approved_at: None,
            dismissed_by: None,
            dismissed_at: None,
            acknowledged_by: None,
            acknowledged_at: None,
            acknowledgment_notes: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == ExecutionStatus::Pending
    }

    /// Pending and mandatory: blocks finalization.
    pub fn is_blocking(&self) -> bool {
        self.is_pending() && self.terms.is_mandatory
    }

    pub fn created_idp_id(&self) -> Option<&str> {
        match &self.outcome {
            OutcomeLink::Idp(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn created_pip_id(&self) -> Option<&str> {
        match &self.outcome {
            OutcomeLink::Pip(id) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn created_succession_nomination_id(&self) -> Option<&str> {
        match &self.outcome {
            OutcomeLink::SuccessionNomination(id) => Some(id.as_str()),
            _ => None,
        }
    }

    /// Mark as executed.
    pub fn execute(&mut self, by: impl Into<String>, outcome: OutcomeLink) {
        self.status = ExecutionStatus::Executed;
        self.executed_at = Some(Utc::now());
        self.executed_by = Some(by.into());
        self.outcome = outcome;
    }

    /// Mark as overridden.
    pub fn approve_override(&mut self, reason: impl Into<String>, approved_by: impl Into<String>) {
        self.status = ExecutionStatus::Overridden;
        self.override_reason = Some(reason.into());
        self.override_approved_by = Some(approved_by.into());
        self.override_approved_at = Some(Utc::now());
    }

    /// Mark as dismissed.
    pub fn dismiss(&mut self, by: impl Into<String>) {
        self.status = ExecutionStatus::Dismissed;
        self.dismissed_by = Some(by.into());
        self.dismissed_at = Some(Utc::now());
    }

    /// Record an acknowledgment and complete the execution.
    pub fn acknowledge(&mut self, by: impl Into<String>, notes: Option<String>) {
        self.status = ExecutionStatus::Completed;
        self.acknowledged_by = Some(by.into());
        self.acknowledged_at = Some(Utc::now());
        self.acknowledgment_notes = notes;
    }
}
