//! Action rule definitions.
//!
//! A rule pairs a typed condition over one appraisal section with a follow-up
//! action. Condition and action kinds are closed enumerations; every place that
//! interprets them matches exhaustively.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Absolute tolerance used by `=` and `!=`.
pub const EQUALITY_TOLERANCE: f64 = 1e-9;

/// Declares a closed enumeration whose variants serialize to fixed wire strings.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $wire)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The wire string for this variant.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(CoreError::UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum! {
    /// What a rule's condition inspects.
    pub enum ConditionType {
        ScoreBelow => "score_below",
        ScoreAbove => "score_above",
        GapDetected => "gap_detected",
        /// Every one of the last `condition_cycles` historical scores passes the test.
        RepeatedLow => "repeated_low",
        /// The delta against the preceding cycle passes the test.
        ImprovementTrend => "improvement_trend",
        CompetencyGap => "competency_gap",
        GoalNotMet => "goal_not_met",
    }
}

wire_enum! {
    /// A scored dimension of an appraisal.
    pub enum Section {
        Goals => "goals",
        Competencies => "competencies",
        Responsibilities => "responsibilities",
        Feedback360 => "feedback_360",
        Values => "values",
        Overall => "overall",
    }
}

wire_enum! {
    /// Comparison applied as `value <op> threshold`.
    pub enum Operator {
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Eq => "=",
        Ne => "!=",
    }
}

wire_enum! {
    /// Follow-up action requested when a rule fires.
    pub enum ActionType {
        CreateIdp => "create_idp",
        CreatePip => "create_pip",
        SuggestSuccession => "suggest_succession",
        BlockFinalization => "block_finalization",
        RequireComment => "require_comment",
        NotifyHr => "notify_hr",
        ScheduleCoaching => "schedule_coaching",
        RequireDevelopmentPlan => "require_development_plan",
    }
}

/// Kind of document an executed action must link to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Idp,
    Pip,
    SuccessionNomination,
}

impl Operator {
    /// Evaluate `lhs <op> rhs`.
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Operator::Lt => lhs < rhs,
            Operator::Le => lhs <= rhs,
            Operator::Gt => lhs > rhs,
            Operator::Ge => lhs >= rhs,
            Operator::Eq => (lhs - rhs).abs() <= EQUALITY_TOLERANCE,
            Operator::Ne => (lhs - rhs).abs() > EQUALITY_TOLERANCE,
        }
    }
}

impl ConditionType {
    /// Whether the condition reads the section's score history.
    pub fn uses_history(&self) -> bool {
        match self {
            ConditionType::RepeatedLow | ConditionType::ImprovementTrend => true,
            ConditionType::ScoreBelow
            | ConditionType::ScoreAbove
            | ConditionType::GapDetected
            | ConditionType::CompetencyGap
            | ConditionType::GoalNotMet => false,
        }
    }
}

impl ActionType {
    /// The outcome link `execute` must carry for this action, if any.
    pub fn required_outcome(&self) -> Option<OutcomeKind> {
        match self {
            ActionType::CreateIdp => Some(OutcomeKind::Idp),
            ActionType::CreatePip => Some(OutcomeKind::Pip),
            ActionType::SuggestSuccession => Some(OutcomeKind::SuccessionNomination),
            ActionType::BlockFinalization
            | ActionType::RequireComment
            | ActionType::NotifyHr
            | ActionType::ScheduleCoaching
            | ActionType::RequireDevelopmentPlan => None,
        }
    }
}

/// A template-scoped condition/action definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRule {
    pub id: String,

    /// Owning template. Filled from the catalog key when omitted in YAML.
    #[serde(default)]
    pub template_id: String,

    /// Unique within the template.
    pub rule_code: String,

    /// Firing order, ascending. Ties break on `rule_code`.
    #[serde(default)]
    pub display_order: i32,

    pub condition_type: ConditionType,
    pub condition_section: Section,
    pub condition_operator: Operator,
    pub condition_threshold: f64,

    /// Window size for `repeated_low`; ignored by other condition types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_cycles: Option<u32>,

    pub action_type: ActionType,

    #[serde(default)]
    pub action_is_mandatory: bool,

    /// Lower resolves first among pending mandatory actions.
    #[serde(default)]
    pub action_priority: i32,

    #[serde(default = "default_true")]
    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Snapshot of a rule's action fields, carried by triggers and executions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTerms {
    pub action_type: ActionType,
    pub is_mandatory: bool,
    pub priority: i32,
}

impl ActionRule {
    /// The action fields of this rule.
    pub fn terms(&self) -> ActionTerms {
        ActionTerms {
            action_type: self.action_type,
            is_mandatory: self.action_is_mandatory,
            priority: self.action_priority,
        }
    }

    /// Check that the rule can be evaluated at all.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.condition_threshold.is_finite() {
            return Err(CoreError::MalformedRule {
                rule_code: self.rule_code.clone(),
                reason: format!("threshold {} is not a finite number", self.condition_threshold),
            });
        }

        if self.condition_type == ConditionType::RepeatedLow {
            match self.condition_cycles {
                Some(n) if n > 0 => {}
                _ => {
                    return Err(CoreError::MalformedRule {
                        rule_code: self.rule_code.clone(),
                        reason: "repeated_low requires a positive condition_cycles".to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
