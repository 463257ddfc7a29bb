//! Condition checks for a single rule.

use appraisal_core::{ActionRule, ConditionType, Section, SectionScoreHistory, SectionScores};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::combine::Combination;

/// Why a rule was not evaluated, or could not fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The rule is switched off.
    Inactive,
    /// No current score for the rule's section.
    SectionNotScored { section: Section },
    /// The current score is NaN or infinite.
    InvalidScore { section: Section },
    /// Fewer historical cycles than the condition needs.
    InsufficientHistory {
        section: Section,
        required: usize,
        available: usize,
    },
    /// Another rule in the same template shares this rule_code.
    DuplicateRuleCode,
    /// The rule definition cannot be evaluated.
    Malformed { detail: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Inactive => write!(f, "rule is inactive"),
            SkipReason::SectionNotScored { section } => {
                write!(f, "section '{}' has no current score", section)
            }
            SkipReason::InvalidScore { section } => {
                write!(f, "section '{}' score is not a finite number", section)
            }
            SkipReason::InsufficientHistory {
                section,
                required,
                available,
            } => write!(
                f,
                "section '{}' needs {} prior cycles, {} available",
                section, required, available
            ),
            SkipReason::DuplicateRuleCode => write!(f, "rule_code is not unique in its template"),
            SkipReason::Malformed { detail } => write!(f, "{}", detail),
        }
    }
}

/// Result of checking one rule's condition.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionOutcome {
    /// The condition holds.
    Fired {
        /// Current score of the section.
        score: f64,
        /// Value compared against the threshold.
        observed: f64,
    },
    /// The condition was evaluated and does not hold.
    NotMet,
    /// The condition could not be evaluated.
    Skipped(SkipReason),
}

/// Check a rule's condition against one participant's scores.
///
/// The rule is assumed active and structurally valid.
pub fn check_condition(
    rule: &ActionRule,
    scores: &SectionScores,
    history: &SectionScoreHistory,
) -> ConditionOutcome {
    let section = rule.condition_section;
    let Some(&score) = scores.get(&section) else {
        return ConditionOutcome::Skipped(SkipReason::SectionNotScored { section });
    };
    if !score.is_finite() {
        return ConditionOutcome::Skipped(SkipReason::InvalidScore { section });
    }

    let op = rule.condition_operator;
    let threshold = rule.condition_threshold;
    let past = history.get(&section).map(Vec::as_slice).unwrap_or(&[]);

    let verdict = match rule.condition_type {
        ConditionType::ScoreBelow
        | ConditionType::ScoreAbove
        | ConditionType::GapDetected
        | ConditionType::CompetencyGap
        | ConditionType::GoalNotMet => Some((op.compare(score, threshold), score)),

        ConditionType::RepeatedLow => {
            let required = rule.condition_cycles.unwrap_or(0) as usize;
            if required == 0 {
                return ConditionOutcome::Skipped(SkipReason::Malformed {
                    detail: "repeated_low requires a positive condition_cycles".to_string(),
                });
            }
            if past.len() < required {
                return ConditionOutcome::Skipped(SkipReason::InsufficientHistory {
                    section,
                    required,
                    available: past.len(),
                });
            }
            let window = &past[..required];
            let held = Combination::All.combine(window.iter().map(|s| op.compare(*s, threshold)));
            Some((held, window[0]))
        }

        ConditionType::ImprovementTrend => match past.first() {
            Some(previous) => {
                let delta = score - previous;
                Some((op.compare(delta, threshold), delta))
            }
            None => None,
        },
    };

    match verdict {
        Some((true, observed)) => ConditionOutcome::Fired { score, observed },
        Some((false, _)) => ConditionOutcome::NotMet,
        None => ConditionOutcome::Skipped(SkipReason::InsufficientHistory {
            section,
            required: 1,
            available: 0,
        }),
    }
}
