//! Rule evaluator.
//!
//! The `RuleEvaluator` decides which rules of a template fire for one
//! participant's scores. It is pure: it reads its inputs and returns
//! [`Trigger`] values. Creating execution records is the lifecycle manager's
//! job.
//!
//! Evaluation never fails as a whole. A rule that cannot be evaluated
//! (inactive, section not scored, short history, malformed, duplicated
//! `rule_code`) is recorded as skipped and the rest of the batch proceeds.

use appraisal_core::{ActionRule, SectionScoreHistory, SectionScores, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::condition::{ConditionOutcome, SkipReason, check_condition};

/// A rule that did not fire because it could not be evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule_id: String,
    pub rule_code: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Full result of one evaluation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Fired rules, in firing order.
    pub triggers: Vec<Trigger>,
    /// Rules that could not be evaluated, in firing order.
    pub skipped: Vec<SkippedRule>,
}

/// Evaluates action rules against section scores.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Create a new evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Return the triggers for every rule that fires, in firing order.
    pub fn evaluate(
        &self,
        scores: &SectionScores,
        history: &SectionScoreHistory,
        rules: &[ActionRule],
    ) -> Vec<Trigger> {
        self.evaluate_with_report(scores, history, rules).triggers
    }

    /// Evaluate and also report why rules were skipped.
    ///
    /// Firing order is `(display_order, rule_code, id)` ascending, independent
    /// of the order rules are supplied in.
    pub fn evaluate_with_report(
        &self,
        scores: &SectionScores,
        history: &SectionScoreHistory,
        rules: &[ActionRule],
    ) -> Evaluation {
        let mut ordered: Vec<&ActionRule> = rules.iter().collect();
        ordered.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.rule_code.cmp(&b.rule_code))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut code_counts: HashMap<(&str, &str), usize> = HashMap::new();
        for rule in rules {
            *code_counts
                .entry((rule.template_id.as_str(), rule.rule_code.as_str()))
                .or_default() += 1;
        }

        let mut evaluation = Evaluation::default();

        for rule in ordered {
            let duplicated = code_counts
                .get(&(rule.template_id.as_str(), rule.rule_code.as_str()))
                .is_some_and(|n| *n > 1);

            let outcome = if !rule.is_active {
                ConditionOutcome::Skipped(SkipReason::Inactive)
            } else if duplicated {
                ConditionOutcome::Skipped(SkipReason::DuplicateRuleCode)
            } else if let Err(e) = rule.validate() {
                ConditionOutcome::Skipped(SkipReason::Malformed {
                    detail: e.to_string(),
                })
            } else {
                check_condition(rule, scores, history)
            };

            match outcome {
                ConditionOutcome::Fired { score, observed } => {
                    tracing::debug!(
                        rule_code = %rule.rule_code,
                        section = %rule.condition_section,
                        score,
                        observed,
                        "Rule fired"
                    );
                    evaluation.triggers.push(Trigger {
                        rule_id: rule.id.clone(),
                        rule_code: rule.rule_code.clone(),
                        template_id: rule.template_id.clone(),
                        section: rule.condition_section,
                        score,
                        observed,
                        terms: rule.terms(),
                    });
                }
                ConditionOutcome::NotMet => {
                    tracing::trace!(rule_code = %rule.rule_code, "Rule condition not met");
                }
                ConditionOutcome::Skipped(reason) => {
                    if matches!(
                        reason,
                        SkipReason::DuplicateRuleCode | SkipReason::Malformed { .. }
                    ) {
                        tracing::warn!(rule_code = %rule.rule_code, %reason, "Skipping rule");
                    } else {
                        tracing::debug!(rule_code = %rule.rule_code, %reason, "Skipping rule");
                    }
                    evaluation.skipped.push(SkippedRule {
                        rule_id: rule.id.clone(),
                        rule_code: rule.rule_code.clone(),
                        reason,
                    });
                }
            }
        }

        tracing::info!(
            rules = rules.len(),
            fired = evaluation.triggers.len(),
            skipped = evaluation.skipped.len(),
            "Evaluated action rules"
        );

        evaluation
    }
}
