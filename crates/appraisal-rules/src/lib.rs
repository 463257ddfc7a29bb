//! Appraisal Rule Evaluation
//!
//! Decides which action rules fire for a participant's section scores.
//!
//! - [`condition`]: per-rule condition checks, including the multi-cycle
//!   `repeated_low` and `improvement_trend` conditions
//! - [`combine`]: the named policy for folding several boolean facts
//! - [`evaluator`]: the batch evaluator with deterministic firing order
//!
//! Evaluation is pure and synchronous. Operators are honored literally for
//! every condition type; `repeated_low` with `>` means "repeatedly above".

pub mod combine;
pub mod condition;
pub mod evaluator;

pub use combine::Combination;
pub use condition::{ConditionOutcome, SkipReason, check_condition};
pub use evaluator::{Evaluation, RuleEvaluator, SkippedRule};
