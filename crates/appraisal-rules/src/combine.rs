//! Named policies for combining boolean facts.
//!
//! Used by multi-cycle conditions and by the override approver check.

use serde::{Deserialize, Serialize};

/// How several facts fold into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    /// Every fact holds. Holds vacuously for no facts.
    All,
    /// At least one fact holds. Fails for no facts.
    Any,
}

impl Combination {
    /// Fold the facts.
    pub fn combine<I>(self, facts: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut facts = facts.into_iter();
        match self {
            Combination::All => facts.all(|fact| fact),
            Combination::Any => facts.any(|fact| fact),
        }
    }
}
