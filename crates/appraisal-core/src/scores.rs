//! Section scores supplied by the score provider.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::rule::Section;

/// Current-cycle score per section. Absent sections are not scored.
pub type SectionScores = BTreeMap<Section, f64>;

/// Prior-cycle scores per section, most recent first. Excludes the current cycle.
pub type SectionScoreHistory = BTreeMap<Section, Vec<f64>>;

/// Scores of one participant, as read from a scores file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantScores {
    #[serde(default)]
    pub current: SectionScores,

    #[serde(default)]
    pub history: SectionScoreHistory,
}
