//! Collaborator seams: where rules and scores come from.
//!
//! Both are read on every call; caching, if any, belongs to the
//! implementation.

use appraisal_core::{
    ActionRule, ConfigError, ParticipantScores, RuleCatalogDefinition, SectionScoreHistory,
    SectionScores,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Source of action rules.
#[async_trait]
pub trait RuleCatalog: Send + Sync {
    /// Active rules of an appraisal template.
    async fn active_rules(&self, template_id: &str) -> anyhow::Result<Vec<ActionRule>>;
}

/// Source of section scores.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    /// Current-cycle scores of a participant.
    async fn current_scores(&self, participant_id: &str) -> anyhow::Result<SectionScores>;

    /// Prior-cycle scores of a participant, most recent first.
    async fn score_history(&self, participant_id: &str) -> anyhow::Result<SectionScoreHistory>;
}

/// Rule catalog backed by a loaded catalog definition.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleCatalog {
    definition: RuleCatalogDefinition,
}

impl StaticRuleCatalog {
    pub fn new(definition: RuleCatalogDefinition) -> Self {
        Self { definition }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(RuleCatalogDefinition::from_file(path)?))
    }

    pub fn definition(&self) -> &RuleCatalogDefinition {
        &self.definition
    }
}

#[async_trait]
impl RuleCatalog for StaticRuleCatalog {
    async fn active_rules(&self, template_id: &str) -> anyhow::Result<Vec<ActionRule>> {
        if !self.definition.templates.contains_key(template_id) {
            anyhow::bail!("unknown appraisal template: {}", template_id);
        }
        Ok(self.definition.active_rules(template_id))
    }
}

/// Scores file layout:
///
/// ```yaml
/// participants:
///   emp-42:
///     current: { goals: 2.5, overall: 3.1 }
///     history: { goals: [2.1, 2.3, 2.0] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoresFile {
    #[serde(default)]
    pub participants: BTreeMap<String, ParticipantScores>,
}

/// Score provider backed by fixed per-participant scores.
#[derive(Debug, Clone, Default)]
pub struct StaticScoreProvider {
    participants: BTreeMap<String, ParticipantScores>,
}

impl StaticScoreProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load scores from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse scores from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: ScoresFile = serde_yaml::from_str(content)?;
        Ok(Self {
            participants: file.participants,
        })
    }

    /// Add or replace one participant's scores.
    pub fn with_participant(
        mut self,
        participant_id: impl Into<String>,
        scores: ParticipantScores,
    ) -> Self {
        self.participants.insert(participant_id.into(), scores);
        self
    }

    fn lookup(&self, participant_id: &str) -> anyhow::Result<&ParticipantScores> {
        self.participants
            .get(participant_id)
            .ok_or_else(|| anyhow::anyhow!("no scores for participant {}", participant_id))
    }
}

#[async_trait]
impl ScoreProvider for StaticScoreProvider {
    async fn current_scores(&self, participant_id: &str) -> anyhow::Result<SectionScores> {
        Ok(self.lookup(participant_id)?.current.clone())
    }

    async fn score_history(&self, participant_id: &str) -> anyhow::Result<SectionScoreHistory> {
        Ok(self.lookup(participant_id)?.history.clone())
    }
}
