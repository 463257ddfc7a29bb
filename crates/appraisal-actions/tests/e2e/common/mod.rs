//! Shared test infrastructure for appraisal action end-to-end tests.
//!
//! This module provides:
//! - A scratch directory holding one file-backed store per test
//! - Fixtures (rule catalog, participant scores)
//! - Engine construction helpers

#![allow(dead_code)]

use appraisal_actions::{
    ActionEngine, FileExecutionStore, LifecycleManager, StaticRuleCatalog, StaticScoreProvider,
};
use appraisal_audit::AuditLogger;
use appraisal_core::{
    ActionRule, ActionType, ConditionType, Operator, ParticipantScores, RuleCatalogDefinition,
    Section, SectionScoreHistory, SectionScores,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

// =============================================================================
// FIXTURES
// =============================================================================

pub const TEMPLATE: &str = "annual-review";
pub const REVIEWER: &str = "reviewer-1";
pub const HR_MANAGER: &str = "hr-manager-1";

/// A rule with neutral defaults.
pub fn rule(id: &str, code: &str, section: Section, threshold: f64) -> ActionRule {
    ActionRule {
        id: id.to_string(),
        template_id: TEMPLATE.to_string(),
        rule_code: code.to_string(),
        display_order: 0,
        condition_type: ConditionType::ScoreBelow,
        condition_section: section,
        condition_operator: Operator::Lt,
        condition_threshold: threshold,
        condition_cycles: None,
        action_type: ActionType::NotifyHr,
        action_is_mandatory: false,
        action_priority: 0,
        is_active: true,
        description: None,
    }
}

/// The single mandatory rule: goals below 3 blocks finalization.
pub fn block_finalization_rule() -> ActionRule {
    ActionRule {
        action_type: ActionType::BlockFinalization,
        action_is_mandatory: true,
        action_priority: 1,
        ..rule("r-low-goals", "LOW_GOALS", Section::Goals, 3.0)
    }
}

/// A catalog with one template holding `rules`.
pub fn catalog(rules: Vec<ActionRule>) -> RuleCatalogDefinition {
    RuleCatalogDefinition {
        templates: BTreeMap::from([(TEMPLATE.to_string(), rules)]),
        ..Default::default()
    }
}

/// Scores for one participant.
pub fn scores(
    participant_id: &str,
    current: &[(Section, f64)],
    history: &[(Section, Vec<f64>)],
) -> StaticScoreProvider {
    StaticScoreProvider::new().with_participant(
        participant_id,
        ParticipantScores {
            current: current.iter().cloned().collect::<SectionScores>(),
            history: history.iter().cloned().collect::<SectionScoreHistory>(),
        },
    )
}

// =============================================================================
// TEST CONTEXT
// =============================================================================

pub struct TestContext {
    root: TempDir,
    next: AtomicUsize,
}

impl TestContext {
    pub fn setup() -> Result<Self, String> {
        let root = TempDir::new().map_err(|e| format!("Failed to create temp dir: {}", e))?;
        println!("📁 Store root: {}", root.path().display());
        Ok(Self {
            root,
            next: AtomicUsize::new(0),
        })
    }

    /// A fresh, empty store directory.
    pub fn store_dir(&self) -> PathBuf {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        self.root.path().join(format!("store-{}", n))
    }

    /// A lifecycle manager over the store in `dir`.
    pub fn lifecycle_at(&self, dir: &PathBuf) -> LifecycleManager {
        let store = FileExecutionStore::new(dir).expect("open store");
        LifecycleManager::new(Arc::new(store), Arc::new(AuditLogger::in_memory()))
    }

    /// A lifecycle manager over a fresh store.
    pub fn lifecycle(&self) -> LifecycleManager {
        self.lifecycle_at(&self.store_dir())
    }

    /// An engine over a fresh store.
    pub fn engine(&self, catalog: RuleCatalogDefinition, scores: StaticScoreProvider) -> ActionEngine {
        ActionEngine::new(
            Arc::new(StaticRuleCatalog::new(catalog)),
            Arc::new(scores),
            self.lifecycle(),
        )
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        println!("🧹 Cleaned up store directories");
    }
}
