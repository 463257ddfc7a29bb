//! `appraisal evaluate` command implementation.

use anyhow::{Context, Result};
use appraisal_actions::{ActionEngine, StaticRuleCatalog, StaticScoreProvider};
use appraisal_core::EngineConfig;
use std::path::Path;
use std::sync::Arc;

use super::open_lifecycle;

pub async fn run(
    config: &EngineConfig,
    participant: &str,
    template: &str,
    scores_path: &Path,
    catalog_path: Option<&Path>,
    triggered_by: Option<&str>,
) -> Result<()> {
    let catalog_path = catalog_path
        .or(config.catalog_file.as_deref())
        .context("No rule catalog: pass --catalog or set catalog_file in the configuration")?;

    let catalog = StaticRuleCatalog::from_file(catalog_path)
        .with_context(|| format!("Failed to load catalog {}", catalog_path.display()))?;
    let scores = StaticScoreProvider::from_file(scores_path)
        .with_context(|| format!("Failed to load scores {}", scores_path.display()))?;

    let engine = ActionEngine::new(Arc::new(catalog), Arc::new(scores), open_lifecycle(config)?);
    let report = engine
        .process_participant(participant, template, triggered_by)
        .await?;

    println!(
        "📊 {}: {} rule(s) fired, {} skipped",
        participant,
        report.evaluation.triggers.len(),
        report.evaluation.skipped.len()
    );
    for execution in &report.executions {
        let kind = if execution.terms.is_mandatory {
            "mandatory"
        } else {
            "advisory"
        };
        println!(
            "  • {} {} ({}) -> {}",
            execution.rule_code, execution.terms.action_type, kind, execution.id
        );
    }
    for skipped in &report.evaluation.skipped {
        println!("  ○ {} skipped: {}", skipped.rule_code, skipped.reason);
    }
    for failure in &report.failures {
        println!("  ✗ {} not registered: {}", failure.rule_code, failure.error);
    }

    if !report.failures.is_empty() {
        anyhow::bail!("{} trigger(s) could not be registered", report.failures.len());
    }
    Ok(())
}
