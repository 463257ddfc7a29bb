//! `appraisal status` and `appraisal gate` command implementations.

use anyhow::Result;
use appraisal_actions::{FinalizationDecision, FinalizationGate};
use appraisal_core::EngineConfig;

use super::open_lifecycle;

/// Print every execution of a participant.
pub async fn status(config: &EngineConfig, participant: &str, json: bool) -> Result<()> {
    let executions = open_lifecycle(config)?.list(participant).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&executions)?);
        return Ok(());
    }

    if executions.is_empty() {
        println!("No executions for {}", participant);
        return Ok(());
    }

    println!(
        "{:<36}  {:<24}  {:<24}  {:<10}  {:<9}",
        "ID", "RULE", "ACTION", "STATUS", "MANDATORY"
    );
    for e in &executions {
        println!(
            "{:<36}  {:<24}  {:<24}  {:<10}  {:<9}",
            e.id,
            e.rule_code,
            e.terms.action_type.as_str(),
            e.status.to_string(),
            if e.terms.is_mandatory { "yes" } else { "no" }
        );
    }
    Ok(())
}

/// Print the finalization decision. Returns whether finalization may proceed.
pub async fn gate(config: &EngineConfig, participant: &str) -> Result<bool> {
    let lifecycle = open_lifecycle(config)?;
    let gate = FinalizationGate::new(lifecycle.store().clone());

    let advisory = gate.advisory_pending(participant).await?;
    match gate.decide(participant).await? {
        FinalizationDecision::Allowed => {
            println!("✅ {} may be finalized", participant);
            if !advisory.is_empty() {
                println!("   {} advisory action(s) still pending", advisory.len());
            }
            Ok(true)
        }
        FinalizationDecision::Blocked { mandatory } => {
            println!("⛔ {} is blocked by {} mandatory action(s):", participant, mandatory.len());
            for e in &mandatory {
                println!(
                    "  • [{}] {} {} ({})",
                    e.terms.priority, e.rule_code, e.terms.action_type, e.id
                );
            }
            println!("   Mandatory actions can only be executed or overridden.");
            Ok(false)
        }
    }
}
