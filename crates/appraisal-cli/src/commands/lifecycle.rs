//! `appraisal execute|override|dismiss|acknowledge` command implementations.

use anyhow::Result;
use appraisal_actions::{OverrideContext, OverrideWorkflow};
use appraisal_core::{ActionExecution, EngineConfig, OutcomeLink};

use super::open_lifecycle;

/// Build the outcome link from the mutually exclusive `--idp/--pip/--succession` flags.
pub fn outcome_link(
    idp: Option<String>,
    pip: Option<String>,
    succession: Option<String>,
) -> OutcomeLink {
    match (idp, pip, succession) {
        (Some(id), _, _) => OutcomeLink::Idp(id),
        (_, Some(id), _) => OutcomeLink::Pip(id),
        (_, _, Some(id)) => OutcomeLink::SuccessionNomination(id),
        _ => OutcomeLink::None,
    }
}

fn print_execution(execution: &ActionExecution) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(execution)?);
    Ok(())
}

pub async fn execute(
    config: &EngineConfig,
    execution_id: &str,
    by: &str,
    outcome: OutcomeLink,
) -> Result<()> {
    let executed = open_lifecycle(config)?
        .execute(execution_id, by, outcome)
        .await?;
    println!("✅ Executed {}", executed.id);
    print_execution(&executed)
}

pub async fn override_execution(
    config: &EngineConfig,
    execution_id: &str,
    reason: &str,
    approved_by: &str,
    reviewer: &str,
    triggered_by: Option<String>,
) -> Result<()> {
    let context = OverrideContext {
        reviewer_id: reviewer.to_string(),
        triggered_by,
    };
    let overridden = OverrideWorkflow::new(open_lifecycle(config)?)
        .override_execution(execution_id, reason, approved_by, &context)
        .await?;
    println!("✅ Overridden {} (approved by {})", overridden.id, approved_by);
    print_execution(&overridden)
}

pub async fn dismiss(config: &EngineConfig, execution_id: &str, by: &str) -> Result<()> {
    let dismissed = open_lifecycle(config)?.dismiss(execution_id, by).await?;
    println!("✅ Dismissed {}", dismissed.id);
    print_execution(&dismissed)
}

pub async fn acknowledge(
    config: &EngineConfig,
    execution_id: &str,
    by: &str,
    notes: Option<String>,
) -> Result<()> {
    let record = open_lifecycle(config)?
        .acknowledge(execution_id, by, notes)
        .await?;
    if record.acknowledged_by.is_some() {
        println!("✅ Acknowledged {}", record.id);
    } else {
        println!("ℹ️  {} is {}; acknowledgment ignored", record.id, record.status);
    }
    print_execution(&record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_link_from_flags() {
        assert_eq!(outcome_link(None, None, None), OutcomeLink::None);
        assert_eq!(
            outcome_link(Some("idp-1".to_string()), None, None),
            OutcomeLink::Idp("idp-1".to_string())
        );
        assert_eq!(
            outcome_link(None, None, Some("sn-1".to_string())),
            OutcomeLink::SuccessionNomination("sn-1".to_string())
        );
    }
}
