//! Finalization gate tests.
//!
//! Covers:
//! - Mandatory pending executions block, advisory ones never do
//! - Resolution by execute or override unblocks
//! - The full scenario from low goals score to finalization

use super::common::*;
use appraisal_actions::{FinalizationDecision, OverrideContext};
use appraisal_core::{ActionRule, ActionType, OutcomeLink, Section};

// =============================================================================
// GATING
// =============================================================================

pub async fn test_mandatory_blocks_among_advisory(ctx: &TestContext) {
    println!("  🧪 test_mandatory_blocks_among_advisory");

    let mut idp = rule("r-idp", "LOW_COMPETENCIES", Section::Competencies, 3.0);
    idp.action_type = ActionType::CreateIdp;
    idp.action_is_mandatory = true;

    let engine = ctx.engine(
        catalog(vec![
            idp,
            rule("r-notify", "LOW_VALUES", Section::Values, 3.0),
            rule("r-overall", "LOW_OVERALL", Section::Overall, 3.0),
        ]),
        scores(
            "emp-1",
            &[
                (Section::Competencies, 2.0),
                (Section::Values, 2.0),
                (Section::Overall, 2.0),
            ],
            &[],
        ),
    );
    engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    let gate = engine.gate();

    assert!(gate.has_blocking_actions("emp-1").await.unwrap());
    let mandatory = gate.mandatory_pending("emp-1").await.unwrap();
    assert_eq!(mandatory.len(), 1);
    assert_eq!(gate.advisory_pending("emp-1").await.unwrap().len(), 2);

    // Resolving the advisory actions changes nothing
    for advisory in gate.advisory_pending("emp-1").await.unwrap() {
        engine.lifecycle().dismiss(&advisory.id, REVIEWER).await.unwrap();
    }
    assert!(gate.has_blocking_actions("emp-1").await.unwrap());

    engine
        .lifecycle()
        .execute(&mandatory[0].id, REVIEWER, OutcomeLink::Idp("idp-77".to_string()))
        .await
        .unwrap();
    assert!(!gate.has_blocking_actions("emp-1").await.unwrap());

    println!("     ✓ Only the mandatory execution gated finalization");
}

pub async fn test_acknowledgment_does_not_change_gating(ctx: &TestContext) {
    println!("  🧪 test_acknowledgment_does_not_change_gating");

    let mut pip: ActionRule = block_finalization_rule();
    pip.action_type = ActionType::CreatePip;

    let engine = ctx.engine(
        catalog(vec![pip]),
        scores("emp-1", &[(Section::Goals, 1.5)], &[]),
    );
    let report = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    let id = report.executions[0].id.clone();

    engine
        .lifecycle()
        .execute(&id, REVIEWER, OutcomeLink::Pip("pip-5".to_string()))
        .await
        .unwrap();
    engine
        .lifecycle()
        .acknowledge(&id, "emp-1", Some("Discussed with manager".to_string()))
        .await
        .unwrap();
    assert!(engine.gate().decide("emp-1").await.unwrap().is_allowed());

    println!("     ✓ Completed executions stay resolved");
}

// =============================================================================
// END-TO-END SCENARIO
// =============================================================================

pub async fn test_override_unblocks_finalization(ctx: &TestContext) {
    println!("  🧪 test_override_unblocks_finalization");

    let engine = ctx.engine(
        catalog(vec![block_finalization_rule()]),
        scores("emp-42", &[(Section::Goals, 2.5)], &[]),
    );

    let report = engine.process_participant("emp-42", TEMPLATE, None).await.unwrap();
    assert_eq!(report.evaluation.triggers.len(), 1);
    assert_eq!(report.executions.len(), 1);
    let exec = &report.executions[0];
    assert!(exec.is_pending());

    let gate = engine.gate();
    assert!(gate.has_blocking_actions("emp-42").await.unwrap());

    // Finalization attempt is refused, surfacing the blocking list
    match gate.decide("emp-42").await.unwrap() {
        FinalizationDecision::Blocked { mandatory } => {
            assert_eq!(mandatory.len(), 1);
            assert_eq!(mandatory[0].id, exec.id);
        }
        FinalizationDecision::Allowed => panic!("finalization should be blocked"),
    }

    engine
        .overrides()
        .override_execution(
            &exec.id,
            "Approved exception - documented coaching plan",
            HR_MANAGER,
            &OverrideContext::new(REVIEWER),
        )
        .await
        .unwrap();

    assert!(!gate.has_blocking_actions("emp-42").await.unwrap());
    assert_eq!(gate.decide("emp-42").await.unwrap(), FinalizationDecision::Allowed);

    println!("     ✓ Override by HR unblocked finalization");
}

// =============================================================================
// TEST RUNNER
// =============================================================================

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🏁 Running Finalization Gate Tests\n");

    test_mandatory_blocks_among_advisory(ctx).await;
    test_acknowledgment_does_not_change_gating(ctx).await;
    test_override_unblocks_finalization(ctx).await;

    println!("\n✅ All finalization tests passed!\n");
}
