//! Lifecycle tests.
//!
//! Covers:
//! - Evaluation feeding registration through the engine
//! - Idempotent registration, including concurrent evaluations
//! - State machine legality from every terminal status
//! - Persistence across restarts and across stores sharing a directory

use super::common::*;
use appraisal_actions::{ActionError, FinalizationGate, OverrideContext};
use appraisal_core::{ActionType, ConditionType, ExecutionStatus, OutcomeLink, Section, Trigger};

// =============================================================================
// EVALUATION TO REGISTRATION
// =============================================================================

pub async fn test_repeated_low_registers_once(ctx: &TestContext) {
    println!("  🧪 test_repeated_low_registers_once");

    let mut repeated = rule("r-repeat", "REPEATED_LOW_GOALS", Section::Goals, 2.5);
    repeated.condition_type = ConditionType::RepeatedLow;
    repeated.condition_cycles = Some(3);
    repeated.action_type = ActionType::CreatePip;
    repeated.action_is_mandatory = true;

    let engine = ctx.engine(
        catalog(vec![repeated.clone()]),
        scores(
            "emp-1",
            &[(Section::Goals, 2.4)],
            &[(Section::Goals, vec![2.1, 2.3, 2.0])],
        ),
    );
    let report = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    assert_eq!(report.executions.len(), 1);
    assert_eq!(report.executions[0].terms.action_type, ActionType::CreatePip);

    let short = ctx.engine(
        catalog(vec![repeated]),
        scores(
            "emp-2",
            &[(Section::Goals, 0.0)],
            &[(Section::Goals, vec![0.0, 0.0])],
        ),
    );
    let report = short.process_participant("emp-2", TEMPLATE, None).await.unwrap();
    assert!(report.executions.is_empty());
    assert_eq!(report.evaluation.skipped.len(), 1);

    println!("     ✓ repeated_low fires on a full window and never on a short one");
}

pub async fn test_duplicate_rule_codes_do_not_abort_batch(ctx: &TestContext) {
    println!("  🧪 test_duplicate_rule_codes_do_not_abort_batch");

    let engine = ctx.engine(
        catalog(vec![
            rule("r1", "DUP", Section::Goals, 3.0),
            rule("r2", "DUP", Section::Goals, 3.0),
            rule("r3", "LOW_VALUES", Section::Values, 3.0),
        ]),
        scores("emp-1", &[(Section::Goals, 1.0), (Section::Values, 1.0)], &[]),
    );
    let report = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();

    assert_eq!(report.executions.len(), 1);
    assert_eq!(report.executions[0].rule_code, "LOW_VALUES");
    assert_eq!(report.evaluation.skipped.len(), 2);

    println!("     ✓ Duplicated codes skipped, remaining rules registered");
}

// =============================================================================
// IDEMPOTENCE
// =============================================================================

pub async fn test_register_twice_yields_one_execution(ctx: &TestContext) {
    println!("  🧪 test_register_twice_yields_one_execution");

    let engine = ctx.engine(
        catalog(vec![block_finalization_rule()]),
        scores("emp-1", &[(Section::Goals, 2.5)], &[]),
    );
    let first = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    let second = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();

    assert_eq!(first.executions[0].id, second.executions[0].id);
    assert_eq!(engine.lifecycle().list("emp-1").await.unwrap().len(), 1);

    println!("     ✓ Second registration returned the same id");
}

pub async fn test_concurrent_evaluations_create_one_pending(ctx: &TestContext) {
    println!("  🧪 test_concurrent_evaluations_create_one_pending");

    let engine = ctx.engine(
        catalog(vec![block_finalization_rule()]),
        scores("emp-1", &[(Section::Goals, 2.5)], &[]),
    );

    // Score update and cycle close arriving together
    let (a, b) = tokio::join!(
        engine.process_participant("emp-1", TEMPLATE, Some("score-update")),
        engine.process_participant("emp-1", TEMPLATE, Some("cycle-close")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.executions[0].id, b.executions[0].id);
    let all = engine.lifecycle().list("emp-1").await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_pending());

    println!("     ✓ Concurrent evaluations share one pending execution");
}

// =============================================================================
// STATE MACHINE
// =============================================================================

pub async fn test_executed_refuses_override_and_dismiss(ctx: &TestContext) {
    println!("  🧪 test_executed_refuses_override_and_dismiss");

    let engine = ctx.engine(
        catalog(vec![rule("r1", "LOW_GOALS", Section::Goals, 3.0)]),
        scores("emp-1", &[(Section::Goals, 2.0)], &[]),
    );
    let report = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    let id = report.executions[0].id.clone();

    engine.lifecycle().execute(&id, REVIEWER, OutcomeLink::None).await.unwrap();

    let err = engine.lifecycle().dismiss(&id, REVIEWER).await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::InvalidTransition {
            from: ExecutionStatus::Executed,
            ..
        }
    ));

    let err = engine
        .overrides()
        .override_execution(&id, "reason", HR_MANAGER, &OverrideContext::new(REVIEWER))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidTransition { .. }));

    println!("     ✓ executed is terminal for override and dismiss");
}

pub async fn test_dismissed_refuses_everything(ctx: &TestContext) {
    println!("  🧪 test_dismissed_refuses_everything");

    let engine = ctx.engine(
        catalog(vec![rule("r1", "LOW_GOALS", Section::Goals, 3.0)]),
        scores("emp-1", &[(Section::Goals, 2.0)], &[]),
    );
    let report = engine.process_participant("emp-1", TEMPLATE, None).await.unwrap();
    let id = report.executions[0].id.clone();
    engine.lifecycle().dismiss(&id, REVIEWER).await.unwrap();

    assert!(engine.lifecycle().execute(&id, REVIEWER, OutcomeLink::None).await.is_err());
    assert!(engine.lifecycle().dismiss(&id, REVIEWER).await.is_err());
    assert!(
        engine
            .overrides()
            .override_execution(&id, "reason", HR_MANAGER, &OverrideContext::new(REVIEWER))
            .await
            .is_err()
    );
    let acknowledged = engine.lifecycle().acknowledge(&id, REVIEWER, None).await.unwrap();
    assert_eq!(acknowledged.status, ExecutionStatus::Dismissed);

    println!("     ✓ No transition succeeds from dismissed");
}

pub async fn test_concurrent_execute_has_one_winner(ctx: &TestContext) {
    println!("  🧪 test_concurrent_execute_has_one_winner");

    let lifecycle = ctx.lifecycle();
    let mut advisory = rule("r1", "LOW_GOALS", Section::Goals, 3.0);
    advisory.action_type = ActionType::RequireComment;
    let trigger = Trigger {
        rule_id: advisory.id.clone(),
        rule_code: advisory.rule_code.clone(),
        template_id: TEMPLATE.to_string(),
        section: Section::Goals,
        score: 2.0,
        observed: 2.0,
        terms: advisory.terms(),
    };
    let exec = lifecycle.register_trigger("emp-1", &trigger, None).await.unwrap();

    let (executed, dismissed) = tokio::join!(
        lifecycle.execute(&exec.id, REVIEWER, OutcomeLink::None),
        lifecycle.dismiss(&exec.id, "reviewer-2"),
    );
    let wins = [executed.is_ok(), dismissed.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(wins, 1);

    let loser = executed.err().or(dismissed.err()).unwrap();
    assert!(matches!(loser, ActionError::InvalidTransition { .. }));

    println!("     ✓ Exactly one transition won, the other saw InvalidTransition");
}

// =============================================================================
// PERSISTENCE
// =============================================================================

pub async fn test_restart_preserves_pending_invariant(ctx: &TestContext) {
    println!("  🧪 test_restart_preserves_pending_invariant");

    let dir = ctx.store_dir();
    let trigger = Trigger {
        rule_id: "r-low-goals".to_string(),
        rule_code: "LOW_GOALS".to_string(),
        template_id: TEMPLATE.to_string(),
        section: Section::Goals,
        score: 2.5,
        observed: 2.5,
        terms: block_finalization_rule().terms(),
    };

    let first = ctx
        .lifecycle_at(&dir)
        .register_trigger("emp-1", &trigger, None)
        .await
        .unwrap();

    let reopened = ctx.lifecycle_at(&dir);
    let again = reopened.register_trigger("emp-1", &trigger, None).await.unwrap();
    assert_eq!(first.id, again.id);
    assert_eq!(reopened.list("emp-1").await.unwrap().len(), 1);

    println!("     ✓ Pending execution found after reopening the store");
}

pub async fn test_stores_sharing_a_directory_agree(ctx: &TestContext) {
    println!("  🧪 test_stores_sharing_a_directory_agree");

    let dir = ctx.store_dir();
    let trigger = Trigger {
        rule_id: "r-low-goals".to_string(),
        rule_code: "LOW_GOALS".to_string(),
        template_id: TEMPLATE.to_string(),
        section: Section::Goals,
        score: 2.5,
        observed: 2.5,
        terms: block_finalization_rule().terms(),
    };

    // Two managers on one directory, as two CLI processes would be
    let a = ctx.lifecycle_at(&dir);
    let b = ctx.lifecycle_at(&dir);

    let from_a = a.register_trigger("emp-1", &trigger, None).await.unwrap();
    let from_b = b.register_trigger("emp-1", &trigger, None).await.unwrap();
    assert_eq!(from_a.id, from_b.id);
    assert_eq!(ctx.lifecycle_at(&dir).list("emp-1").await.unwrap().len(), 1);

    a.execute(&from_a.id, REVIEWER, OutcomeLink::None).await.unwrap();
    let err = b.dismiss(&from_b.id, "reviewer-2").await.unwrap_err();
    assert!(matches!(
        err,
        ActionError::InvalidTransition {
            from: ExecutionStatus::Executed,
            ..
        }
    ));

    let gate = FinalizationGate::new(b.store().clone());
    assert!(gate.decide("emp-1").await.unwrap().is_allowed());

    println!("     ✓ Registration and transitions are shared between stores");
}

// =============================================================================
// TEST RUNNER
// =============================================================================

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🔁 Running Lifecycle Tests\n");

    test_repeated_low_registers_once(ctx).await;
    test_duplicate_rule_codes_do_not_abort_batch(ctx).await;

    test_register_twice_yields_one_execution(ctx).await;
    test_concurrent_evaluations_create_one_pending(ctx).await;

    test_executed_refuses_override_and_dismiss(ctx).await;
    test_dismissed_refuses_everything(ctx).await;
    test_concurrent_execute_has_one_winner(ctx).await;

    test_restart_preserves_pending_invariant(ctx).await;
    test_stores_sharing_a_directory_agree(ctx).await;

    println!("\n✅ All lifecycle tests passed!\n");
}
