//! Override workflow tests.
//!
//! Covers:
//! - Reason requirement, independent of approver identity
//! - Self-approval by the reviewer or the triggering actor
//! - Audit trail of rejected and approved overrides

use super::common::*;
use appraisal_actions::{ActionEngine, ActionError, OverrideContext};
use appraisal_audit::{AuditEventType, AuditFilter};
use appraisal_core::{ActionExecution, ExecutionStatus, Section};

async fn blocked_participant(ctx: &TestContext, triggered_by: Option<&str>) -> (ActionEngine, ActionExecution) {
    let engine = ctx.engine(
        catalog(vec![block_finalization_rule()]),
        scores("emp-42", &[(Section::Goals, 2.5)], &[]),
    );
    let report = engine
        .process_participant("emp-42", TEMPLATE, triggered_by)
        .await
        .unwrap();
    let exec = report.executions[0].clone();
    (engine, exec)
}

// =============================================================================
// REJECTIONS
// =============================================================================

pub async fn test_reason_required_regardless_of_approver(ctx: &TestContext) {
    println!("  🧪 test_reason_required_regardless_of_approver");

    let (engine, exec) = blocked_participant(ctx, None).await;
    let context = OverrideContext::new(REVIEWER);

    for approver in [HR_MANAGER, REVIEWER] {
        let err = engine
            .overrides()
            .override_execution(&exec.id, "", approver, &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::ReasonRequired));
    }

    println!("     ✓ Empty reason rejected for every approver");
}

pub async fn test_reviewer_cannot_self_approve(ctx: &TestContext) {
    println!("  🧪 test_reviewer_cannot_self_approve");

    let (engine, exec) = blocked_participant(ctx, None).await;
    let err = engine
        .overrides()
        .override_execution(&exec.id, "reason", REVIEWER, &OverrideContext::new(REVIEWER))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::SelfApprovalNotPermitted { .. }));
    assert!(engine.gate().has_blocking_actions("emp-42").await.unwrap());

    println!("     ✓ Reviewer approving their own override is refused");
}

pub async fn test_triggering_actor_cannot_approve(ctx: &TestContext) {
    println!("  🧪 test_triggering_actor_cannot_approve");

    let (engine, exec) = blocked_participant(ctx, Some("line-manager-3")).await;
    let err = engine
        .overrides()
        .override_execution(&exec.id, "reason", "line-manager-3", &OverrideContext::new(REVIEWER))
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::SelfApprovalNotPermitted { .. }));

    println!("     ✓ Actor who triggered the evaluation is refused as approver");
}

// =============================================================================
// AUDIT TRAIL
// =============================================================================

pub async fn test_override_audit_trail(ctx: &TestContext) {
    println!("  🧪 test_override_audit_trail");

    let (engine, exec) = blocked_participant(ctx, None).await;
    let context = OverrideContext::new(REVIEWER);

    let _ = engine
        .overrides()
        .override_execution(&exec.id, "reason", REVIEWER, &context)
        .await;
    let overridden = engine
        .overrides()
        .override_execution(&exec.id, "Approved exception", HR_MANAGER, &context)
        .await
        .unwrap();
    assert_eq!(overridden.status, ExecutionStatus::Overridden);

    let audit = engine.lifecycle().audit();
    let history = audit.history(&exec.id).await.unwrap();
    let types: Vec<_> = history.iter().map(|e| e.event_type).collect();
    assert_eq!(
        types,
        vec![
            AuditEventType::ActionTriggered,
            AuditEventType::TransitionRejected,
            AuditEventType::ActionOverridden,
        ]
    );

    let approvals = audit
        .query(AuditFilter {
            participant_id: Some("emp-42".to_string()),
            event_type: Some(AuditEventType::ActionOverridden),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(approvals.len(), 1);
    assert_eq!(approvals[0].approver.as_deref(), Some(HR_MANAGER));
    assert_eq!(approvals[0].actor.as_deref(), Some(HR_MANAGER));
    assert_eq!(approvals[0].meta["reviewer"], REVIEWER);
    assert_eq!(approvals[0].reason.as_deref(), Some("Approved exception"));

    println!("     ✓ Rejected and approved overrides both audited");
}

// =============================================================================
// TEST RUNNER
// =============================================================================

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n✋ Running Override Workflow Tests\n");

    test_reason_required_regardless_of_approver(ctx).await;
    test_reviewer_cannot_self_approve(ctx).await;
    test_triggering_actor_cannot_approve(ctx).await;
    test_override_audit_trail(ctx).await;

    println!("\n✅ All override tests passed!\n");
}
