mod common;

use assert_matches::assert_matches;
use chrono::Utc;
use requisition_tracker::{
    auth::{Actor, Role},
    commands::{ApproveStepCommand, Command, CommandContext, RejectStepCommand, SubmitRequisitionCommand},
    models::{ApprovalStatus, ApproverRole, StepStatus},
    services::approval::{self, Transition, ADMIN_OVERRIDE_COMMENT},
    store::{MemoryStorage, RequisitionStore},
    ServiceError,
};

async fn approve_as(
    store: &mut RequisitionStore<MemoryStorage>,
    actor: &Actor,
    comments: Option<&str>,
) -> Result<Transition, ServiceError> {
    ApproveStepCommand {
        comments: comments.map(str::to_string),
    }
    .execute(&mut CommandContext::new(store, actor))
    .await
    .map(|decision| decision.transition)
}

async fn reject_as(
    store: &mut RequisitionStore<MemoryStorage>,
    actor: &Actor,
    comments: Option<&str>,
) -> Result<Transition, ServiceError> {
    RejectStepCommand {
        comments: comments.map(str::to_string),
    }
    .execute(&mut CommandContext::new(store, actor))
    .await
    .map(|decision| decision.transition)
}

#[tokio::test]
async fn submission_stamps_requester_and_materializes_chain() {
    let store = common::submitted().await;
    let req = store.get();

    assert_eq!(req.approval_status, ApprovalStatus::Submitted);
    assert_eq!(req.requester_email.as_deref(), Some(common::REQUESTER));
    assert_eq!(req.current_approval_step, Some(1));
    let roles: Vec<ApproverRole> = req.approval_steps.iter().map(|s| s.approver_role).collect();
    assert_eq!(
        roles,
        vec![
            ApproverRole::Finance,
            ApproverRole::Coo,
            ApproverRole::Cfo,
            ApproverRole::Ceo
        ]
    );
    assert!(req.approval_steps.iter().all(|s| s.status == StepStatus::Pending));
}

#[tokio::test]
async fn submission_requires_line_items_and_fields() {
    let mut store = RequisitionStore::open(MemoryStorage::new());
    let actor = common::requester();
    let result = SubmitRequisitionCommand
        .execute(&mut CommandContext::new(&mut store, &actor))
        .await;

    assert_matches!(result, Err(ServiceError::ValidationError(_)));
    assert_eq!(store.get().approval_status, ApprovalStatus::Draft);
    assert!(store.get().approval_steps.is_empty());
}

#[tokio::test]
async fn finance_approves_then_coo_rejects() {
    let mut store = common::submitted().await;

    let transition = approve_as(&mut store, &common::finance(), Some("Budget available"))
        .await
        .unwrap();
    assert_eq!(transition, Transition::Advanced { from: 1, to: 2 });
    assert_eq!(store.get().current_approval_step, Some(2));
    assert_eq!(store.get().approval_status, ApprovalStatus::Submitted);

    let finance_step = store.get().step_at(1).unwrap();
    assert_eq!(finance_step.status, StepStatus::Approved);
    assert_eq!(finance_step.comments.as_deref(), Some("Budget available"));
    assert!(finance_step.approved_at.is_some());

    let transition = reject_as(&mut store, &common::coo(), Some("Not this quarter"))
        .await
        .unwrap();
    assert_eq!(transition, Transition::Rejected { at: 2 });

    let req = store.get();
    assert_eq!(req.approval_status, ApprovalStatus::Rejected);
    assert_eq!(req.current_approval_step, Some(2));
    assert_eq!(req.step_at(3).unwrap().status, StepStatus::Pending);
    assert_eq!(req.step_at(4).unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn rejection_halts_every_later_step() {
    let mut store = common::submitted().await;
    reject_as(&mut store, &common::finance(), None).await.unwrap();
    let snapshot = store.get().clone();

    for actor in [common::coo(), common::cfo(), common::ceo(), common::admin()] {
        assert_matches!(
            approve_as(&mut store, &actor, None).await,
            Err(ServiceError::InvalidStatus(_))
        );
    }
    assert_eq!(store.get(), &snapshot);
}

#[tokio::test]
async fn full_chain_approval_keeps_pointer_on_last_step() {
    let mut store = common::submitted().await;

    approve_as(&mut store, &common::finance(), None).await.unwrap();
    approve_as(&mut store, &common::coo(), None).await.unwrap();
    approve_as(&mut store, &common::cfo(), None).await.unwrap();
    let transition = approve_as(&mut store, &common::ceo(), Some("Go ahead"))
        .await
        .unwrap();

    assert_eq!(transition, Transition::Completed { at: 4 });
    let req = store.get();
    assert_eq!(req.approval_status, ApprovalStatus::Approved);
    assert_eq!(req.current_approval_step, Some(4));
    assert!(req.approval_steps.iter().all(|s| s.status == StepStatus::Approved));

    assert_matches!(
        approve_as(&mut store, &common::ceo(), None).await,
        Err(ServiceError::InvalidStatus(_))
    );
}

#[tokio::test]
async fn out_of_turn_roles_are_refused_without_mutation() {
    let mut store = common::submitted().await;
    let snapshot = store.get().clone();

    for actor in [common::coo(), common::cfo(), common::ceo(), common::requester()] {
        let result = approve_as(&mut store, &actor, None).await;
        assert!(result.is_err(), "{} acted out of turn", actor.role);
    }
    assert_eq!(store.get(), &snapshot);
}

#[tokio::test]
async fn admin_with_requester_email_cannot_approve() {
    let mut store = common::submitted().await;
    let impostor = Actor::new(" JOAN@corp.test", "Joan", Role::Admin);

    assert!(!approval::can_act(store.get(), Role::Admin, common::REQUESTER));
    assert_matches!(
        approve_as(&mut store, &impostor, None).await,
        Err(ServiceError::SelfApproval(_))
    );
    assert_eq!(store.get().step_at(1).unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn approver_cannot_act_on_own_requisition() {
    let mut store = common::ready_draft().await;
    let finance = common::finance();
    SubmitRequisitionCommand
        .execute(&mut CommandContext::new(&mut store, &finance))
        .await
        .unwrap();

    assert_matches!(
        approve_as(&mut store, &finance, None).await,
        Err(ServiceError::SelfApproval(_))
    );
}

#[tokio::test]
async fn admin_approves_at_any_pointer_and_resolves_earlier_pending_steps() {
    let mut store = common::submitted().await;
    let mut inconsistent = store.get().clone();
    inconsistent.current_approval_step = Some(3);
    store.replace(inconsistent).unwrap();

    assert!(!approval::can_act(store.get(), Role::Cfo, "cfo@corp.test"));
    assert!(approval::can_act(store.get(), Role::Admin, "admin@corp.test"));

    let transition = approve_as(&mut store, &common::admin(), None).await.unwrap();
    assert_eq!(transition, Transition::Advanced { from: 3, to: 4 });

    let req = store.get();
    for order in [1, 2] {
        let step = req.step_at(order).unwrap();
        assert_eq!(step.status, StepStatus::Approved);
        assert_eq!(step.comments.as_deref(), Some(ADMIN_OVERRIDE_COMMENT));
        assert_eq!(step.approver_email.as_deref(), Some("admin@corp.test"));
    }
    assert_eq!(req.step_at(3).unwrap().status, StepStatus::Approved);
    assert_eq!(req.step_at(4).unwrap().status, StepStatus::Pending);
}

#[tokio::test]
async fn admin_cannot_override_a_rejected_step() {
    let mut store = common::submitted().await;
    let mut inconsistent = store.get().clone();
    inconsistent.approval_steps[0].status = StepStatus::Rejected;
    inconsistent.current_approval_step = Some(2);
    store.replace(inconsistent).unwrap();

    assert_matches!(
        approve_as(&mut store, &common::admin(), None).await,
        Err(ServiceError::InvalidOperation(_))
    );
}

#[test]
fn can_act_is_false_without_steps() {
    let req = requisition_tracker::Requisition::new_draft(Utc::now());
    assert!(!approval::can_act(&req, Role::Finance, "finance@corp.test"));
    assert!(!approval::can_act(&req, Role::Admin, "admin@corp.test"));
}
