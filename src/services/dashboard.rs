//! Read-only overview of where a requisition stands for a given actor.

use serde::Serialize;

use crate::auth::Actor;
use crate::models::{ApprovalStatus, ApproverRole, Requisition, StepStatus, APPROVAL_CHAIN};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequisitionSummary {
    pub status: ApprovalStatus,
    pub current_stage: Option<ApproverRole>,
    pub approved_count: usize,
    pub total_steps: usize,
    pub is_requester: bool,
    pub is_approver: bool,
    pub needs_my_approval: bool,
}

pub fn summarize(requisition: &Requisition, actor: &Actor) -> RequisitionSummary {
    let current = requisition.current_step();
    let is_requester = actor.is_same_person(requisition.requester_email.as_deref());

    let needs_my_approval = requisition.approval_status == ApprovalStatus::Submitted
        && !is_requester
        && current
            .map(|step| step.is_pending() && actor.role.as_approver() == Some(step.approver_role))
            .unwrap_or(false);

    RequisitionSummary {
        status: requisition.approval_status,
        current_stage: current.map(|step| step.approver_role),
        approved_count: requisition
            .approval_steps
            .iter()
            .filter(|step| step.status == StepStatus::Approved)
            .count(),
        total_steps: if requisition.has_steps() {
            requisition.approval_steps.len()
        } else {
            APPROVAL_CHAIN.len()
        },
        is_requester,
        is_approver: actor.role.is_approver(),
        needs_my_approval,
    }
}
