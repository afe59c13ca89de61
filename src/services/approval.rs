//! Sequential approval engine.
//!
//! The chain is fixed: Finance(1) → COO(2) → CFO(3) → CEO(4). Every function
//! here is a pure function of the requisition state and the acting identity;
//! the resulting change is returned as a [`RequisitionPatch`] for the store to
//! merge, never applied in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::auth::{Actor, Role};
use crate::errors::ServiceError;
use crate::models::{
    ApprovalStatus, ApprovalStep, Requisition, RequisitionPatch, StepStatus, APPROVAL_CHAIN,
};

/// Comment recorded on earlier steps resolved by an admin approval.
pub const ADMIN_OVERRIDE_COMMENT: &str = "Resolved by administrative override";

/// What an approve/reject did to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Transition {
    /// The step at `from` was approved and the pointer moved to `to`.
    Advanced { from: u8, to: u8 },
    /// The last step was approved; the requisition is Approved.
    Completed { at: u8 },
    /// The step at `at` was rejected; the requisition is Rejected.
    Rejected { at: u8 },
    /// Nothing to act on (no steps initialized).
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalOutcome {
    pub transition: Transition,
    pub patch: RequisitionPatch,
}

impl ApprovalOutcome {
    fn unchanged() -> Self {
        Self {
            transition: Transition::Unchanged,
            patch: RequisitionPatch::default(),
        }
    }
}

/// The four fixed steps, all Pending.
pub fn fresh_steps() -> Vec<ApprovalStep> {
    APPROVAL_CHAIN.iter().copied().map(ApprovalStep::pending).collect()
}

/// Materializes the chain when no steps exist yet and points at step 1.
/// Returns `None` when steps are already present.
pub fn initialize_steps(requisition: &Requisition) -> Option<RequisitionPatch> {
    if requisition.has_steps() {
        return None;
    }
    Some(RequisitionPatch {
        approval_steps: Some(fresh_steps()),
        current_approval_step: Some(1),
        ..Default::default()
    })
}

/// Whether `acting_role`/`acting_email` may decide the step at the pointer.
///
/// The requester may never act on their own requisition, whatever their role.
/// Admin may act at any pointer position; any other role only when it is bound
/// to the current step, that step is Pending, and every earlier step is Approved.
pub fn can_act(requisition: &Requisition, acting_role: Role, acting_email: &str) -> bool {
    check_can_act(
        requisition,
        &Actor::new(acting_email, String::new(), acting_role),
    )
    .is_ok()
}

/// Like [`can_act`], but explains a refusal.
pub fn check_can_act(requisition: &Requisition, actor: &Actor) -> Result<(), ServiceError> {
    if actor.is_same_person(requisition.requester_email.as_deref()) {
        return Err(ServiceError::SelfApproval(actor.email.clone()));
    }

    if !requisition.has_steps() {
        return Err(ServiceError::InvalidOperation(format!(
            "Requisition {} has no approval steps",
            requisition.id
        )));
    }

    if actor.role.is_admin() {
        return Ok(());
    }

    let pointer = requisition.pointer();
    let step = requisition.current_step().ok_or_else(|| {
        ServiceError::InvalidOperation(format!("No approval step at position {}", pointer))
    })?;

    match actor.role.as_approver() {
        Some(role) if role == step.approver_role => {}
        _ => {
            return Err(ServiceError::Forbidden(format!(
                "{} cannot act on step {} ({})",
                actor.role, step.order, step.approver_role
            )))
        }
    }

    if !step.is_pending() {
        return Err(ServiceError::Forbidden(format!(
            "Step {} ({}) is already {}",
            step.order, step.approver_role, step.status
        )));
    }

    let blocked = requisition
        .approval_steps
        .iter()
        .any(|s| s.order < step.order && s.status != StepStatus::Approved);
    if blocked {
        return Err(ServiceError::Forbidden(format!(
            "Step {} is not reachable until every earlier step is approved",
            step.order
        )));
    }

    Ok(())
}

fn ensure_submitted(requisition: &Requisition) -> Result<(), ServiceError> {
    if requisition.approval_status != ApprovalStatus::Submitted {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot act on requisition in {} status. Must be in Submitted status.",
            requisition.approval_status
        )));
    }
    Ok(())
}

fn record_decision(
    step: &mut ApprovalStep,
    status: StepStatus,
    actor: &Actor,
    comment: Option<&str>,
    now: DateTime<Utc>,
) {
    step.status = status;
    step.approver_name = Some(actor.name.clone());
    step.approver_email = Some(actor.email.clone());
    step.comments = comment
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    step.approved_at = Some(now);
}

/// Steps plus the index of the step at the pointer, which must be Pending.
fn decidable_steps(requisition: &Requisition) -> Result<(Vec<ApprovalStep>, usize), ServiceError> {
    let pointer = requisition.pointer();
    let steps = requisition.approval_steps.clone();
    let index = steps
        .iter()
        .position(|s| s.order == pointer)
        .ok_or_else(|| {
            ServiceError::InvalidOperation(format!("No approval step at position {}", pointer))
        })?;
    if !steps[index].is_pending() {
        return Err(ServiceError::InvalidOperation(format!(
            "Step {} has already been decided",
            pointer
        )));
    }
    Ok((steps, index))
}

/// Approves the step at the pointer.
///
/// On the last step the requisition becomes Approved and the pointer stays put;
/// otherwise the pointer advances to the next order value and the status stays
/// Submitted. An admin approval also resolves earlier steps still Pending.
pub fn approve(
    requisition: &Requisition,
    actor: &Actor,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome, ServiceError> {
    if !requisition.has_steps() {
        debug!(requisition_id = %requisition.id, "Approve ignored: steps not initialized");
        return Ok(ApprovalOutcome::unchanged());
    }
    ensure_submitted(requisition)?;
    check_can_act(requisition, actor)?;

    let (mut steps, index) = decidable_steps(requisition)?;
    let pointer = steps[index].order;

    if actor.role.is_admin() {
        if let Some(rejected) = steps
            .iter()
            .find(|s| s.order < pointer && s.status == StepStatus::Rejected)
        {
            return Err(ServiceError::InvalidOperation(format!(
                "Step {} was rejected; the workflow is halted",
                rejected.order
            )));
        }
        for step in steps.iter_mut().filter(|s| s.order < pointer && s.is_pending()) {
            record_decision(
                step,
                StepStatus::Approved,
                actor,
                Some(ADMIN_OVERRIDE_COMMENT),
                now,
            );
        }
    }

    record_decision(&mut steps[index], StepStatus::Approved, actor, comment, now);

    let next = steps
        .iter()
        .map(|s| s.order)
        .filter(|order| *order > pointer)
        .min();

    let (transition, patch) = match next {
        Some(to) => (
            Transition::Advanced { from: pointer, to },
            RequisitionPatch {
                approval_steps: Some(steps),
                current_approval_step: Some(to),
                approval_status: Some(ApprovalStatus::Submitted),
                ..Default::default()
            },
        ),
        None => (
            Transition::Completed { at: pointer },
            RequisitionPatch {
                approval_steps: Some(steps),
                current_approval_step: Some(pointer),
                approval_status: Some(ApprovalStatus::Approved),
                ..Default::default()
            },
        ),
    };

    Ok(ApprovalOutcome { transition, patch })
}

/// Rejects the step at the pointer. The requisition becomes Rejected and all
/// later steps remain Pending for good.
pub fn reject(
    requisition: &Requisition,
    actor: &Actor,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome, ServiceError> {
    if !requisition.has_steps() {
        debug!(requisition_id = %requisition.id, "Reject ignored: steps not initialized");
        return Ok(ApprovalOutcome::unchanged());
    }
    ensure_submitted(requisition)?;
    check_can_act(requisition, actor)?;

    let (mut steps, index) = decidable_steps(requisition)?;
    let pointer = steps[index].order;
    record_decision(&mut steps[index], StepStatus::Rejected, actor, comment, now);

    Ok(ApprovalOutcome {
        transition: Transition::Rejected { at: pointer },
        patch: RequisitionPatch {
            approval_steps: Some(steps),
            approval_status: Some(ApprovalStatus::Rejected),
            ..Default::default()
        },
    })
}

/// Descriptive fields that must be filled before submission.
pub fn missing_fields(requisition: &Requisition) -> Vec<&'static str> {
    let fields: [(&'static str, &str); 3] = [
        ("title", requisition.title.as_str()),
        ("department", requisition.department.as_str()),
        ("justification", requisition.justification.as_str()),
    ];
    fields
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
}

/// Draft → Submitted.
///
/// Requires at least one line item and every required field. Stamps the
/// submitter's email as the requester email (fills the requester name when
/// blank) and materializes the approval chain.
pub fn submit(requisition: &Requisition, submitter: &Actor) -> Result<RequisitionPatch, ServiceError> {
    if requisition.approval_status != ApprovalStatus::Draft {
        return Err(ServiceError::InvalidStatus(format!(
            "Cannot submit requisition in {} status. Must be in Draft status.",
            requisition.approval_status
        )));
    }

    if requisition.line_items.is_empty() {
        return Err(ServiceError::ValidationError(
            "At least one line item is required".to_string(),
        ));
    }

    let missing = missing_fields(requisition);
    if !missing.is_empty() {
        return Err(ServiceError::ValidationError(format!(
            "Required fields are empty: {}",
            missing.join(", ")
        )));
    }

    let mut patch = initialize_steps(requisition).unwrap_or_default();
    patch.approval_status = Some(ApprovalStatus::Submitted);
    patch.requester_email = Some(submitter.email.clone());
    if requisition.requester.trim().is_empty() {
        patch.requester = Some(submitter.name.clone());
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LineItem;
    use rust_decimal_macros::dec;

    fn submitted() -> Requisition {
        let mut req = Requisition::new_draft(Utc::now());
        req.title = "Laptops".into();
        req.department = "IT".into();
        req.justification = "Refresh".into();
        req.line_items.push(LineItem::new("Laptop", 1, dec!(900.00)).unwrap());
        let requester = Actor::new("a@x.com", "Alice", Role::Requester);
        submit(&req, &requester).unwrap().apply_to(&mut req);
        req
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut req = Requisition::new_draft(Utc::now());
        initialize_steps(&req).unwrap().apply_to(&mut req);
        assert_eq!(req.approval_steps.len(), 4);
        assert_eq!(req.current_approval_step, Some(1));
        assert!(initialize_steps(&req).is_none());
    }

    #[test]
    fn submit_stamps_requester_and_builds_chain() {
        let req = submitted();
        assert_eq!(req.approval_status, ApprovalStatus::Submitted);
        assert_eq!(req.requester_email.as_deref(), Some("a@x.com"));
        assert_eq!(req.requester, "Alice");
        assert!(req.approval_steps.iter().all(ApprovalStep::is_pending));
    }

    #[test]
    fn wrong_role_is_refused() {
        let req = submitted();
        assert!(!can_act(&req, Role::Cfo, "cfo@x.com"));
        assert!(can_act(&req, Role::Finance, "fin@x.com"));
    }

    #[test]
    fn empty_comment_is_stored_as_absent() {
        let req = submitted();
        let finance = Actor::new("fin@x.com", "Fin", Role::Finance);
        let outcome = approve(&req, &finance, Some("   "), Utc::now()).unwrap();
        let steps = outcome.patch.approval_steps.unwrap();
        assert_eq!(steps[0].comments, None);
        assert_eq!(steps[0].approver_email.as_deref(), Some("fin@x.com"));
    }
}
