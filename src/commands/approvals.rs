use crate::{
    commands::{observe, Command, CommandContext},
    errors::ServiceError,
    metrics::APPROVAL_DECISIONS,
    models::{ApprovalStatus, Requisition},
    services::approval::{self, ApprovalOutcome, Transition},
    store::StorageBackend,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    pub transition: Transition,
    pub status: ApprovalStatus,
    pub current_approval_step: Option<u8>,
}

impl DecisionResult {
    fn from_requisition(transition: Transition, requisition: &Requisition) -> Self {
        Self {
            transition,
            status: requisition.approval_status,
            current_approval_step: requisition.current_approval_step,
        }
    }
}

fn dispatch<B: StorageBackend>(
    ctx: &mut CommandContext<'_, B>,
    outcome: ApprovalOutcome,
) -> Result<DecisionResult, ServiceError> {
    if outcome.transition == Transition::Unchanged {
        return Ok(DecisionResult::from_requisition(
            outcome.transition,
            ctx.store.get(),
        ));
    }
    let updated = ctx.store.update(outcome.patch)?;
    Ok(DecisionResult::from_requisition(outcome.transition, updated))
}

/// Approves the step at the pointer as the acting identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ApproveStepCommand {
    #[validate(length(max = 1000, message = "Comments must be at most 1000 characters"))]
    pub comments: Option<String>,
}

#[async_trait]
impl Command for ApproveStepCommand {
    type Result = DecisionResult;

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor.email, role = %ctx.actor.role))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = self
            .validate()
            .map_err(ServiceError::from)
            .and_then(|_| {
                approval::approve(
                    ctx.store.get(),
                    ctx.actor,
                    self.comments.as_deref(),
                    Utc::now(),
                )
            })
            .and_then(|outcome| dispatch(ctx, outcome));

        if let Ok(decision) = &result {
            if decision.transition != Transition::Unchanged {
                let role = ctx.actor.role.to_string();
                APPROVAL_DECISIONS
                    .with_label_values(&["approved", role.as_str()])
                    .inc();
            }
            info!(transition = ?decision.transition, status = %decision.status, "Approval recorded");
        }
        observe("approve", result)
    }
}

/// Rejects the step at the pointer, halting the workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RejectStepCommand {
    #[validate(length(max = 1000, message = "Comments must be at most 1000 characters"))]
    pub comments: Option<String>,
}

#[async_trait]
impl Command for RejectStepCommand {
    type Result = DecisionResult;

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor.email, role = %ctx.actor.role))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = self
            .validate()
            .map_err(ServiceError::from)
            .and_then(|_| {
                approval::reject(
                    ctx.store.get(),
                    ctx.actor,
                    self.comments.as_deref(),
                    Utc::now(),
                )
            })
            .and_then(|outcome| dispatch(ctx, outcome));

        if let Ok(decision) = &result {
            if decision.transition != Transition::Unchanged {
                let role = ctx.actor.role.to_string();
                APPROVAL_DECISIONS
                    .with_label_values(&["rejected", role.as_str()])
                    .inc();
            }
            info!(transition = ?decision.transition, "Rejection recorded");
        }
        observe("reject", result)
    }
}
