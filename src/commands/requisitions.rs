use crate::{
    commands::{observe, Command, CommandContext},
    errors::ServiceError,
    metrics::{LINE_ITEM_MUTATIONS, REQUISITIONS_SUBMITTED},
    models::{ApprovalStatus, LineItem, Requisition, RequisitionPatch},
    services::{
        approval,
        ledger::{self, LineItemChanges, NewLineItem},
    },
    store::{RequisitionStore, StorageBackend},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

/// Edits the descriptive fields of a Draft requisition.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateDetailsCommand {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub requester: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(length(
        min = 1,
        max = 2000,
        message = "Justification must be between 1 and 2000 characters"
    ))]
    pub justification: Option<String>,
    pub date_requested: Option<DateTime<Utc>>,
}

impl UpdateDetailsCommand {
    /// Copy with surrounding whitespace stripped from every text field.
    fn trimmed(&self) -> Self {
        let trim = |value: &Option<String>| value.as_ref().map(|v| v.trim().to_string());
        Self {
            title: trim(&self.title),
            requester: trim(&self.requester),
            department: trim(&self.department),
            justification: trim(&self.justification),
            date_requested: self.date_requested,
        }
    }

    fn into_patch(self) -> RequisitionPatch {
        RequisitionPatch {
            title: self.title,
            requester: self.requester,
            department: self.department,
            justification: self.justification,
            date_requested: self.date_requested,
            ..Default::default()
        }
    }

    fn apply<B: StorageBackend>(
        &self,
        store: &mut RequisitionStore<B>,
    ) -> Result<Requisition, ServiceError> {
        let details = self.trimmed();
        details.validate()?;
        let current = store.get();
        if current.approval_status != ApprovalStatus::Draft {
            return Err(ServiceError::InvalidStatus(format!(
                "Details are locked once a requisition is {}",
                current.approval_status
            )));
        }
        let patch = details.into_patch();
        if patch.is_empty() {
            return Ok(current.clone());
        }
        let updated = store.update(patch)?.clone();
        info!(requisition_id = %updated.id, "Requisition details updated");
        Ok(updated)
    }
}

#[async_trait]
impl Command for UpdateDetailsCommand {
    type Result = Requisition;

    #[instrument(skip(self, ctx))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = self.apply(ctx.store);
        observe("update_details", result)
    }
}

/// Sends the Draft into the approval chain on behalf of the acting identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequisitionCommand;

#[async_trait]
impl Command for SubmitRequisitionCommand {
    type Result = Requisition;

    #[instrument(skip(self, ctx), fields(actor = %ctx.actor.email))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = approval::submit(ctx.store.get(), ctx.actor)
            .and_then(|patch| ctx.store.update(patch).map(Requisition::clone));
        if let Ok(requisition) = &result {
            REQUISITIONS_SUBMITTED.inc();
            info!(
                requisition_id = %requisition.id,
                total = %requisition.total_amount,
                "Requisition submitted for approval"
            );
        }
        observe("submit", result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemResult {
    pub item: LineItem,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddLineItemCommand {
    pub item: NewLineItem,
}

#[async_trait]
impl Command for AddLineItemCommand {
    type Result = LineItemResult;

    #[instrument(skip(self, ctx))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = ledger::add_line_item(ctx.store.get(), &self.item).and_then(|(item, patch)| {
            let updated = ctx.store.update(patch)?;
            Ok(LineItemResult {
                item,
                total_amount: updated.total_amount,
            })
        });
        if let Ok(added) = &result {
            LINE_ITEM_MUTATIONS.with_label_values(&["add"]).inc();
            info!(line_item_id = %added.item.id, total = %added.total_amount, "Line item added");
        }
        observe("add_line_item", result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLineItemCommand {
    pub id: String,
    pub changes: LineItemChanges,
}

#[async_trait]
impl Command for UpdateLineItemCommand {
    type Result = LineItemResult;

    #[instrument(skip(self, ctx), fields(line_item_id = %self.id))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = ledger::update_line_item(ctx.store.get(), &self.id, &self.changes).and_then(
            |(item, patch)| {
                let updated = ctx.store.update(patch)?;
                Ok(LineItemResult {
                    item,
                    total_amount: updated.total_amount,
                })
            },
        );
        if let Ok(changed) = &result {
            LINE_ITEM_MUTATIONS.with_label_values(&["update"]).inc();
            info!(total = %changed.total_amount, "Line item updated");
        }
        observe("update_line_item", result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveLineItemCommand {
    pub id: String,
}

#[async_trait]
impl Command for RemoveLineItemCommand {
    type Result = Decimal;

    #[instrument(skip(self, ctx), fields(line_item_id = %self.id))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = ledger::remove_line_item(ctx.store.get(), &self.id)
            .and_then(|patch| ctx.store.update(patch).map(|updated| updated.total_amount));
        if let Ok(total) = &result {
            LINE_ITEM_MUTATIONS.with_label_values(&["remove"]).inc();
            info!(total = %total, "Line item removed");
        }
        observe("remove_line_item", result)
    }
}
