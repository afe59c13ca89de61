use crate::{
    commands::{observe, Command, CommandContext},
    errors::ServiceError,
    models::Requisition,
    services::procurement,
    store::StorageBackend,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordPurchaseOrderCommand {
    #[validate(length(min = 1, max = 64, message = "PO number must be between 1 and 64 characters"))]
    pub po_number: String,
    /// Defaults to now.
    pub issued_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl Command for RecordPurchaseOrderCommand {
    type Result = Requisition;

    #[instrument(skip(self, ctx), fields(po_number = %self.po_number))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = self
            .validate()
            .map_err(ServiceError::from)
            .and_then(|_| {
                procurement::record_purchase_order(
                    ctx.store.get(),
                    ctx.actor,
                    &self.po_number,
                    self.issued_at.unwrap_or_else(Utc::now),
                )
            })
            .and_then(|patch| ctx.store.update(patch).map(Requisition::clone));
        if result.is_ok() {
            info!("Purchase order recorded");
        }
        observe("record_po", result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordInvoiceCommand {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Invoice number must be between 1 and 64 characters"
    ))]
    pub invoice_number: String,
    /// Defaults to now.
    pub received_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl Command for RecordInvoiceCommand {
    type Result = Requisition;

    #[instrument(skip(self, ctx), fields(invoice_number = %self.invoice_number))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = self
            .validate()
            .map_err(ServiceError::from)
            .and_then(|_| {
                procurement::record_invoice(
                    ctx.store.get(),
                    ctx.actor,
                    &self.invoice_number,
                    self.received_at.unwrap_or_else(Utc::now),
                )
            })
            .and_then(|patch| ctx.store.update(patch).map(Requisition::clone));
        if result.is_ok() {
            info!("Invoice recorded");
        }
        observe("record_invoice", result)
    }
}
