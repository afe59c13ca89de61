use crate::{
    auth::Actor,
    config::DEFAULT_MAX_ATTACHMENT_BYTES,
    errors::ServiceError,
    services::attachments::{AttachmentReader, FsAttachmentReader},
    store::{RequisitionStore, StorageBackend},
};
use async_trait::async_trait;

static FS_READER: FsAttachmentReader = FsAttachmentReader;

/// Everything a command needs to run: the store it mutates, the identity it
/// acts for, and the attachment boundary.
pub struct CommandContext<'a, B: StorageBackend> {
    pub store: &'a mut RequisitionStore<B>,
    pub actor: &'a Actor,
    pub reader: &'a dyn AttachmentReader,
    pub max_attachment_bytes: u64,
}

impl<'a, B: StorageBackend> CommandContext<'a, B> {
    pub fn new(store: &'a mut RequisitionStore<B>, actor: &'a Actor) -> Self {
        Self {
            store,
            actor,
            reader: &FS_READER,
            max_attachment_bytes: DEFAULT_MAX_ATTACHMENT_BYTES,
        }
    }

    pub fn with_reader(mut self, reader: &'a dyn AttachmentReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_attachment_limit(mut self, max_attachment_bytes: u64) -> Self {
        self.max_attachment_bytes = max_attachment_bytes;
        self
    }
}

/// Command trait for implementing the Command Pattern
///
/// Each command validates its own input, asks the workflow services what the
/// change should be, and dispatches the resulting patch through the store.
/// A refused command leaves the stored requisition untouched.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    async fn execute<B>(
        &self,
        ctx: &mut CommandContext<'_, B>,
    ) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send;
}

/// Logs and counts a refused or failed command before handing the result back.
pub(crate) fn observe<T>(action: &str, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    if let Err(e) = &result {
        crate::metrics::record_failure(action, e);
        tracing::error!(action, category = %e.category(), error = %e, "Command failed");
    }
    result
}

pub mod approvals;
pub mod documents;
pub mod purchasing;
pub mod requisitions;

pub use approvals::{ApproveStepCommand, DecisionResult, RejectStepCommand};
pub use documents::{AttachDocumentCommand, RemoveAttachmentCommand};
pub use purchasing::{RecordInvoiceCommand, RecordPurchaseOrderCommand};
pub use requisitions::{
    AddLineItemCommand, RemoveLineItemCommand, SubmitRequisitionCommand, UpdateDetailsCommand,
    UpdateLineItemCommand,
};
