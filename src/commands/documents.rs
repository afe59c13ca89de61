use std::path::PathBuf;

use crate::{
    commands::{observe, Command, CommandContext},
    errors::ServiceError,
    models::{Attachment, AttachmentCategory},
    services::attachments,
    store::StorageBackend,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Reads a file and attaches it to the requisition as a data URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachDocumentCommand {
    pub path: PathBuf,
    pub category: AttachmentCategory,
}

#[async_trait]
impl Command for AttachDocumentCommand {
    type Result = Attachment;

    #[instrument(skip(self, ctx), fields(path = %self.path.display(), category = %self.category))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let blob = match attachments::read_within_limit(
            ctx.reader,
            &self.path,
            ctx.max_attachment_bytes,
        )
        .await
        {
            Ok(blob) => blob,
            Err(e) => return observe("attach", Err(e)),
        };

        let result = attachments::build_attachment(
            &blob,
            self.category,
            &ctx.actor.email,
            ctx.max_attachment_bytes,
            Utc::now(),
        )
        .and_then(|attachment| {
            let patch = attachments::attach(ctx.store.get(), attachment.clone());
            ctx.store.update(patch)?;
            Ok(attachment)
        });

        if let Ok(attachment) = &result {
            info!(
                attachment_id = %attachment.id,
                size = %attachments::format_size(attachment.file_size),
                "Document attached"
            );
        }
        observe("attach", result)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoveAttachmentCommand {
    pub id: String,
}

#[async_trait]
impl Command for RemoveAttachmentCommand {
    type Result = ();

    #[instrument(skip(self, ctx), fields(attachment_id = %self.id))]
    async fn execute<B>(&self, ctx: &mut CommandContext<'_, B>) -> Result<Self::Result, ServiceError>
    where
        B: StorageBackend + Send,
    {
        let result = attachments::remove_attachment(ctx.store.get(), &self.id)
            .and_then(|patch| ctx.store.update(patch).map(|_| ()));
        if result.is_ok() {
            info!("Document removed");
        }
        observe("detach", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Actor, Role};
    use crate::services::attachments::{AttachmentReader, FileBlob};
    use crate::store::{MemoryStorage, RequisitionStore};
    use assert_matches::assert_matches;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedReader(Vec<u8>);

    #[async_trait]
    impl AttachmentReader for FixedReader {
        async fn size(&self, _path: &Path) -> Result<u64, ServiceError> {
            Ok(self.0.len() as u64)
        }

        async fn read(&self, path: &Path) -> Result<FileBlob, ServiceError> {
            Ok(FileBlob {
                file_name: path.display().to_string(),
                bytes: self.0.clone(),
            })
        }
    }

    /// Reports a fixed size and counts how often content is read.
    struct CountingReader {
        size: u64,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl AttachmentReader for CountingReader {
        async fn size(&self, _path: &Path) -> Result<u64, ServiceError> {
            Ok(self.size)
        }

        async fn read(&self, path: &Path) -> Result<FileBlob, ServiceError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok(FileBlob {
                file_name: path.display().to_string(),
                bytes: Vec::new(),
            })
        }
    }

    #[tokio::test]
    async fn attaches_through_the_reader_and_enforces_the_limit() {
        let mut store = RequisitionStore::open(MemoryStorage::new());
        let actor = Actor::new("a@x.com", "Alice", Role::Requester);
        let reader = FixedReader(vec![1, 2, 3, 4]);

        {
            let mut ctx = CommandContext::new(&mut store, &actor).with_reader(&reader);
            let attachment = AttachDocumentCommand {
                path: "quote.pdf".into(),
                category: AttachmentCategory::Supporting,
            }
            .execute(&mut ctx)
            .await
            .unwrap();
            assert_eq!(attachment.file_size, 4);
            assert!(attachment.file_url.starts_with("data:application/pdf;base64,"));
        }

        let mut ctx = CommandContext::new(&mut store, &actor)
            .with_reader(&reader)
            .with_attachment_limit(2);
        let result = AttachDocumentCommand {
            path: "big.pdf".into(),
            category: AttachmentCategory::Other,
        }
        .execute(&mut ctx)
        .await;
        assert_matches!(result, Err(ServiceError::AttachmentTooLarge { .. }));
        assert_eq!(store.get().attachments.len(), 1);
    }

    #[tokio::test]
    async fn oversized_files_are_refused_before_reading() {
        let mut store = RequisitionStore::open(MemoryStorage::new());
        let actor = Actor::new("a@x.com", "Alice", Role::Requester);
        let reader = CountingReader {
            size: 4 * 1024 * 1024 * 1024,
            reads: AtomicUsize::new(0),
        };
        let mut ctx = CommandContext::new(&mut store, &actor).with_reader(&reader);

        let result = AttachDocumentCommand {
            path: "archive.zip".into(),
            category: AttachmentCategory::Other,
        }
        .execute(&mut ctx)
        .await;

        assert_matches!(result, Err(ServiceError::AttachmentTooLarge { .. }));
        assert_eq!(reader.reads.load(Ordering::SeqCst), 0);
        assert!(store.get().attachments.is_empty());
    }
}
