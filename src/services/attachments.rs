//! Supporting documents.
//!
//! Files are read through an [`AttachmentReader`], size-checked against the
//! configured limit and embedded in the record as base64 data URLs.

use std::path::Path;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Attachment, AttachmentCategory, Requisition, RequisitionPatch};

/// Raw file content as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlob {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait AttachmentReader: Send + Sync {
    /// Size of the file at `path` in bytes, without reading its content.
    async fn size(&self, path: &Path) -> Result<u64, ServiceError>;

    async fn read(&self, path: &Path) -> Result<FileBlob, ServiceError>;
}

/// Reads attachments from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FsAttachmentReader;

#[async_trait]
impl AttachmentReader for FsAttachmentReader {
    async fn size(&self, path: &Path) -> Result<u64, ServiceError> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            ServiceError::StorageError(format!("Failed to stat {}: {}", path.display(), e))
        })?;
        if !metadata.is_file() {
            return Err(ServiceError::InvalidInput(format!(
                "{} is not a file",
                path.display()
            )));
        }
        Ok(metadata.len())
    }

    #[instrument(skip(self))]
    async fn read(&self, path: &Path) -> Result<FileBlob, ServiceError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            ServiceError::StorageError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                ServiceError::InvalidInput(format!("{} is not a file path", path.display()))
            })?;
        debug!(file_name = %file_name, size = bytes.len(), "Read attachment from disk");
        Ok(FileBlob { file_name, bytes })
    }
}

fn check_size(size: u64, max_bytes: u64) -> Result<(), ServiceError> {
    if size > max_bytes {
        return Err(ServiceError::AttachmentTooLarge {
            size,
            limit: max_bytes,
        });
    }
    Ok(())
}

/// Reads the file at `path` unless its reported size is over `max_bytes`.
pub async fn read_within_limit(
    reader: &dyn AttachmentReader,
    path: &Path,
    max_bytes: u64,
) -> Result<FileBlob, ServiceError> {
    check_size(reader.size(path).await?, max_bytes)?;
    reader.read(path).await
}

/// MIME type guessed from the file extension.
pub fn guess_mime(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

pub fn encode_data_url(file_name: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", guess_mime(file_name), STANDARD.encode(bytes))
}

/// Builds an attachment record from `blob`, refusing files over `max_bytes`.
pub fn build_attachment(
    blob: &FileBlob,
    category: AttachmentCategory,
    uploaded_by: &str,
    max_bytes: u64,
    now: DateTime<Utc>,
) -> Result<Attachment, ServiceError> {
    let size = blob.bytes.len() as u64;
    check_size(size, max_bytes)?;
    if blob.file_name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Attachment file name is required".to_string(),
        ));
    }
    Ok(Attachment {
        id: Uuid::new_v4().to_string(),
        file_name: blob.file_name.clone(),
        category,
        uploaded_by: uploaded_by.to_string(),
        uploaded_at: now,
        file_url: encode_data_url(&blob.file_name, &blob.bytes),
        file_size: size,
    })
}

/// Appends `attachment` to the requisition's documents.
pub fn attach(requisition: &Requisition, attachment: Attachment) -> RequisitionPatch {
    let mut attachments = requisition.attachments.clone();
    attachments.push(attachment);
    RequisitionPatch {
        attachments: Some(attachments),
        ..Default::default()
    }
}

pub fn remove_attachment(
    requisition: &Requisition,
    id: &str,
) -> Result<RequisitionPatch, ServiceError> {
    if !requisition.attachments.iter().any(|a| a.id == id) {
        return Err(ServiceError::NotFound(format!("Attachment {} not found", id)));
    }
    Ok(RequisitionPatch {
        attachments: Some(
            requisition
                .attachments
                .iter()
                .filter(|a| a.id != id)
                .cloned()
                .collect(),
        ),
        ..Default::default()
    })
}

pub fn by_category(requisition: &Requisition, category: AttachmentCategory) -> Vec<&Attachment> {
    requisition
        .attachments
        .iter()
        .filter(|a| a.category == category)
        .collect()
}

/// Human-readable size in base-1024 units, e.g. `1.5 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn blob(name: &str, bytes: &[u8]) -> FileBlob {
        FileBlob {
            file_name: name.into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn data_url_carries_mime_and_base64() {
        assert_eq!(
            encode_data_url("quote.pdf", b"hello"),
            "data:application/pdf;base64,aGVsbG8="
        );
        assert_eq!(guess_mime("SCAN.JPG"), "image/jpeg");
        assert_eq!(guess_mime("noext"), "application/octet-stream");
    }

    #[test]
    fn oversized_files_are_refused() {
        let err = build_attachment(
            &blob("big.bin", &[0u8; 16]),
            AttachmentCategory::Other,
            "a@x.com",
            8,
            Utc::now(),
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::AttachmentTooLarge { size: 16, limit: 8 });
    }

    #[test]
    fn attach_then_filter_then_remove() {
        let mut req = Requisition::new_draft(Utc::now());
        let po = build_attachment(
            &blob("po.pdf", b"po"),
            AttachmentCategory::Po,
            "a@x.com",
            1024,
            Utc::now(),
        )
        .unwrap();
        let id = po.id.clone();
        attach(&req, po).apply_to(&mut req);

        assert_eq!(by_category(&req, AttachmentCategory::Po).len(), 1);
        assert!(by_category(&req, AttachmentCategory::Invoice).is_empty());

        remove_attachment(&req, &id).unwrap().apply_to(&mut req);
        assert!(req.attachments.is_empty());
        assert_matches!(remove_attachment(&req, &id), Err(ServiceError::NotFound(_)));
    }

    #[test]
    fn sizes_are_formatted_in_binary_units() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(512), "512 Bytes");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1024 * 1024), "1 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[tokio::test]
    async fn filesystem_reader_returns_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invoice.txt");
        std::fs::write(&path, b"INV-1").unwrap();

        assert_eq!(FsAttachmentReader.size(&path).await.unwrap(), 5);
        let blob = FsAttachmentReader.read(&path).await.unwrap();
        assert_eq!(blob.file_name, "invoice.txt");
        assert_eq!(blob.bytes, b"INV-1");
    }

    #[tokio::test]
    async fn oversized_files_are_refused_from_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(64 * 1024 * 1024).unwrap();

        let err = read_within_limit(&FsAttachmentReader, &path, 10 * 1024 * 1024)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            ServiceError::AttachmentTooLarge {
                size: 67_108_864,
                limit: 10_485_760
            }
        );
    }

    #[tokio::test]
    async fn directories_are_not_attachments() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            FsAttachmentReader.size(dir.path()).await,
            Err(ServiceError::InvalidInput(_))
        );
    }
}
