use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum AttachmentCategory {
    #[serde(rename = "PO")]
    #[strum(serialize = "PO")]
    Po,
    Invoice,
    Supporting,
    Other,
}

/// A document attached to the requisition. The content itself lives in
/// `file_url` as an embeddable data URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    #[serde(rename = "fileType")]
    pub category: AttachmentCategory,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_url: String,
    pub file_size: u64,
}
