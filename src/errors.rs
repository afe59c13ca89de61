use serde::Serialize;

/// Coarse classification of a [`ServiceError`].
///
/// Every failure is local and recoverable: the actor corrects the input or
/// identity and retries. The category only tells the caller which of the
/// three families the failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum ErrorCategory {
    /// Missing fields, non-positive quantities or prices, empty line items.
    Validation,
    /// Acting out of turn, self-approval, unknown credentials.
    Permission,
    /// Corrupt or unreadable stored/imported records, storage I/O.
    Persistence,
    Internal,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Self-approval is not permitted for {0}")]
    SelfApproval(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Attachment too large: {size} bytes exceeds the {limit} byte limit")]
    AttachmentTooLarge { size: u64, limit: u64 },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::StorageError(err.to_string())
    }
}

impl ServiceError {
    /// Returns the taxonomy family for this error.
    /// This is the single source of truth for error classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError(_)
            | Self::InvalidInput(_)
            | Self::InvalidStatus(_)
            | Self::InvalidOperation(_)
            | Self::NotFound(_)
            | Self::AttachmentTooLarge { .. } => ErrorCategory::Validation,
            Self::SelfApproval(_) | Self::Forbidden(_) | Self::AuthError(_) => {
                ErrorCategory::Permission
            }
            Self::StorageError(_) | Self::SerializationError(_) | Self::ImportError(_) => {
                ErrorCategory::Persistence
            }
            Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Short, stable label used for failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidStatus(_) => "invalid_status",
            Self::InvalidOperation(_) => "invalid_operation",
            Self::SelfApproval(_) => "self_approval",
            Self::Forbidden(_) => "forbidden",
            Self::AuthError(_) => "auth_error",
            Self::NotFound(_) => "not_found",
            Self::AttachmentTooLarge { .. } => "attachment_too_large",
            Self::StorageError(_) => "storage_error",
            Self::SerializationError(_) => "serialization_error",
            Self::ImportError(_) => "import_error",
            Self::Other(_) => "other",
        }
    }
}
