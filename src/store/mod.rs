/*!
 * # Requisition Store
 *
 * Holds the single current requisition, merges partial updates into it and
 * persists the full record after every change. The signed-in identity is kept
 * alongside under its own key.
 *
 * Storage is abstracted behind [`StorageBackend`] so the CLI can keep records
 * on disk while tests run in memory.
 */

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::auth::Identity;
use crate::errors::ServiceError;
use crate::models::{Requisition, RequisitionPatch};

/// Storage key of the persisted requisition.
pub const REQUISITION_KEY: &str = "procurement-requisition";
/// Storage key of the signed-in identity.
pub const SESSION_KEY: &str = "procurement-auth";

/// Key/value persistence for serialized records.
#[cfg_attr(test, mockall::automock)]
pub trait StorageBackend {
    fn read(&self, key: &str) -> Result<Option<String>, ServiceError>;
    fn write(&mut self, key: &str, value: &str) -> Result<(), ServiceError>;
    fn remove(&mut self, key: &str) -> Result<(), ServiceError>;
}

/// Volatile backend, used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ServiceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), ServiceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ServiceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key under `root`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::StorageError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), ServiceError> {
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), "Persisted record");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ServiceError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// The current requisition plus the backend it is persisted to.
#[derive(Debug)]
pub struct RequisitionStore<B: StorageBackend> {
    backend: B,
    current: Requisition,
}

impl<B: StorageBackend> RequisitionStore<B> {
    /// Restores the persisted requisition, falling back to a fresh Draft when
    /// nothing is stored or the stored record cannot be read.
    #[instrument(skip(backend))]
    pub fn open(backend: B) -> Self {
        let current = match backend.read(REQUISITION_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<Requisition>(&text) {
                Ok(requisition) => {
                    debug!(requisition_id = %requisition.id, "Restored requisition");
                    requisition
                }
                Err(e) => {
                    warn!(error = %e, "Stored requisition is corrupt; starting a fresh draft");
                    Requisition::new_draft(Utc::now())
                }
            },
            Ok(None) => Requisition::new_draft(Utc::now()),
            Err(e) => {
                warn!(error = %e, "Stored requisition is unreadable; starting a fresh draft");
                Requisition::new_draft(Utc::now())
            }
        };
        Self { backend, current }
    }

    pub fn get(&self) -> &Requisition {
        &self.current
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Merges `patch`, stamps `updated_at` and persists. Performs no validation.
    /// The in-memory record only changes once the write succeeded.
    pub fn update(&mut self, patch: RequisitionPatch) -> Result<&Requisition, ServiceError> {
        let mut next = self.current.clone();
        patch.apply_to(&mut next);
        next.updated_at = Utc::now();
        self.commit(next)
    }

    /// Replaces the record wholesale without stamping `updated_at`.
    pub fn replace(&mut self, requisition: Requisition) -> Result<&Requisition, ServiceError> {
        self.commit(requisition)
    }

    fn commit(&mut self, next: Requisition) -> Result<&Requisition, ServiceError> {
        let text = serde_json::to_string(&next)?;
        self.backend.write(REQUISITION_KEY, &text)?;
        self.current = next;
        Ok(&self.current)
    }

    /// Pretty-printed JSON of the current record.
    pub fn export(&self) -> Result<String, ServiceError> {
        Ok(serde_json::to_string_pretty(&self.current)?)
    }

    pub fn export_file_name(&self) -> String {
        format!("requisition-{}.json", self.current.id)
    }

    /// Replaces the record with the one in `text`. A parse failure leaves the
    /// current record untouched.
    #[instrument(skip(self, text))]
    pub fn import(&mut self, text: &str) -> Result<&Requisition, ServiceError> {
        let requisition: Requisition = serde_json::from_str(text)
            .map_err(|e| ServiceError::ImportError(format!("Invalid requisition file: {}", e)))?;
        info!(requisition_id = %requisition.id, "Imported requisition");
        self.replace(requisition)
    }

    /// Starts over with a fresh Draft.
    pub fn reset(&mut self) -> Result<&Requisition, ServiceError> {
        let fresh = Requisition::new_draft(Utc::now());
        info!(requisition_id = %fresh.id, "Reset requisition");
        self.replace(fresh)
    }

    /// The signed-in identity, if any. A corrupt session counts as signed out.
    pub fn current_identity(&self) -> Result<Option<Identity>, ServiceError> {
        match self.backend.read(SESSION_KEY)? {
            Some(text) => match serde_json::from_str(&text) {
                Ok(identity) => Ok(Some(identity)),
                Err(e) => {
                    warn!(error = %e, "Stored session is corrupt; treating as signed out");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    pub fn sign_in(&mut self, identity: &Identity) -> Result<(), ServiceError> {
        let text = serde_json::to_string(identity)?;
        self.backend.write(SESSION_KEY, &text)
    }

    pub fn sign_out(&mut self) -> Result<(), ServiceError> {
        self.backend.remove(SESSION_KEY)
    }
}
