//! Test blob stores: an in-memory recorder and an always-failing variant.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use twistale_core::blob::BlobStore;
use twistale_core::error::DomainError;

/// A blob store that keeps uploads in memory and records every call.
/// Uploaded blobs get `memory://{path}` URLs.
#[derive(Debug, Default)]
pub struct RecordingBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    uploads: Mutex<Vec<String>>,
    deleted: Mutex<Vec<String>>,
    deleted_prefixes: Mutex<Vec<String>>,
}

impl RecordingBlobStore {
    /// Create an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every path uploaded to, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    /// Returns every path passed to `delete`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Returns every prefix passed to `delete_prefix`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn deleted_prefixes(&self) -> Vec<String> {
        self.deleted_prefixes.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, DomainError> {
        self.uploads.lock().unwrap().push(path.to_owned());
        self.blobs.lock().unwrap().insert(path.to_owned(), bytes);
        Ok(format!("memory://{path}"))
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>, DomainError> {
        Ok(self.blobs.lock().unwrap().get(path).cloned())
    }

    async fn delete(&self, path: &str) -> Result<(), DomainError> {
        self.deleted.lock().unwrap().push(path.to_owned());
        self.blobs.lock().unwrap().remove(path);
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), DomainError> {
        self.deleted_prefixes.lock().unwrap().push(prefix.to_owned());
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        self.blobs
            .lock()
            .unwrap()
            .retain(|path, _| !path.starts_with(&dir));
        Ok(())
    }
}

/// A blob store whose every operation returns `DomainError::Infrastructure`.
#[derive(Debug)]
pub struct FailingBlobStore;

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn upload(&self, _path: &str, _bytes: Vec<u8>) -> Result<String, DomainError> {
        Err(DomainError::Infrastructure("blob store unavailable".into()))
    }

    async fn download(&self, _path: &str) -> Result<Option<Vec<u8>>, DomainError> {
        Err(DomainError::Infrastructure("blob store unavailable".into()))
    }

    async fn delete(&self, _path: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("blob store unavailable".into()))
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("blob store unavailable".into()))
    }
}
