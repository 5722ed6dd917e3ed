//! Blob store abstraction for uploaded drawings.

use async_trait::async_trait;

use crate::error::DomainError;

/// Stores image bytes and hands back retrievable URLs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `bytes` at `path` and returns the URL it can be fetched from.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, DomainError>;

    /// Reads back the bytes stored at `path`, if any.
    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>, DomainError>;

    /// Deletes the blob stored at `path`. A missing blob is not an error.
    async fn delete(&self, path: &str) -> Result<(), DomainError>;

    /// Deletes every blob stored under `prefix`.
    async fn delete_prefix(&self, prefix: &str) -> Result<(), DomainError>;
}
