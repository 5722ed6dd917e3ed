//! Filesystem blob store serving uploads through the API's `/blobs` route.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;
use twistale_core::blob::BlobStore;
use twistale_core::error::DomainError;

/// Blob store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsBlobStore {
    /// Creates a store writing under `root` and handing out URLs below
    /// `public_base_url`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// The URL a blob stored at `path` is served from.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/blobs/{path}", self.public_base_url)
    }

    /// Resolves a relative blob path, rejecting anything that would escape
    /// the root directory.
    fn resolve(&self, path: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(path);
        let is_plain = !path.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(DomainError::Validation(format!("invalid blob path: {path:?}")));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(action: &str, path: &Path, e: &std::io::Error) -> DomainError {
    DomainError::Infrastructure(format!("failed to {action} {}: {e}", path.display()))
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, DomainError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create", parent, &e))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| io_error("write", &target, &e))?;
        debug!(path, "blob stored");
        Ok(self.url_for(path))
    }

    async fn download(&self, path: &str) -> Result<Option<Vec<u8>>, DomainError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &target, &e)),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), DomainError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {
                debug!(path, "blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", &target, &e)),
        }
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<(), DomainError> {
        let target = self.resolve(prefix)?;
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", &target, &e)),
        }
    }
}
