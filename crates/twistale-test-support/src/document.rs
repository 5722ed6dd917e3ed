//! Test document stores that fail some or all calls.

use async_trait::async_trait;
use serde_json::Value;
use twistale_core::document::{DocumentStore, DocumentSubscription, Precondition};
use twistale_core::error::DomainError;

fn unavailable() -> DomainError {
    DomainError::Infrastructure("document store unavailable".into())
}

/// A document store whose every operation returns
/// `DomainError::Infrastructure`.
#[derive(Debug)]
pub struct FailingDocumentStore;

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn set(&self, _collection: &str, _key: &str, _document: Value) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn update_field(
        &self,
        _collection: &str,
        _key: &str,
        _field: &str,
        _value: Value,
    ) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn update_field_if(
        &self,
        _collection: &str,
        _key: &str,
        _precondition: Precondition,
        _field: &str,
        _value: Value,
    ) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn get(&self, _collection: &str, _key: &str) -> Result<Option<Value>, DomainError> {
        Err(unavailable())
    }

    async fn delete(&self, _collection: &str, _key: &str) -> Result<(), DomainError> {
        Err(unavailable())
    }

    async fn subscribe(
        &self,
        _collection: &str,
        _key: &str,
    ) -> Result<DocumentSubscription, DomainError> {
        Err(unavailable())
    }
}

/// A document store that delegates to `inner` but rejects every guarded
/// write with `DomainError::ConcurrencyConflict`, as if another client had
/// always written first.
pub struct ConflictingDocumentStore<'a> {
    inner: &'a dyn DocumentStore,
}

impl<'a> ConflictingDocumentStore<'a> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: &'a dyn DocumentStore) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl DocumentStore for ConflictingDocumentStore<'_> {
    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), DomainError> {
        self.inner.set(collection, key, document).await
    }

    async fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        self.inner.update_field(collection, key, field, value).await
    }

    async fn update_field_if(
        &self,
        collection: &str,
        key: &str,
        _precondition: Precondition,
        field: &str,
        _value: Value,
    ) -> Result<(), DomainError> {
        Err(DomainError::ConcurrencyConflict {
            key: format!("{collection}/{key}"),
            detail: format!("{field} changed since it was read"),
        })
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DomainError> {
        self.inner.get(collection, key).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        self.inner.delete(collection, key).await
    }

    async fn subscribe(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<DocumentSubscription, DomainError> {
        self.inner.subscribe(collection, key).await
    }
}
