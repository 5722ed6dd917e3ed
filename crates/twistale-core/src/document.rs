//! Document store abstraction.
//!
//! A document store holds JSON documents keyed by `(collection, key)` and
//! pushes the full document to subscribers on every committed change.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::DomainError;

/// One push from a subscription: the full document, `None` once it has been
/// deleted, or an error signal after which no further pushes arrive.
pub type DocumentChange = Result<Option<Value>, DomainError>;

/// Condition a conditional write checks against the stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// The top-level field must still hold exactly this value.
    FieldEquals {
        /// Top-level field name.
        field: &'static str,
        /// Expected value.
        value: Value,
    },
}

impl Precondition {
    /// Returns whether `document` satisfies this precondition.
    #[must_use]
    pub fn holds_for(&self, document: &Value) -> bool {
        match self {
            Self::FieldEquals { field, value } => document.get(field) == Some(value),
        }
    }
}

/// Repository trait over a realtime JSON document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates or replaces a whole document.
    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), DomainError>;

    /// Replaces one top-level field of an existing document.
    ///
    /// Returns `DomainError::NotFound` if the document does not exist.
    async fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError>;

    /// Replaces one top-level field only if `precondition` still holds.
    ///
    /// Returns `DomainError::ConcurrencyConflict` if it does not.
    async fn update_field_if(
        &self,
        collection: &str,
        key: &str,
        precondition: Precondition,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError>;

    /// Loads a document once.
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DomainError>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, collection: &str, key: &str) -> Result<(), DomainError>;

    /// Subscribes to a document. The current document is pushed first.
    ///
    /// Returns `DomainError::NotFound` if the document does not exist.
    async fn subscribe(&self, collection: &str, key: &str)
    -> Result<DocumentSubscription, DomainError>;
}

/// A live subscription to one document.
///
/// Dropping the subscription releases it: the feeding task, if any, is
/// aborted and no further pushes are delivered.
#[derive(Debug)]
pub struct DocumentSubscription {
    receiver: mpsc::Receiver<DocumentChange>,
    task: Option<JoinHandle<()>>,
}

impl DocumentSubscription {
    /// Wraps a receiver and the task feeding it.
    #[must_use]
    pub fn new(receiver: mpsc::Receiver<DocumentChange>, task: Option<JoinHandle<()>>) -> Self {
        Self { receiver, task }
    }

    /// Waits for the next push. Returns `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<DocumentChange> {
        self.receiver.recv().await
    }
}

impl Drop for DocumentSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
