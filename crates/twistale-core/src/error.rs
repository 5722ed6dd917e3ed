//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A document was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// A conditional write lost a race against another writer.
    #[error("concurrency conflict on {key}: {detail}")]
    ConcurrencyConflict {
        /// The document key that had the conflict.
        key: String,
        /// What the writer expected to find.
        detail: String,
    },

    /// A validation error in domain logic.
    #[error("validation error: {0}")]
    Validation(String),

    /// The caller is not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// There is no current user.
    #[error("not authenticated")]
    Unauthenticated,

    /// The authentication provider rejected the request.
    #[error("failed to authenticate")]
    AuthenticationFailed,

    /// Stored data breaks an invariant the game relies on.
    #[error("data integrity violation: {0}")]
    Integrity(String),

    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
