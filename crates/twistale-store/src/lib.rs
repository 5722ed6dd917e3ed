//! Collaborator implementations for Twistale.
//!
//! In-memory implementations back tests and single-process deployments; the
//! PostgreSQL document store and the filesystem blob and preference stores
//! back persistent ones.

pub mod fs_blob_store;
pub mod json_preferences;
pub mod memory;
pub mod memory_auth;
pub mod pg_document_store;
