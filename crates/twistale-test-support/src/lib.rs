//! Shared test fakes and utilities for the Twistale party game.

mod auth;
mod blob;
mod clock;
mod document;
mod rng;

pub use auth::FailingAuthProvider;
pub use blob::{FailingBlobStore, RecordingBlobStore};
pub use clock::FixedClock;
pub use document::{ConflictingDocumentStore, FailingDocumentStore};
pub use rng::{MockRng, SequenceRng};
