//! Shared application state.

use std::sync::{Arc, Mutex};

use serde::Serialize;
use twistale_core::auth::AuthProvider;
use twistale_core::blob::BlobStore;
use twistale_core::clock::Clock;
use twistale_core::document::DocumentStore;
use twistale_core::preferences::RoomPreferences;
use twistale_core::rng::DeterministicRng;
use twistale_game::application::services::{GameSettings, RoomServices};

/// Which document store backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Documents live in process memory and vanish on restart.
    Memory,
    /// Documents live in PostgreSQL.
    Postgres,
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Clock for deterministic time.
    pub clock: Arc<dyn Clock + Send + Sync>,
    /// RNG for room codes and chain ids.
    pub rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    /// Room documents.
    pub documents: Arc<dyn DocumentStore>,
    /// Which document store `documents` is.
    pub store_kind: StoreKind,
    /// Uploaded drawings.
    pub blobs: Arc<dyn BlobStore>,
    /// Each user's active room.
    pub preferences: Arc<dyn RoomPreferences>,
    /// Account provider.
    pub auth: Arc<dyn AuthProvider>,
    /// Game rules for this deployment.
    pub settings: GameSettings,
}

impl AppState {
    /// Borrows the collaborators the room handlers need.
    #[must_use]
    pub fn room_services(&self) -> RoomServices<'_> {
        RoomServices {
            store: self.documents.as_ref(),
            blobs: self.blobs.as_ref(),
            preferences: self.preferences.as_ref(),
            clock: self.clock.as_ref(),
            settings: self.settings,
        }
    }
}
