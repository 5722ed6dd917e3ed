//! Collaborators and settings shared by the game room handlers.

use std::str::FromStr;
use std::sync::Mutex;

use serde_json::Value;
use tracing::debug;
use twistale_core::blob::BlobStore;
use twistale_core::clock::Clock;
use twistale_core::document::{DocumentStore, Precondition};
use twistale_core::error::DomainError;
use twistale_core::preferences::RoomPreferences;
use twistale_core::rng::DeterministicRng;

use crate::domain::model::{GAMES_COLLECTION, Game};
use crate::domain::room_id::RoomId;
use crate::domain::views::DEFAULT_MIN_PLAYERS;

/// Upper bound on room code draws before allocation gives up.
pub const MAX_ROOM_ID_ATTEMPTS: usize = 64;

/// How read-modify-write updates are committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Commit only if the replaced field is unchanged since it was read.
    #[default]
    Guarded,
    /// Overwrite unconditionally; concurrent writers can lose updates.
    LastWriteWins,
}

impl FromStr for WritePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "guarded" => Ok(Self::Guarded),
            "last-write-wins" | "last_write_wins" => Ok(Self::LastWriteWins),
            other => Err(DomainError::Validation(format!(
                "unknown write policy: {other:?}"
            ))),
        }
    }
}

/// Game rules that are configurable per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameSettings {
    /// Players required before the host may start.
    pub min_players: usize,
    /// How updates are committed.
    pub write_policy: WritePolicy,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            min_players: DEFAULT_MIN_PLAYERS,
            write_policy: WritePolicy::Guarded,
        }
    }
}

/// Collaborators a game room handler works against.
#[derive(Clone, Copy)]
pub struct RoomServices<'a> {
    /// Room documents.
    pub store: &'a dyn DocumentStore,
    /// Uploaded drawings.
    pub blobs: &'a dyn BlobStore,
    /// Each user's active room.
    pub preferences: &'a dyn RoomPreferences,
    /// Time source for upload paths.
    pub clock: &'a dyn Clock,
    /// Deployment rules.
    pub settings: GameSettings,
}

/// Loads and decodes a room document.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist, or the decode
/// errors of [`Game::from_document`].
pub async fn load_game(store: &dyn DocumentStore, room_id: RoomId) -> Result<Game, DomainError> {
    let document = store
        .get(GAMES_COLLECTION, &room_id.document_key())
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("game room {room_id}")))?;
    Game::from_document(document)
}

/// Replaces one field of a room document under the configured write policy.
///
/// `expected` is the value the field held when the game was read.
pub(crate) async fn replace_field(
    services: &RoomServices<'_>,
    room_id: RoomId,
    field: &'static str,
    expected: Value,
    value: Value,
) -> Result<(), DomainError> {
    let key = room_id.document_key();
    match services.settings.write_policy {
        WritePolicy::Guarded => {
            let precondition = Precondition::FieldEquals {
                field,
                value: expected,
            };
            services
                .store
                .update_field_if(GAMES_COLLECTION, &key, precondition, field, value)
                .await
        }
        WritePolicy::LastWriteWins => {
            services
                .store
                .update_field(GAMES_COLLECTION, &key, field, value)
                .await
        }
    }
}

/// Draws room codes until one is not in use.
///
/// Uniqueness is advisory: another client can create the same room between
/// the existence check and the caller's write.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` if every draw collided, or
/// store errors from the existence checks.
pub async fn allocate_room_id(
    rng: &Mutex<dyn DeterministicRng + Send>,
    store: &dyn DocumentStore,
) -> Result<RoomId, DomainError> {
    for attempt in 1..=MAX_ROOM_ID_ATTEMPTS {
        // Lock RNG only for the draw, never across an await.
        let candidate = {
            let mut rng_guard = rng
                .lock()
                .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
            RoomId::draw(&mut *rng_guard)?
        };
        let existing = store
            .get(GAMES_COLLECTION, &candidate.document_key())
            .await?;
        if existing.is_none() {
            return Ok(candidate);
        }
        debug!(room_id = %candidate, attempt, "room code already taken, redrawing");
    }
    Err(DomainError::ConcurrencyConflict {
        key: GAMES_COLLECTION.to_owned(),
        detail: format!("no free room code after {MAX_ROOM_ID_ATTEMPTS} draws"),
    })
}
