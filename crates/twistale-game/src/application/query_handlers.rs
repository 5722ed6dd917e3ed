//! Query handlers for the game room context.

use twistale_core::document::{DocumentStore, DocumentSubscription};
use twistale_core::error::DomainError;
use twistale_core::preferences::RoomPreferences;

use super::services::load_game;
use crate::domain::model::{GAMES_COLLECTION, Game, GameStatus, Story};
use crate::domain::room_id::RoomId;
use crate::domain::stories::assemble_stories;
use crate::domain::views::{LobbyState, PlayState};

/// Loads the current snapshot of a room.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist.
pub async fn get_room(store: &dyn DocumentStore, room_id: RoomId) -> Result<Game, DomainError> {
    load_game(store, room_id).await
}

/// Whether `user_id` hosts the room.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist.
pub async fn is_host_player(
    store: &dyn DocumentStore,
    room_id: RoomId,
    user_id: &str,
) -> Result<bool, DomainError> {
    Ok(load_game(store, room_id).await?.is_host(user_id))
}

/// The user's active room, if it is set and the room still exists.
///
/// # Errors
///
/// Returns preference or store errors.
pub async fn current_room_id(
    preferences: &dyn RoomPreferences,
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Option<RoomId>, DomainError> {
    let Some(room_id) = RoomId::from_preference(preferences.current_room_id(user_id).await?)
    else {
        return Ok(None);
    };
    let exists = store
        .get(GAMES_COLLECTION, &room_id.document_key())
        .await?
        .is_some();
    Ok(exists.then_some(room_id))
}

/// Assembles the stories of a finished game for one of its players.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the game is not finished yet,
/// `DomainError::Forbidden` if the caller did not play in it, and
/// `DomainError::Integrity` if a tale names an unknown player.
pub async fn get_all_stories(
    store: &dyn DocumentStore,
    room_id: RoomId,
    user_id: &str,
) -> Result<Vec<Story>, DomainError> {
    let game = load_game(store, room_id).await?;
    if game.player(user_id).is_none() {
        return Err(DomainError::Forbidden(format!(
            "{user_id} did not play in room {room_id}"
        )));
    }
    if game.status != GameStatus::Finished {
        return Err(DomainError::Validation(format!(
            "room {room_id} has not finished"
        )));
    }
    assemble_stories(&game)
}

/// Loads a room, treating a deleted room as an absent snapshot.
async fn load_snapshot(
    store: &dyn DocumentStore,
    room_id: RoomId,
) -> Result<Option<Game>, DomainError> {
    match load_game(store, room_id).await {
        Ok(game) => Ok(Some(game)),
        Err(DomainError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The lobby as `user_id` currently sees it. A deleted room yields the exit
/// destination.
///
/// # Errors
///
/// Returns store or decode errors.
pub async fn lobby_state(
    store: &dyn DocumentStore,
    room_id: RoomId,
    user_id: &str,
    min_players: usize,
) -> Result<LobbyState, DomainError> {
    let snapshot = load_snapshot(store, room_id).await?;
    Ok(LobbyState::reduce(
        &LobbyState::for_room(room_id),
        snapshot.as_ref(),
        user_id,
        min_players,
    ))
}

/// The play screen as `user_id` currently sees it. `last_round` is the round
/// the caller last saw, used to flag a round change.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` if the caller is not in the room, and
/// store, decode or integrity errors.
pub async fn play_state(
    store: &dyn DocumentStore,
    room_id: RoomId,
    user_id: &str,
    last_round: Option<u32>,
) -> Result<PlayState, DomainError> {
    let snapshot = load_snapshot(store, room_id).await?;
    let previous = PlayState {
        round_number: last_round,
        ..PlayState::default()
    };
    PlayState::reduce(&previous, snapshot.as_ref(), user_id)
}

/// One push from a room subscription: the decoded room, `None` once it has
/// been deleted, or the error that ended the feed.
pub type RoomChange = Result<Option<Game>, DomainError>;

/// A live subscription to one room, decoding each pushed document.
#[derive(Debug)]
pub struct RoomSubscription {
    room_id: RoomId,
    inner: DocumentSubscription,
    closed: bool,
}

impl RoomSubscription {
    /// The room being observed.
    #[must_use]
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// Waits for the next decoded snapshot.
    ///
    /// Returns `None` once the feed has ended. A deletion or an error is the
    /// last item delivered.
    pub async fn next(&mut self) -> Option<RoomChange> {
        if self.closed {
            return None;
        }
        let change = match self.inner.next().await? {
            Ok(Some(document)) => Game::from_document(document).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        if !matches!(change, Ok(Some(_))) {
            self.closed = true;
        }
        Some(change)
    }
}

/// Subscribes to a room. The current snapshot is delivered first.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist.
pub async fn observe_room(
    store: &dyn DocumentStore,
    room_id: RoomId,
) -> Result<RoomSubscription, DomainError> {
    let inner = store
        .subscribe(GAMES_COLLECTION, &room_id.document_key())
        .await?;
    Ok(RoomSubscription {
        room_id,
        inner,
        closed: false,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use twistale_core::document::DocumentStore;
    use twistale_core::error::DomainError;
    use twistale_core::preferences::RoomPreferences;
    use twistale_store::memory::{InMemoryDocumentStore, InMemoryRoomPreferences};

    use super::*;
    use crate::domain::fixtures::{finished_game, in_progress_game};
    use crate::domain::views::Destination;

    async fn seed(store: &InMemoryDocumentStore, room: u16, game: &Game) -> RoomId {
        let room_id = RoomId::new(room).unwrap();
        store
            .set(GAMES_COLLECTION, &room_id.document_key(), game.to_document())
            .await
            .unwrap();
        room_id
    }

    #[tokio::test]
    async fn test_get_room_reports_missing_room() {
        let store = InMemoryDocumentStore::new();

        let result = get_room(&store, RoomId::new(1234).unwrap()).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_is_host_player_checks_host_flag() {
        let store = InMemoryDocumentStore::new();
        let room_id = seed(&store, 1500, &in_progress_game(2)).await;

        assert!(is_host_player(&store, room_id, "u1").await.unwrap());
        assert!(!is_host_player(&store, room_id, "u2").await.unwrap());
    }

    #[tokio::test]
    async fn test_current_room_id_ignores_sentinel_and_deleted_rooms() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let preferences = InMemoryRoomPreferences::new();
        let room_id = seed(&store, 1600, &in_progress_game(2)).await;
        preferences.set_current_room_id("u1", 1600).await.unwrap();
        preferences.set_current_room_id("u2", 1700).await.unwrap();

        // Act
        let active = current_room_id(&preferences, &store, "u1").await.unwrap();
        let stale = current_room_id(&preferences, &store, "u2").await.unwrap();
        let unset = current_room_id(&preferences, &store, "u3").await.unwrap();

        // Assert
        assert_eq!(active, Some(room_id));
        assert_eq!(stale, None);
        assert_eq!(unset, None);
    }

    #[tokio::test]
    async fn test_get_all_stories_requires_finished_game() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let playing = seed(&store, 1800, &in_progress_game(3)).await;
        let finished = seed(&store, 1801, &finished_game(3)).await;

        // Act
        let early = get_all_stories(&store, playing, "u1").await;
        let stranger = get_all_stories(&store, finished, "u9").await;
        let stories = get_all_stories(&store, finished, "u2").await.unwrap();

        // Assert
        assert!(matches!(early, Err(DomainError::Validation(_))));
        assert!(matches!(stranger, Err(DomainError::Forbidden(_))));
        assert_eq!(stories.len(), 3);
        assert!(stories.iter().all(|story| story.story_parts.len() == 3));
    }

    #[tokio::test]
    async fn test_lobby_state_exits_for_deleted_room() {
        let store = InMemoryDocumentStore::new();

        let state = lobby_state(&store, RoomId::new(1900).unwrap(), "u1", 2)
            .await
            .unwrap();

        assert_eq!(state.destination, Destination::Exit);
    }

    #[tokio::test]
    async fn test_play_state_flags_round_change() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let room_id = seed(&store, 1901, &in_progress_game(2)).await;

        // Act
        let same = play_state(&store, room_id, "u2", Some(1)).await.unwrap();
        let changed = play_state(&store, room_id, "u2", Some(0)).await.unwrap();

        // Assert
        assert!(!same.round_changed);
        assert!(changed.round_changed);
        assert_eq!(same.destination, Destination::Play);
    }

    #[tokio::test]
    async fn test_observe_room_delivers_current_snapshot_then_updates_then_deletion() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let game = Game::new_room("u1", "Ana");
        let room_id = seed(&store, 2500, &game).await;
        let mut subscription = observe_room(&store, room_id).await.unwrap();

        // Act
        let first = subscription.next().await.unwrap().unwrap();
        let mut joined = game.clone();
        let ben = joined.next_player("u2", "Ben");
        joined.players.push(ben);
        store
            .update_field(
                GAMES_COLLECTION,
                &room_id.document_key(),
                "players",
                joined.players_value(),
            )
            .await
            .unwrap();
        let second = subscription.next().await.unwrap().unwrap();
        store
            .delete(GAMES_COLLECTION, &room_id.document_key())
            .await
            .unwrap();
        let third = subscription.next().await.unwrap().unwrap();

        // Assert
        assert_eq!(first, Some(game));
        assert_eq!(second, Some(joined));
        assert_eq!(third, None);
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_observe_room_surfaces_corrupt_document_and_closes() {
        // Arrange
        let store = InMemoryDocumentStore::new();
        let room_id = seed(&store, 2501, &Game::new_room("u1", "Ana")).await;
        let mut subscription = observe_room(&store, room_id).await.unwrap();
        subscription.next().await.unwrap().unwrap();

        // Act
        store
            .update_field(GAMES_COLLECTION, "2501", "status", json!("PAUSED"))
            .await
            .unwrap();
        let change = subscription.next().await.unwrap();

        // Assert
        assert!(matches!(change, Err(DomainError::Infrastructure(_))));
        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn test_observe_missing_room_is_not_found() {
        let store = InMemoryDocumentStore::new();

        let result = observe_room(&store, RoomId::new(2502).unwrap()).await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}
