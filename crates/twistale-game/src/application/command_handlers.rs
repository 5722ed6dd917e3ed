//! Command handlers for the game room context.
//!
//! Each handler loads the room document, applies the domain rules and writes
//! the changed field back through [`replace_field`], so the configured write
//! policy decides whether a stale read loses the race.

use std::collections::HashSet;
use std::sync::Mutex;

use tracing::{info, warn};
use twistale_core::auth::AuthUser;
use twistale_core::error::DomainError;
use twistale_core::rng::DeterministicRng;

use super::services::{RoomServices, allocate_room_id, load_game, replace_field};
use crate::domain::commands::{
    CreateRoom, EndGame, FinishGame, JoinRoom, LeaveRoom, StartGame, StartNextRound, SubmitTale,
    TaleInput,
};
use crate::domain::model::{
    FIELD_PLAYERS, FIELD_ROUNDS, FIELD_STATUS, GAMES_COLLECTION, Game, GameStatus, Player,
    RoundType, Tale, TaleId,
};
use crate::domain::progression::{
    advance_round, has_submitted, hint_source, should_advance, should_finish,
};
use crate::domain::room_id::RoomId;

/// Smallest chain id drawn for a round-1 tale.
pub const MIN_TALE_ID: u32 = 100;
/// Largest chain id drawn for a round-1 tale.
pub const MAX_TALE_ID: u32 = 999;

/// Result of a successfully handled room command.
#[derive(Debug)]
pub struct RoomCommandResult {
    /// The room affected or created by the command.
    pub room_id: RoomId,
    /// The room as written by the command.
    pub game: Game,
}

fn player_name(user: &AuthUser) -> &str {
    if user.display_name.trim().is_empty() {
        &user.email
    } else {
        &user.display_name
    }
}

fn require_host(game: &Game, user: &AuthUser, action: &str) -> Result<(), DomainError> {
    if game.is_host(&user.uid) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!("only the host may {action}")))
    }
}

fn require_player<'a>(game: &'a Game, user: &AuthUser) -> Result<&'a Player, DomainError> {
    game.player(&user.uid)
        .ok_or_else(|| DomainError::Forbidden(format!("{} is not in this room", user.uid)))
}

/// Handles the `CreateRoom` command: allocates a free room code, writes the
/// initial document with the caller as host and remembers it as the caller's
/// active room.
///
/// # Errors
///
/// Returns `DomainError::ConcurrencyConflict` if no free room code was found,
/// or any store error.
pub async fn handle_create_room(
    command: &CreateRoom,
    user: &AuthUser,
    rng: &Mutex<dyn DeterministicRng + Send>,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = allocate_room_id(rng, services.store).await?;
    let game = Game::new_room(&user.uid, player_name(user));

    services
        .store
        .set(GAMES_COLLECTION, &room_id.document_key(), game.to_document())
        .await?;
    services
        .preferences
        .set_current_room_id(&user.uid, room_id.to_preference())
        .await?;

    info!(correlation_id = %command.correlation_id, %room_id, host = %user.uid, "room created");
    Ok(RoomCommandResult { room_id, game })
}

/// Handles the `JoinRoom` command: appends the caller to a waiting room's
/// player list. Joining a room the caller is already in only refreshes the
/// active room.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist,
/// `DomainError::Validation` if it has already started, or
/// `DomainError::ConcurrencyConflict` if the player list changed meanwhile.
pub async fn handle_join_room(
    command: &JoinRoom,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = command.room_id;
    let mut game = load_game(services.store, room_id).await?;

    if game.player(&user.uid).is_none() {
        if game.status != GameStatus::Waiting {
            return Err(DomainError::Validation(format!(
                "room {room_id} has already started"
            )));
        }
        let expected = game.players_value();
        let player = game.next_player(&user.uid, player_name(user));
        game.players.push(player);
        replace_field(services, room_id, FIELD_PLAYERS, expected, game.players_value()).await?;
        info!(correlation_id = %command.correlation_id, %room_id, player = %user.uid, "player joined");
    }

    services
        .preferences
        .set_current_room_id(&user.uid, room_id.to_preference())
        .await?;
    Ok(RoomCommandResult { room_id, game })
}

/// Handles the `StartGame` command: moves a waiting room to in-progress once
/// enough players have joined. Host only.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-hosts, `DomainError::Validation`
/// if the room is not waiting or too few players joined.
pub async fn handle_start_game(
    command: &StartGame,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = command.room_id;
    let mut game = load_game(services.store, room_id).await?;
    require_host(&game, user, "start the game")?;

    if !game.status.can_transition_to(GameStatus::InProgress) {
        return Err(DomainError::Validation(format!(
            "room {room_id} cannot start from {:?}",
            game.status
        )));
    }
    let min_players = services.settings.min_players;
    if game.players.len() < min_players {
        return Err(DomainError::Validation(format!(
            "at least {min_players} players are needed, {} joined",
            game.players.len()
        )));
    }

    let expected = game.status_value();
    game.status = GameStatus::InProgress;
    replace_field(services, room_id, FIELD_STATUS, expected, game.status_value()).await?;

    info!(correlation_id = %command.correlation_id, %room_id, players = game.players.len(), "game started");
    Ok(RoomCommandResult { room_id, game })
}

/// Draws a round-1 chain id that no other round-1 tale uses yet.
#[allow(clippy::cast_possible_truncation)]
fn draw_tale_id(
    rng: &Mutex<dyn DeterministicRng + Send>,
    taken: &HashSet<TaleId>,
) -> Result<TaleId, DomainError> {
    let span = (MAX_TALE_ID - MIN_TALE_ID + 1) as usize;
    if taken.len() >= span {
        return Err(DomainError::Integrity("every chain id is in use".into()));
    }
    let mut rng_guard = rng
        .lock()
        .map_err(|e| DomainError::Infrastructure(format!("RNG mutex poisoned: {e}")))?;
    for _ in 0..span {
        let candidate = rng_guard.next_u32_range(MIN_TALE_ID, MAX_TALE_ID);
        if !taken.contains(&candidate) {
            return Ok(candidate);
        }
    }
    Err(DomainError::ConcurrencyConflict {
        key: GAMES_COLLECTION.to_owned(),
        detail: "could not draw an unused chain id".into(),
    })
}

async fn discard_upload(services: &RoomServices<'_>, room_id: RoomId, path: &str) {
    if let Err(e) = services.blobs.delete(path).await {
        warn!(%room_id, path, error = %e, "could not delete drawing of a failed submission");
    }
}

/// Handles the `SubmitTale` command: records the caller's phrase or drawing
/// for the current round.
///
/// Round-1 tales start a new chain with a fresh id; later tales continue the
/// chain of the caller's hint source. Drawings are uploaded first and the
/// tale stores the returned URL; if the room write then fails, the upload is
/// deleted again.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the game is not in progress, the
/// caller already submitted, or the input does not fit the round type;
/// `DomainError::Forbidden` if the caller is not in the room;
/// `DomainError::Integrity` if the hint source is missing; and
/// `DomainError::ConcurrencyConflict` if another write landed first.
pub async fn handle_submit_tale(
    command: &SubmitTale,
    user: &AuthUser,
    rng: &Mutex<dyn DeterministicRng + Send>,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = command.room_id;
    let mut game = load_game(services.store, room_id).await?;

    if game.status != GameStatus::InProgress {
        return Err(DomainError::Validation(format!(
            "room {room_id} is not in progress"
        )));
    }
    let me = require_player(&game, user)?.clone();
    if has_submitted(&game, &user.uid) {
        return Err(DomainError::Validation(
            "already submitted in this round".into(),
        ));
    }
    let round = game
        .current_round()
        .cloned()
        .ok_or_else(|| DomainError::Integrity("game has no rounds".into()))?;

    match (&command.input, round.round_type) {
        (TaleInput::Text(text), RoundType::Writing) if text.trim().is_empty() => {
            return Err(DomainError::Validation("phrase must not be blank".into()));
        }
        (TaleInput::Drawing(bytes), RoundType::Drawing) if bytes.is_empty() => {
            return Err(DomainError::Validation("drawing must not be empty".into()));
        }
        (TaleInput::Text(_), RoundType::Writing) | (TaleInput::Drawing(_), RoundType::Drawing) => {}
        (_, round_type) => {
            return Err(DomainError::Validation(format!(
                "round {} expects {round_type:?} input",
                round.number
            )));
        }
    }

    let tale_id = if round.number <= 1 {
        let taken: HashSet<TaleId> = round.tales.iter().map(|tale| tale.id).collect();
        draw_tale_id(rng, &taken)?
    } else {
        hint_source(&game, &round, me.ordinal_of_joining)?
            .map(|tale| tale.id)
            .ok_or_else(|| {
                DomainError::Integrity(format!("no hint source in round {}", round.number))
            })?
    };

    let (input, uploaded) = match &command.input {
        TaleInput::Text(text) => (text.clone(), None),
        TaleInput::Drawing(bytes) => {
            let path = format!(
                "{}/{tale_id}/{}-{}.png",
                room_id.blob_prefix(),
                user.uid,
                services.clock.now_millis()
            );
            let url = services.blobs.upload(&path, bytes.clone()).await?;
            (url, Some(path))
        }
    };

    let expected = game.rounds_value();
    if let Some(current) = game.rounds.last_mut() {
        current.tales.push(Tale {
            id: tale_id,
            player_id: user.uid.clone(),
            input,
        });
    }
    if let Err(e) =
        replace_field(services, room_id, FIELD_ROUNDS, expected, game.rounds_value()).await
    {
        if let Some(path) = uploaded {
            discard_upload(services, room_id, &path).await;
        }
        return Err(e);
    }

    info!(
        correlation_id = %command.correlation_id,
        %room_id,
        round = round.number,
        tale_id,
        player = %user.uid,
        "tale submitted"
    );
    Ok(RoomCommandResult { room_id, game })
}

/// Handles the `StartNextRound` command: appends the next round once the
/// current one is complete. Host only.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-hosts, `DomainError::Validation`
/// if the current round is incomplete or the game should finish instead, and
/// `DomainError::ConcurrencyConflict` if the rounds changed since the read.
pub async fn handle_start_next_round(
    command: &StartNextRound,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = command.room_id;
    let mut game = load_game(services.store, room_id).await?;
    require_host(&game, user, "start the next round")?;

    if game.status != GameStatus::InProgress || !should_advance(&game) {
        return Err(DomainError::Validation(format!(
            "room {room_id} is not ready for another round"
        )));
    }

    let expected = game.rounds_value();
    let next = advance_round(&game);
    let number = next.number;
    game.rounds.push(next);
    if let Err(e) =
        replace_field(services, room_id, FIELD_ROUNDS, expected, game.rounds_value()).await
    {
        warn!(correlation_id = %command.correlation_id, %room_id, error = %e, "round advance rejected");
        return Err(e);
    }

    info!(correlation_id = %command.correlation_id, %room_id, round = number, "round started");
    Ok(RoomCommandResult { room_id, game })
}

/// Handles the `FinishGame` command: marks the game finished once the last
/// round is complete. Host only.
///
/// # Errors
///
/// Returns `DomainError::Forbidden` for non-hosts and
/// `DomainError::Validation` if the game is not ready to finish.
pub async fn handle_finish_game(
    command: &FinishGame,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomCommandResult, DomainError> {
    let room_id = command.room_id;
    let mut game = load_game(services.store, room_id).await?;
    require_host(&game, user, "finish the game")?;

    if !game.status.can_transition_to(GameStatus::Finished) || !should_finish(&game) {
        return Err(DomainError::Validation(format!(
            "room {room_id} is not ready to finish"
        )));
    }

    let expected = game.status_value();
    game.status = GameStatus::Finished;
    replace_field(services, room_id, FIELD_STATUS, expected, game.status_value()).await?;

    info!(correlation_id = %command.correlation_id, %room_id, "game finished");
    Ok(RoomCommandResult { room_id, game })
}

/// Deletes the room's drawings, its document and the caller's active room.
async fn tear_down(
    room_id: RoomId,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<(), DomainError> {
    services.blobs.delete_prefix(&room_id.blob_prefix()).await?;
    services
        .store
        .delete(GAMES_COLLECTION, &room_id.document_key())
        .await?;
    services.preferences.clear_current_room_id(&user.uid).await
}

/// Handles the `EndGame` command: tears the room down. Host only.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist and
/// `DomainError::Forbidden` for non-hosts.
pub async fn handle_end_game(
    command: &EndGame,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomId, DomainError> {
    let room_id = command.room_id;
    let game = load_game(services.store, room_id).await?;
    require_host(&game, user, "end the game")?;

    tear_down(room_id, user, services).await?;

    info!(correlation_id = %command.correlation_id, %room_id, "room ended");
    Ok(room_id)
}

/// Handles the `LeaveRoom` command. A room with a missing player can never
/// complete, so leaving tears it down for everyone.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the room does not exist and
/// `DomainError::Forbidden` if the caller is not in it.
pub async fn handle_leave_room(
    command: &LeaveRoom,
    user: &AuthUser,
    services: &RoomServices<'_>,
) -> Result<RoomId, DomainError> {
    let room_id = command.room_id;
    let game = load_game(services.store, room_id).await?;
    require_player(&game, user)?;

    tear_down(room_id, user, services).await?;

    info!(correlation_id = %command.correlation_id, %room_id, player = %user.uid, "player left, room closed");
    Ok(room_id)
}
