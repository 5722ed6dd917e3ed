//! Per-viewer state derived from room snapshots.
//!
//! Each reducer takes the previous state, the latest snapshot (or `None` when
//! the room is gone or the subscription failed) and the viewer's user id, and
//! recomputes everything from scratch.

use serde::Serialize;
use twistale_core::error::DomainError;

use super::model::{Game, GameStatus, Player, RoundType, TaleId};
use super::progression::{has_submitted, hint_source, should_advance, should_finish};
use super::room_id::RoomId;

/// Default minimum number of players before the host may start.
pub const DEFAULT_MIN_PLAYERS: usize = 2;

/// Which screen the viewer belongs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Waiting for the host to start.
    #[default]
    Lobby,
    /// Rounds are being played.
    Play,
    /// The game is over; show the stories.
    Story,
    /// The room no longer exists; forget it.
    Exit,
}

/// Host-only write the current snapshot calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostAction {
    /// Append the next round.
    Advance,
    /// Mark the game finished.
    Finish,
}

/// What a viewer sees while waiting for the game to start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LobbyState {
    /// The room being observed.
    pub room_id: Option<RoomId>,
    /// Everyone who has joined so far.
    pub players: Vec<Player>,
    /// Whether the viewer created the room.
    pub is_host_player: bool,
    /// Whether the viewer may start the game now.
    pub can_start_game: bool,
    /// Where the viewer should be.
    pub destination: Destination,
}

impl LobbyState {
    /// Fresh state for a room that has not been observed yet.
    #[must_use]
    pub fn for_room(room_id: RoomId) -> Self {
        Self {
            room_id: Some(room_id),
            ..Self::default()
        }
    }

    /// Folds a snapshot into the lobby state.
    #[must_use]
    pub fn reduce(
        previous: &Self,
        snapshot: Option<&Game>,
        user_id: &str,
        min_players: usize,
    ) -> Self {
        let Some(game) = snapshot else {
            return Self {
                destination: Destination::Exit,
                ..Self::default()
            };
        };
        let is_host_player = game.is_host(user_id);
        Self {
            room_id: previous.room_id,
            players: game.players.clone(),
            is_host_player,
            can_start_game: is_host_player
                && game.status == GameStatus::Waiting
                && game.players.len() >= min_players,
            destination: match game.status {
                GameStatus::Waiting => Destination::Lobby,
                GameStatus::InProgress | GameStatus::Finished => Destination::Play,
            },
        }
    }
}

/// What a viewer sees during the rounds.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PlayState {
    /// The current round number.
    pub round_number: Option<u32>,
    /// The current round type.
    pub round_type: Option<RoundType>,
    /// The previous-round input to build on: a phrase to draw in a drawing
    /// round, a drawing URL to describe in a writing round.
    pub hint: Option<String>,
    /// The chain the viewer continues this round; `None` in round 1.
    pub tale_id: Option<TaleId>,
    /// Whether the viewer has submitted and is waiting for the others.
    pub is_waiting: bool,
    /// Host-only write the snapshot calls for.
    pub host_action: Option<HostAction>,
    /// Where the viewer should be.
    pub destination: Destination,
    /// Whether a new round started since the previous state.
    pub round_changed: bool,
}

impl PlayState {
    /// Folds a snapshot into the play state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` if the viewer is not a player in the
    /// room, and `DomainError::Integrity` if the viewer's hint source is
    /// missing from the snapshot.
    pub fn reduce(
        previous: &Self,
        snapshot: Option<&Game>,
        user_id: &str,
    ) -> Result<Self, DomainError> {
        let Some(game) = snapshot else {
            return Ok(Self {
                destination: Destination::Exit,
                ..Self::default()
            });
        };
        let me = game
            .player(user_id)
            .ok_or_else(|| DomainError::Forbidden(format!("{user_id} is not in this room")))?;
        let Some(round) = game.current_round() else {
            return Err(DomainError::Integrity("game has no rounds".into()));
        };

        let source = hint_source(game, round, me.ordinal_of_joining)?;
        let host_action = if me.is_host_player && game.status == GameStatus::InProgress {
            if should_finish(game) {
                Some(HostAction::Finish)
            } else if should_advance(game) {
                Some(HostAction::Advance)
            } else {
                None
            }
        } else {
            None
        };

        Ok(Self {
            round_number: Some(round.number),
            round_type: Some(round.round_type),
            hint: source.map(|tale| tale.input.clone()),
            tale_id: source.map(|tale| tale.id),
            is_waiting: has_submitted(game, user_id),
            host_action,
            destination: match game.status {
                GameStatus::Waiting => Destination::Lobby,
                GameStatus::InProgress => Destination::Play,
                GameStatus::Finished => Destination::Story,
            },
            round_changed: previous
                .round_number
                .is_some_and(|number| number != round.number),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{finished_game, in_progress_game, play_round, submit_as};
    use crate::domain::progression::advance_round;

    fn room() -> RoomId {
        RoomId::new(4242).unwrap()
    }

    #[test]
    fn test_lobby_host_can_start_once_enough_players_joined() {
        let mut game = Game::new_room("u1", "Ana");
        let previous = LobbyState::for_room(room());

        let alone = LobbyState::reduce(&previous, Some(&game), "u1", 2);
        assert!(alone.is_host_player);
        assert!(!alone.can_start_game);

        let ben = game.next_player("u2", "Ben");
        game.players.push(ben);
        let together = LobbyState::reduce(&alone, Some(&game), "u1", 2);
        assert!(together.can_start_game);
        assert_eq!(together.players.len(), 2);
        assert_eq!(together.room_id, Some(room()));
        assert_eq!(together.destination, Destination::Lobby);
    }

    #[test]
    fn test_lobby_guest_can_never_start() {
        let mut game = Game::new_room("u1", "Ana");
        let ben = game.next_player("u2", "Ben");
        game.players.push(ben);

        let state = LobbyState::reduce(&LobbyState::for_room(room()), Some(&game), "u2", 2);

        assert!(!state.is_host_player);
        assert!(!state.can_start_game);
    }

    #[test]
    fn test_lobby_moves_to_play_when_started() {
        let game = in_progress_game(3);

        let state = LobbyState::reduce(&LobbyState::for_room(room()), Some(&game), "u2", 2);

        assert_eq!(state.destination, Destination::Play);
        assert!(!state.can_start_game);
    }

    #[test]
    fn test_lobby_exits_when_room_disappears() {
        let state = LobbyState::reduce(&LobbyState::for_room(room()), None, "u1", 2);

        assert_eq!(state.destination, Destination::Exit);
        assert_eq!(state.room_id, None);
    }

    #[test]
    fn test_play_round_one_has_no_hint_and_tracks_waiting() {
        let mut game = in_progress_game(3);
        submit_as(&mut game, 2);

        let mine = PlayState::reduce(&PlayState::default(), Some(&game), "u2").unwrap();
        let theirs = PlayState::reduce(&PlayState::default(), Some(&game), "u3").unwrap();

        assert_eq!(mine.round_number, Some(1));
        assert_eq!(mine.round_type, Some(RoundType::Writing));
        assert_eq!(mine.hint, None);
        assert_eq!(mine.tale_id, None);
        assert!(mine.is_waiting);
        assert!(!theirs.is_waiting);
        assert_eq!(mine.destination, Destination::Play);
    }

    #[test]
    fn test_play_drawing_round_hints_with_phrase_and_inherits_chain() {
        let mut game = in_progress_game(3);
        play_round(&mut game);
        let next = advance_round(&game);
        game.rounds.push(next);
        let round_one = PlayState {
            round_number: Some(1),
            ..PlayState::default()
        };

        let state = PlayState::reduce(&round_one, Some(&game), "u3").unwrap();

        assert_eq!(state.round_type, Some(RoundType::Drawing));
        assert_eq!(state.tale_id, Some(103));
        assert_eq!(state.hint.as_deref(), Some("chain 103 round 1 by 3"));
        assert!(state.round_changed);
        assert!(!state.is_waiting);
    }

    #[test]
    fn test_play_host_is_told_to_advance_but_guest_is_not() {
        let mut game = in_progress_game(3);
        play_round(&mut game);

        let host = PlayState::reduce(&PlayState::default(), Some(&game), "u1").unwrap();
        let guest = PlayState::reduce(&PlayState::default(), Some(&game), "u2").unwrap();

        assert_eq!(host.host_action, Some(HostAction::Advance));
        assert_eq!(guest.host_action, None);
    }

    #[test]
    fn test_play_host_is_told_to_finish_after_last_round() {
        let mut game = finished_game(3);
        game.status = GameStatus::InProgress;

        let host = PlayState::reduce(&PlayState::default(), Some(&game), "u1").unwrap();

        assert_eq!(host.host_action, Some(HostAction::Finish));
    }

    #[test]
    fn test_play_finished_game_goes_to_story_without_host_action() {
        let game = finished_game(3);

        let host = PlayState::reduce(&PlayState::default(), Some(&game), "u1").unwrap();

        assert_eq!(host.destination, Destination::Story);
        assert_eq!(host.host_action, None);
    }

    #[test]
    fn test_play_exits_when_room_disappears() {
        let previous = PlayState {
            round_number: Some(2),
            ..PlayState::default()
        };

        let state = PlayState::reduce(&previous, None, "u1").unwrap();

        assert_eq!(state.destination, Destination::Exit);
    }

    #[test]
    fn test_play_rejects_viewer_outside_room() {
        let game = in_progress_game(2);

        assert!(matches!(
            PlayState::reduce(&PlayState::default(), Some(&game), "stranger"),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_play_surfaces_missing_hint_source() {
        let mut game = in_progress_game(2);
        play_round(&mut game);
        let next = advance_round(&game);
        game.rounds.push(next);
        game.rounds[0].tales.clear();

        assert!(matches!(
            PlayState::reduce(&PlayState::default(), Some(&game), "u1"),
            Err(DomainError::Integrity(_))
        ));
    }
}
