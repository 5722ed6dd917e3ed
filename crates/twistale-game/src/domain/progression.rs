//! Round progression rules.
//!
//! Every function here is a pure function of a game snapshot, so each client
//! can recompute the same answers from whatever document it last received.

use twistale_core::error::DomainError;

use super::model::{Game, Round, RoundType, Tale};

/// Whether every player has submitted a tale in the current round.
#[must_use]
pub fn is_round_complete(game: &Game) -> bool {
    game.current_round()
        .is_some_and(|round| round.tales.len() == game.players.len())
}

/// Whether `user_id` has already submitted in the current round.
#[must_use]
pub fn has_submitted(game: &Game, user_id: &str) -> bool {
    game.current_round()
        .is_some_and(|round| round.tales.iter().any(|tale| tale.player_id == user_id))
}

/// Whether the game is over: every chain has gone through as many rounds as
/// there are players and the last of those rounds is complete.
#[must_use]
pub fn should_finish(game: &Game) -> bool {
    game.rounds.len() >= game.players.len() && is_round_complete(game)
}

/// Whether the host should open the next round.
#[must_use]
pub fn should_advance(game: &Game) -> bool {
    is_round_complete(game) && !should_finish(game)
}

/// The round type that follows `current`.
#[must_use]
pub fn next_round_type(current: RoundType) -> RoundType {
    current.next()
}

/// The join ordinal of the player whose previous-round tale the player with
/// `my_ordinal` continues in round `round_number`.
///
/// Returns `None` for round 1, which has no hint, and for inputs outside the
/// valid ranges.
#[must_use]
pub fn source_ordinal(my_ordinal: u32, round_number: u32, player_count: u32) -> Option<u32> {
    if round_number < 2 || player_count == 0 || !(1..=player_count).contains(&my_ordinal) {
        return None;
    }
    let offset = u64::from(my_ordinal - 1) + u64::from(round_number - 2);
    let wrapped = offset % u64::from(player_count);
    // `wrapped` < player_count, so it fits back into u32.
    u32::try_from(wrapped).ok().map(|o| o + 1)
}

/// Selects the previous-round tale the player with `my_ordinal` must
/// continue in `round`. Round 1 has no hint.
///
/// # Errors
///
/// Returns `DomainError::Integrity` if the ordinal does not belong to the
/// game or the expected source tale is missing. This only happens when the
/// document has been corrupted, for example by a player count that changed
/// after the first round.
#[allow(clippy::cast_possible_truncation)]
pub fn hint_source<'a>(
    game: &'a Game,
    round: &Round,
    my_ordinal: u32,
) -> Result<Option<&'a Tale>, DomainError> {
    if round.number <= 1 {
        return Ok(None);
    }
    let player_count = game.players.len() as u32;
    let source = source_ordinal(my_ordinal, round.number, player_count).ok_or_else(|| {
        DomainError::Integrity(format!(
            "ordinal {my_ordinal} is not valid for a game of {player_count} players"
        ))
    })?;
    let previous_round = game
        .rounds
        .iter()
        .find(|r| r.number == round.number - 1)
        .ok_or_else(|| {
            DomainError::Integrity(format!("round {} is missing", round.number - 1))
        })?;
    let source_player = game.player_by_ordinal(source).ok_or_else(|| {
        DomainError::Integrity(format!("no player with ordinal {source}"))
    })?;
    previous_round
        .tales
        .iter()
        .find(|tale| tale.player_id == source_player.user_id)
        .map(Some)
        .ok_or_else(|| {
            DomainError::Integrity(format!(
                "player {} has no tale in round {}",
                source_player.user_id, previous_round.number
            ))
        })
}

/// The round that follows the current one. Only the host appends it, and
/// only when [`should_advance`] holds.
#[must_use]
pub fn advance_round(game: &Game) -> Round {
    match game.current_round() {
        Some(last) => Round {
            number: last.number + 1,
            round_type: next_round_type(last.round_type),
            tales: Vec::new(),
        },
        None => Round::first(),
    }
}
