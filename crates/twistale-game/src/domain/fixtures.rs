//! Game builders shared by the domain and application tests.

use super::model::{Game, GameStatus, Player, Round, Tale};
use super::progression::{advance_round, hint_source};

/// `count` players with user ids `u1..` and ordinals `1..`; `u1` hosts.
pub(crate) fn players(count: u32) -> Vec<Player> {
    (1..=count)
        .map(|ordinal| Player {
            user_id: format!("u{ordinal}"),
            name: format!("Player {ordinal}"),
            ordinal_of_joining: ordinal,
            is_host_player: ordinal == 1,
        })
        .collect()
}

/// A started game with an empty first round.
pub(crate) fn in_progress_game(count: u32) -> Game {
    Game {
        players: players(count),
        status: GameStatus::InProgress,
        rounds: vec![Round::first()],
    }
}

/// Submits a tale for the player with `ordinal` in the current round,
/// continuing the chain the rotation hands them. Round-1 chains get id
/// `100 + ordinal`.
pub(crate) fn submit_as(game: &mut Game, ordinal: u32) {
    let round = game.rounds.last().unwrap().clone();
    let chain = match hint_source(game, &round, ordinal).unwrap() {
        Some(tale) => tale.id,
        None => 100 + ordinal,
    };
    let player_id = game.player_by_ordinal(ordinal).unwrap().user_id.clone();
    game.rounds.last_mut().unwrap().tales.push(Tale {
        id: chain,
        player_id,
        input: format!("chain {chain} round {} by {ordinal}", round.number),
    });
}

/// Every player submits in the current round, in join order.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn play_round(game: &mut Game) {
    for ordinal in 1..=game.players.len() as u32 {
        submit_as(game, ordinal);
    }
}

/// A finished game: `count` players, `count` complete rounds.
pub(crate) fn finished_game(count: u32) -> Game {
    let mut game = in_progress_game(count);
    for round in 1..=count {
        play_round(&mut game);
        if round < count {
            let next = advance_round(&game);
            game.rounds.push(next);
        }
    }
    game.status = GameStatus::Finished;
    game
}
