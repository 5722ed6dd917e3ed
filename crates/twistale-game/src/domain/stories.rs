//! Story assembly for the end-of-game reveal.

use std::collections::HashMap;

use twistale_core::error::DomainError;

use super::model::{Game, Story, StoryPart, TaleId};

/// Regroups every tale by chain id into one story per chain.
///
/// Rounds are walked in increasing number and each tale is appended to its
/// chain as it is met, so parts come out in round order and stories come out
/// in the order their chains were started.
///
/// # Errors
///
/// Returns `DomainError::Integrity` if a tale names a player who is not in
/// the game.
pub fn assemble_stories(game: &Game) -> Result<Vec<Story>, DomainError> {
    let mut rounds: Vec<_> = game.rounds.iter().collect();
    rounds.sort_by_key(|round| round.number);

    let mut chain_index: HashMap<TaleId, usize> = HashMap::new();
    let mut stories: Vec<Story> = Vec::new();

    for round in rounds {
        for tale in &round.tales {
            let player = game.player(&tale.player_id).ok_or_else(|| {
                DomainError::Integrity(format!(
                    "tale {} in round {} names unknown player {}",
                    tale.id, round.number, tale.player_id
                ))
            })?;
            let part = StoryPart {
                player: player.clone(),
                input: tale.input.clone(),
                round_type: round.round_type,
            };
            let index = *chain_index.entry(tale.id).or_insert_with(|| {
                stories.push(Story {
                    story_parts: Vec::new(),
                });
                stories.len() - 1
            });
            stories[index].story_parts.push(part);
        }
    }

    Ok(stories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{finished_game, in_progress_game, play_round};
    use crate::domain::model::{RoundType, Tale};
    use proptest::prelude::*;

    #[test]
    fn test_three_player_game_yields_three_ordered_stories() {
        let game = finished_game(3);

        let stories = assemble_stories(&game).unwrap();

        assert_eq!(stories.len(), 3);
        // Chain 101 was started by player 1, kept by player 1 in round 2 and
        // handed to player 3 in round 3.
        let first = &stories[0];
        let authors: Vec<&str> = first
            .story_parts
            .iter()
            .map(|part| part.player.user_id.as_str())
            .collect();
        assert_eq!(authors, vec!["u1", "u1", "u3"]);
        let inputs: Vec<&str> = first.story_parts.iter().map(|p| p.input.as_str()).collect();
        assert_eq!(
            inputs,
            vec![
                "chain 101 round 1 by 1",
                "chain 101 round 2 by 1",
                "chain 101 round 3 by 3"
            ]
        );
    }

    #[test]
    fn test_story_parts_carry_round_types_in_order() {
        let game = finished_game(3);

        let stories = assemble_stories(&game).unwrap();

        for story in &stories {
            let types: Vec<RoundType> = story.story_parts.iter().map(|p| p.round_type).collect();
            assert_eq!(
                types,
                vec![RoundType::Writing, RoundType::Drawing, RoundType::Writing]
            );
        }
    }

    #[test]
    fn test_unknown_player_is_an_integrity_error() {
        let mut game = in_progress_game(2);
        play_round(&mut game);
        game.rounds[0].tales.push(Tale {
            id: 999,
            player_id: "ghost".into(),
            input: "boo".into(),
        });

        match assemble_stories(&game) {
            Err(DomainError::Integrity(msg)) => assert!(msg.contains("ghost")),
            other => panic!("expected Integrity, got {other:?}"),
        }
    }

    #[test]
    fn test_unfinished_game_yields_partial_stories() {
        let mut game = in_progress_game(3);
        play_round(&mut game);

        let stories = assemble_stories(&game).unwrap();

        assert_eq!(stories.len(), 3);
        assert!(stories.iter().all(|s| s.story_parts.len() == 1));
    }

    proptest! {
        #[test]
        fn prop_finished_game_yields_n_stories_of_n_parts(n in 2u32..9) {
            let game = finished_game(n);

            let stories = assemble_stories(&game).unwrap();

            let count = n as usize;
            prop_assert_eq!(stories.len(), count);
            for story in &stories {
                prop_assert_eq!(story.story_parts.len(), count);
                for (index, part) in story.story_parts.iter().enumerate() {
                    prop_assert_eq!(part.round_type, game.rounds[index].round_type);
                }
            }
        }
    }
}
