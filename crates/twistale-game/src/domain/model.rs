//! Game document model.
//!
//! These types mirror the stored room document field for field. Decoding
//! never fills in defaults: a document with a missing or mistyped field is
//! rejected, and a well-formed document that breaks a game invariant is
//! reported as a data-integrity violation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use twistale_core::error::DomainError;

/// Collection holding one document per game room.
pub const GAMES_COLLECTION: &str = "games";
/// Document field holding the player list.
pub const FIELD_PLAYERS: &str = "players";
/// Document field holding the game status.
pub const FIELD_STATUS: &str = "status";
/// Document field holding the round list.
pub const FIELD_ROUNDS: &str = "rounds";

/// Identifier of one story chain, stable across every round it visits.
pub type TaleId = u32;

/// A participant in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    /// The authenticated user's id.
    pub user_id: String,
    /// Display name at the time of joining.
    pub name: String,
    /// 1-based join order.
    pub ordinal_of_joining: u32,
    /// Whether this player created the room.
    #[serde(rename = "hostPlayer")]
    pub is_host_player: bool,
}

/// One contribution to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tale {
    /// The chain this contribution belongs to.
    pub id: TaleId,
    /// Who submitted it.
    pub player_id: String,
    /// Phrase text, or the URL of an uploaded drawing.
    pub input: String,
}

/// What players produce in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundType {
    /// Players write a phrase.
    Writing,
    /// Players draw a picture.
    Drawing,
}

impl RoundType {
    /// The type of the round that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Writing => Self::Drawing,
            Self::Drawing => Self::Writing,
        }
    }

    /// The type a round with the given 1-based number must have.
    #[must_use]
    pub fn for_round(number: u32) -> Self {
        if number % 2 == 1 {
            Self::Writing
        } else {
            Self::Drawing
        }
    }
}

/// A single round and the tales submitted so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    /// 1-based round number.
    pub number: u32,
    /// Writing or drawing.
    #[serde(rename = "type")]
    pub round_type: RoundType,
    /// Submissions in arrival order.
    pub tales: Vec<Tale>,
}

impl Round {
    /// The opening round every room starts with.
    #[must_use]
    pub fn first() -> Self {
        Self {
            number: 1,
            round_type: RoundType::Writing,
            tales: Vec::new(),
        }
    }
}

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Players are joining.
    Waiting,
    /// Rounds are being played.
    InProgress,
    /// Every chain is complete.
    Finished,
}

impl GameStatus {
    /// Whether the status may move from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Waiting, Self::InProgress) | (Self::InProgress, Self::Finished)
        )
    }
}

/// The whole room document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Players in join order.
    pub players: Vec<Player>,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Rounds in increasing number order.
    pub rounds: Vec<Round>,
}

impl Game {
    /// A freshly created room hosted by `host_user_id`.
    #[must_use]
    pub fn new_room(host_user_id: &str, host_name: &str) -> Self {
        Self {
            players: vec![Player {
                user_id: host_user_id.to_owned(),
                name: host_name.to_owned(),
                ordinal_of_joining: 1,
                is_host_player: true,
            }],
            status: GameStatus::Waiting,
            rounds: vec![Round::first()],
        }
    }

    /// Decodes and validates a stored document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the document does not have the
    /// expected shape, and `DomainError::Integrity` if it breaks an invariant.
    pub fn from_document(document: Value) -> Result<Self, DomainError> {
        let game: Self = serde_json::from_value(document)
            .map_err(|e| DomainError::Infrastructure(format!("document decode failed: {e}")))?;
        game.validate()?;
        Ok(game)
    }

    /// Encodes the game as a store document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        // Serialization of derived Serialize types to Value is infallible.
        serde_json::to_value(self).expect("Game serialization is infallible")
    }

    /// Encodes the round list as a field value.
    #[must_use]
    pub fn rounds_value(&self) -> Value {
        serde_json::to_value(&self.rounds).expect("Round serialization is infallible")
    }

    /// Encodes the player list as a field value.
    #[must_use]
    pub fn players_value(&self) -> Value {
        serde_json::to_value(&self.players).expect("Player serialization is infallible")
    }

    /// Encodes the status as a field value.
    #[must_use]
    pub fn status_value(&self) -> Value {
        serde_json::to_value(self.status).expect("GameStatus serialization is infallible")
    }

    /// Looks up a player by user id.
    #[must_use]
    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    /// Looks up a player by join ordinal.
    #[must_use]
    pub fn player_by_ordinal(&self, ordinal: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.ordinal_of_joining == ordinal)
    }

    /// The room's host.
    #[must_use]
    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host_player)
    }

    /// Whether `user_id` is this room's host.
    #[must_use]
    pub fn is_host(&self, user_id: &str) -> bool {
        self.player(user_id).is_some_and(|p| p.is_host_player)
    }

    /// The round currently being played.
    #[must_use]
    pub fn current_round(&self) -> Option<&Round> {
        self.rounds.last()
    }

    /// The player record `user_id` would get by joining now.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn next_player(&self, user_id: &str, name: &str) -> Player {
        Player {
            user_id: user_id.to_owned(),
            name: name.to_owned(),
            ordinal_of_joining: self.players.len() as u32 + 1,
            is_host_player: false,
        }
    }

    /// Checks every structural invariant of a room document.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Integrity` describing the first violation found.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.validate_players()?;
        self.validate_rounds()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn validate_players(&self) -> Result<(), DomainError> {
        let hosts: Vec<&Player> = self.players.iter().filter(|p| p.is_host_player).collect();
        match hosts.as_slice() {
            [host] if host.ordinal_of_joining == 1 => {}
            [host] => {
                return Err(DomainError::Integrity(format!(
                    "host {} has ordinal {} instead of 1",
                    host.user_id, host.ordinal_of_joining
                )));
            }
            other => {
                return Err(DomainError::Integrity(format!(
                    "expected exactly one host player, found {}",
                    other.len()
                )));
            }
        }

        let mut user_ids = HashSet::new();
        let mut ordinals = HashSet::new();
        for player in &self.players {
            if !user_ids.insert(player.user_id.as_str()) {
                return Err(DomainError::Integrity(format!(
                    "player {} joined more than once",
                    player.user_id
                )));
            }
            ordinals.insert(player.ordinal_of_joining);
        }
        let count = self.players.len() as u32;
        if ordinals.len() != self.players.len() || !(1..=count).all(|o| ordinals.contains(&o)) {
            return Err(DomainError::Integrity(format!(
                "player ordinals are not exactly 1..={count}"
            )));
        }
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn validate_rounds(&self) -> Result<(), DomainError> {
        if self.rounds.is_empty() {
            return Err(DomainError::Integrity("game has no rounds".into()));
        }
        if self.status == GameStatus::Waiting
            && (self.rounds.len() != 1 || !self.rounds[0].tales.is_empty())
        {
            return Err(DomainError::Integrity(
                "a waiting game must have a single empty round".into(),
            ));
        }

        for (index, round) in self.rounds.iter().enumerate() {
            let expected_number = index as u32 + 1;
            if round.number != expected_number {
                return Err(DomainError::Integrity(format!(
                    "round at position {expected_number} is numbered {}",
                    round.number
                )));
            }
            if round.round_type != RoundType::for_round(round.number) {
                return Err(DomainError::Integrity(format!(
                    "round {} has type {:?}, expected {:?}",
                    round.number,
                    round.round_type,
                    RoundType::for_round(round.number)
                )));
            }
            if round.tales.len() > self.players.len() {
                return Err(DomainError::Integrity(format!(
                    "round {} has {} tales for {} players",
                    round.number,
                    round.tales.len(),
                    self.players.len()
                )));
            }
            let mut submitters = HashSet::new();
            for tale in &round.tales {
                if self.player(&tale.player_id).is_none() {
                    return Err(DomainError::Integrity(format!(
                        "round {} has a tale from unknown player {}",
                        round.number, tale.player_id
                    )));
                }
                if !submitters.insert(tale.player_id.as_str()) {
                    return Err(DomainError::Integrity(format!(
                        "player {} submitted twice in round {}",
                        tale.player_id, round.number
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One contribution inside an assembled story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryPart {
    /// Who contributed it.
    pub player: Player,
    /// Phrase text or drawing URL.
    pub input: String,
    /// The type of the round it was contributed in.
    pub round_type: RoundType,
}

/// One chain, start to finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    /// Contributions in round order.
    pub story_parts: Vec<StoryPart>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn waiting_document() -> Value {
        json!({
            "players": [
                { "userId": "u1", "name": "Ana", "ordinalOfJoining": 1, "hostPlayer": true },
                { "userId": "u2", "name": "Ben", "ordinalOfJoining": 2, "hostPlayer": false }
            ],
            "status": "WAITING",
            "rounds": [ { "number": 1, "type": "WRITING", "tales": [] } ]
        })
    }

    #[test]
    fn test_from_document_decodes_original_field_layout() {
        let game = Game::from_document(waiting_document()).unwrap();

        assert_eq!(game.players.len(), 2);
        assert!(game.players[0].is_host_player);
        assert_eq!(game.players[1].ordinal_of_joining, 2);
        assert_eq!(game.status, GameStatus::Waiting);
        assert_eq!(game.rounds, vec![Round::first()]);
    }

    #[test]
    fn test_to_document_round_trips_field_names() {
        let game = Game::new_room("u1", "Ana");

        let document = game.to_document();

        assert_eq!(document["players"][0]["hostPlayer"], json!(true));
        assert_eq!(document["players"][0]["ordinalOfJoining"], json!(1));
        assert_eq!(document["status"], json!("WAITING"));
        assert_eq!(document["rounds"][0]["type"], json!("WRITING"));
        assert_eq!(Game::from_document(document).unwrap(), game);
    }

    #[test]
    fn test_from_document_rejects_missing_fields_instead_of_defaulting() {
        let mut document = waiting_document();
        document.as_object_mut().unwrap().remove("status");

        match Game::from_document(document).unwrap_err() {
            DomainError::Infrastructure(msg) => assert!(msg.contains("decode failed")),
            other => panic!("expected Infrastructure, got {other:?}"),
        }
    }

    #[test]
    fn test_from_document_rejects_unknown_status() {
        let mut document = waiting_document();
        document["status"] = json!("PAUSED");

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Infrastructure(_))
        ));
    }

    #[test]
    fn test_validate_rejects_two_hosts() {
        let mut document = waiting_document();
        document["players"][1]["hostPlayer"] = json!(true);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_gapped_ordinals() {
        let mut document = waiting_document();
        document["players"][1]["ordinalOfJoining"] = json!(3);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_alternating_round_types() {
        let mut document = waiting_document();
        document["status"] = json!("IN_PROGRESS");
        document["rounds"] = json!([
            { "number": 1, "type": "WRITING", "tales": [] },
            { "number": 2, "type": "WRITING", "tales": [] }
        ]);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_gapped_round_numbers() {
        let mut document = waiting_document();
        document["status"] = json!("IN_PROGRESS");
        document["rounds"] = json!([
            { "number": 1, "type": "WRITING", "tales": [] },
            { "number": 3, "type": "WRITING", "tales": [] }
        ]);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_tale_from_unknown_player() {
        let mut document = waiting_document();
        document["status"] = json!("IN_PROGRESS");
        document["rounds"][0]["tales"] = json!([
            { "id": 101, "playerId": "stranger", "input": "hello" }
        ]);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_validate_rejects_double_submission_in_round() {
        let mut document = waiting_document();
        document["status"] = json!("IN_PROGRESS");
        document["rounds"][0]["tales"] = json!([
            { "id": 101, "playerId": "u1", "input": "one" },
            { "id": 102, "playerId": "u1", "input": "two" }
        ]);

        assert!(matches!(
            Game::from_document(document),
            Err(DomainError::Integrity(_))
        ));
    }

    #[test]
    fn test_status_transitions_are_one_directional() {
        assert!(GameStatus::Waiting.can_transition_to(GameStatus::InProgress));
        assert!(GameStatus::InProgress.can_transition_to(GameStatus::Finished));
        assert!(!GameStatus::Finished.can_transition_to(GameStatus::InProgress));
        assert!(!GameStatus::InProgress.can_transition_to(GameStatus::Waiting));
        assert!(!GameStatus::Waiting.can_transition_to(GameStatus::Finished));
    }

    #[test]
    fn test_next_player_gets_next_ordinal() {
        let game = Game::new_room("u1", "Ana");

        let player = game.next_player("u2", "Ben");

        assert_eq!(player.ordinal_of_joining, 2);
        assert!(!player.is_host_player);
    }
}
