//! Commands for the game room context.

use twistale_core::command::Command;
use uuid::Uuid;

use super::room_id::RoomId;

/// Command to create a new room hosted by the caller.
#[derive(Debug, Clone)]
pub struct CreateRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
}

impl Command for CreateRoom {
    fn command_type(&self) -> &'static str {
        "game.create_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to join an existing room.
#[derive(Debug, Clone)]
pub struct JoinRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room to join.
    pub room_id: RoomId,
}

impl Command for JoinRoom {
    fn command_type(&self) -> &'static str {
        "game.join_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to start the game.
#[derive(Debug, Clone)]
pub struct StartGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room to start.
    pub room_id: RoomId,
}

impl Command for StartGame {
    fn command_type(&self) -> &'static str {
        "game.start_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// What a player hands in for the current round.
#[derive(Clone, PartialEq, Eq)]
pub enum TaleInput {
    /// A phrase, for writing rounds.
    Text(String),
    /// Encoded PNG bytes, for drawing rounds.
    Drawing(Vec<u8>),
}

impl std::fmt::Debug for TaleInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Drawing(bytes) => write!(f, "Drawing({} bytes)", bytes.len()),
        }
    }
}

/// Command to submit the caller's tale for the current round.
#[derive(Debug, Clone)]
pub struct SubmitTale {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room being played.
    pub room_id: RoomId,
    /// The phrase or drawing.
    pub input: TaleInput,
}

impl Command for SubmitTale {
    fn command_type(&self) -> &'static str {
        "game.submit_tale"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to open the next round. Host only.
#[derive(Debug, Clone)]
pub struct StartNextRound {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room being played.
    pub room_id: RoomId,
}

impl Command for StartNextRound {
    fn command_type(&self) -> &'static str {
        "game.start_next_round"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to mark the game finished. Host only.
#[derive(Debug, Clone)]
pub struct FinishGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room being played.
    pub room_id: RoomId,
}

impl Command for FinishGame {
    fn command_type(&self) -> &'static str {
        "game.finish_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to tear the room down. Host only.
#[derive(Debug, Clone)]
pub struct EndGame {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room to delete.
    pub room_id: RoomId,
}

impl Command for EndGame {
    fn command_type(&self) -> &'static str {
        "game.end_game"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to leave a room, which tears it down for everyone.
#[derive(Debug, Clone)]
pub struct LeaveRoom {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The room to leave.
    pub room_id: RoomId,
}

impl Command for LeaveRoom {
    fn command_type(&self) -> &'static str {
        "game.leave_room"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
