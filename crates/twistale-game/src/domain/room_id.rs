//! Human-shareable numeric room codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use twistale_core::error::DomainError;
use twistale_core::preferences::NO_ACTIVE_ROOM;
use twistale_core::rng::DeterministicRng;

/// A four-digit room code in `[1000, 9999]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct RoomId(u16);

impl RoomId {
    /// Smallest valid room code.
    pub const MIN: u16 = 1000;
    /// Largest valid room code.
    pub const MAX: u16 = 9999;

    /// Creates a room id, rejecting codes outside `[1000, 9999]`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the code is out of range.
    pub fn new(code: u16) -> Result<Self, DomainError> {
        if (Self::MIN..=Self::MAX).contains(&code) {
            Ok(Self(code))
        } else {
            Err(DomainError::Validation(format!(
                "room code must be between {} and {}, got {code}",
                Self::MIN,
                Self::MAX
            )))
        }
    }

    /// Draws a uniformly random room code.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the generator yields a value
    /// outside `[1000, 9999]`.
    pub fn draw(rng: &mut dyn DeterministicRng) -> Result<Self, DomainError> {
        let code = rng.next_u32_range(u32::from(Self::MIN), u32::from(Self::MAX));
        u16::try_from(code)
            .map_err(|_| DomainError::Validation(format!("room code out of range: {code}")))
            .and_then(Self::new)
    }

    /// The numeric code.
    #[must_use]
    pub fn code(self) -> u16 {
        self.0
    }

    /// The key of this room's document in the games collection.
    #[must_use]
    pub fn document_key(self) -> String {
        self.0.to_string()
    }

    /// The blob path prefix under which this room's drawings are stored.
    #[must_use]
    pub fn blob_prefix(self) -> String {
        format!("images/{}", self.0)
    }

    /// Interprets a stored preference value; the sentinel means no room.
    #[must_use]
    pub fn from_preference(value: i32) -> Option<Self> {
        if value == NO_ACTIVE_ROOM {
            return None;
        }
        u16::try_from(value).ok().and_then(|code| Self::new(code).ok())
    }

    /// The value persisted as a user's active room.
    #[must_use]
    pub fn to_preference(self) -> i32 {
        i32::from(self.0)
    }
}

impl TryFrom<u16> for RoomId {
    type Error = DomainError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::new(code)
    }
}

impl From<RoomId> for u16 {
    fn from(room_id: RoomId) -> Self {
        room_id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code: u16 = s
            .trim()
            .parse()
            .map_err(|_| DomainError::Validation(format!("invalid room code: {s:?}")))?;
        Self::new(code)
    }
}
