//! Active-room preference abstraction.
//!
//! Each user has exactly one persisted integer: the room they last created
//! or joined, or [`NO_ACTIVE_ROOM`].

use async_trait::async_trait;

use crate::error::DomainError;

/// Sentinel stored when a user has no active room.
pub const NO_ACTIVE_ROOM: i32 = -1;

/// Key-value persistence for the active room id.
#[async_trait]
pub trait RoomPreferences: Send + Sync {
    /// Returns the stored room id, or [`NO_ACTIVE_ROOM`] if none was stored.
    async fn current_room_id(&self, user_id: &str) -> Result<i32, DomainError>;

    /// Stores `room_id` as the user's active room.
    async fn set_current_room_id(&self, user_id: &str, room_id: i32) -> Result<(), DomainError>;

    /// Resets the user's active room to [`NO_ACTIVE_ROOM`].
    async fn clear_current_room_id(&self, user_id: &str) -> Result<(), DomainError> {
        self.set_current_room_id(user_id, NO_ACTIVE_ROOM).await
    }
}
