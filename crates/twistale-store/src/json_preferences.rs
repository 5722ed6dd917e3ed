//! Active-room preferences persisted as a JSON object on disk.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use twistale_core::error::DomainError;
use twistale_core::preferences::{NO_ACTIVE_ROOM, RoomPreferences};

/// Preferences stored as `{ "<user id>": <room id>, ... }` in one file.
///
/// The file is read once when opened and rewritten on every change.
#[derive(Debug)]
pub struct JsonFileRoomPreferences {
    path: PathBuf,
    rooms: Mutex<HashMap<String, i32>>,
}

impl JsonFileRoomPreferences {
    /// Opens the preference file, starting empty if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the file cannot be read or
    /// does not hold a JSON object of integers.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        let rooms = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                DomainError::Infrastructure(format!(
                    "invalid preference file {}: {e}",
                    path.display()
                ))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                return Err(DomainError::Infrastructure(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };
        Ok(Self {
            path,
            rooms: Mutex::new(rooms),
        })
    }
}

#[async_trait]
impl RoomPreferences for JsonFileRoomPreferences {
    async fn current_room_id(&self, user_id: &str) -> Result<i32, DomainError> {
        let rooms = self.rooms.lock().await;
        Ok(rooms.get(user_id).copied().unwrap_or(NO_ACTIVE_ROOM))
    }

    async fn set_current_room_id(&self, user_id: &str, room_id: i32) -> Result<(), DomainError> {
        let mut rooms = self.rooms.lock().await;
        rooms.insert(user_id.to_owned(), room_id);

        let bytes = serde_json::to_vec_pretty(&*rooms)
            .map_err(|e| DomainError::Infrastructure(format!("preference encode: {e}")))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    DomainError::Infrastructure(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        tokio::fs::write(&self.path, bytes).await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preferences_survive_reopen() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("rooms.json");
        let first = JsonFileRoomPreferences::open(&path).await.unwrap();

        // Act
        first.set_current_room_id("u1", 4242).await.unwrap();
        first.set_current_room_id("u2", 4242).await.unwrap();
        first.clear_current_room_id("u2").await.unwrap();
        let reopened = JsonFileRoomPreferences::open(&path).await.unwrap();

        // Assert
        assert_eq!(reopened.current_room_id("u1").await.unwrap(), 4242);
        assert_eq!(reopened.current_room_id("u2").await.unwrap(), NO_ACTIVE_ROOM);
        assert_eq!(reopened.current_room_id("u3").await.unwrap(), NO_ACTIVE_ROOM);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rooms.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let result = JsonFileRoomPreferences::open(&path).await;

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }
}
