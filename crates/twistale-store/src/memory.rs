//! In-process document store and preference store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;
use twistale_core::document::{DocumentStore, DocumentSubscription, Precondition};
use twistale_core::error::DomainError;
use twistale_core::preferences::{NO_ACTIVE_ROOM, RoomPreferences};

const BROADCAST_CAPACITY: usize = 64;
const SUBSCRIPTION_BUFFER: usize = 16;

type DocumentKey = (String, String);

#[derive(Debug)]
struct Slot {
    document: Value,
    changes: broadcast::Sender<Option<Value>>,
}

fn lock_poisoned<T>(e: &std::sync::PoisonError<T>) -> DomainError {
    DomainError::Infrastructure(format!("store mutex poisoned: {e}"))
}

/// Document store held in memory. Each document has its own broadcast
/// channel; every committed change pushes the full document to it.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    slots: Mutex<HashMap<DocumentKey, Slot>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> Result<MutexGuard<'_, HashMap<DocumentKey, Slot>>, DomainError> {
        self.slots.lock().map_err(|e| lock_poisoned(&e))
    }

    fn key(collection: &str, key: &str) -> DocumentKey {
        (collection.to_owned(), key.to_owned())
    }

    fn write_field(
        slots: &mut HashMap<DocumentKey, Slot>,
        collection: &str,
        key: &str,
        precondition: Option<&Precondition>,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let slot = slots
            .get_mut(&Self::key(collection, key))
            .ok_or_else(|| DomainError::NotFound(format!("{collection}/{key}")))?;
        if let Some(precondition) = precondition {
            if !precondition.holds_for(&slot.document) {
                return Err(DomainError::ConcurrencyConflict {
                    key: format!("{collection}/{key}"),
                    detail: format!("{field} changed since it was read"),
                });
            }
        }
        let Some(fields) = slot.document.as_object_mut() else {
            return Err(DomainError::Infrastructure(format!(
                "{collection}/{key} is not an object"
            )));
        };
        fields.insert(field.to_owned(), value);
        // No receivers is not an error.
        let _ = slot.changes.send(Some(slot.document.clone()));
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), DomainError> {
        let mut slots = self.slots()?;
        let slot = slots.entry(Self::key(collection, key)).or_insert_with(|| Slot {
            document: Value::Null,
            changes: broadcast::channel(BROADCAST_CAPACITY).0,
        });
        slot.document = document;
        let _ = slot.changes.send(Some(slot.document.clone()));
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let mut slots = self.slots()?;
        Self::write_field(&mut slots, collection, key, None, field, value)
    }

    async fn update_field_if(
        &self,
        collection: &str,
        key: &str,
        precondition: Precondition,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let mut slots = self.slots()?;
        Self::write_field(&mut slots, collection, key, Some(&precondition), field, value)
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DomainError> {
        let slots = self.slots()?;
        Ok(slots
            .get(&Self::key(collection, key))
            .map(|slot| slot.document.clone()))
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        let mut slots = self.slots()?;
        if let Some(slot) = slots.remove(&Self::key(collection, key)) {
            // Subscribers see the deletion, then the channel closes.
            let _ = slot.changes.send(None);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<DocumentSubscription, DomainError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        // Snapshot and receiver are taken under one lock so no change is
        // missed between them.
        let mut changes = {
            let slots = self.slots()?;
            let slot = slots
                .get(&Self::key(collection, key))
                .ok_or_else(|| DomainError::NotFound(format!("{collection}/{key}")))?;
            tx.try_send(Ok(Some(slot.document.clone())))
                .map_err(|e| DomainError::Infrastructure(format!("subscription send: {e}")))?;
            slot.changes.subscribe()
        };

        let label = format!("{collection}/{key}");
        let task = tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => Ok(change),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(document = %label, skipped, "subscriber fell behind");
                        Err(DomainError::Infrastructure(format!(
                            "subscription to {label} fell behind by {skipped} changes"
                        )))
                    }
                };
                let last = !matches!(change, Ok(Some(_)));
                if tx.send(change).await.is_err() || last {
                    break;
                }
            }
        });

        Ok(DocumentSubscription::new(rx, Some(task)))
    }
}

/// Active-room preferences held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRoomPreferences {
    rooms: Mutex<HashMap<String, i32>>,
}

impl InMemoryRoomPreferences {
    /// Creates an empty preference store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoomPreferences for InMemoryRoomPreferences {
    async fn current_room_id(&self, user_id: &str) -> Result<i32, DomainError> {
        let rooms = self.rooms.lock().map_err(|e| lock_poisoned(&e))?;
        Ok(rooms.get(user_id).copied().unwrap_or(NO_ACTIVE_ROOM))
    }

    async fn set_current_room_id(&self, user_id: &str, room_id: i32) -> Result<(), DomainError> {
        let mut rooms = self.rooms.lock().map_err(|e| lock_poisoned(&e))?;
        rooms.insert(user_id.to_owned(), room_id);
        Ok(())
    }
}
