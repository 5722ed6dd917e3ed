//! `PostgreSQL` implementation of the `DocumentStore` trait.
//!
//! Documents live in one JSONB column. A trigger announces every change on
//! [`DOCUMENT_CHANGES_CHANNEL`]. One listener per store, started on the first
//! subscription, re-reads each announced document and fans it out through a
//! broadcast channel per key, so open subscriptions cost no pool connections
//! beyond the listener's own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use twistale_core::document::{DocumentStore, DocumentSubscription, Precondition};
use twistale_core::error::DomainError;

/// Channel the documents trigger notifies on.
pub const DOCUMENT_CHANGES_CHANNEL: &str = "document_changes";

const BROADCAST_CAPACITY: usize = 64;
const SUBSCRIPTION_BUFFER: usize = 16;

type DocumentKey = (String, String);

fn db_error(e: &sqlx::Error) -> DomainError {
    DomainError::Infrastructure(format!("document store error: {e}"))
}

fn lock_poisoned<T>(e: &std::sync::PoisonError<T>) -> DomainError {
    DomainError::Infrastructure(format!("listener mutex poisoned: {e}"))
}

#[derive(Debug, Deserialize)]
struct ChangeNotice {
    collection: String,
    key: String,
}

/// Per-key senders owned by one listener. `closed` is set once the listener
/// stops; a closed set never takes new receivers.
#[derive(Debug, Default)]
struct Channels {
    closed: bool,
    senders: HashMap<DocumentKey, broadcast::Sender<Option<Value>>>,
}

type SharedChannels = Arc<Mutex<Channels>>;

#[derive(Debug)]
struct Listener {
    task: JoinHandle<()>,
    channels: SharedChannels,
}

#[derive(Debug, Default)]
struct Fanout {
    listener: tokio::sync::Mutex<Option<Listener>>,
}

impl Drop for Fanout {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.task.abort();
        }
    }
}

/// PostgreSQL-backed document store.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    fanout: Arc<Fanout>,
}

impl PgDocumentStore {
    /// Creates a new `PgDocumentStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            fanout: Arc::new(Fanout::default()),
        }
    }

    async fn fetch(pool: &PgPool, collection: &str, key: &str) -> Result<Option<Value>, DomainError> {
        sqlx::query_scalar::<_, Value>(
            "SELECT body FROM documents WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| db_error(&e))
    }

    /// Returns the channels of the running listener, starting a new listener
    /// when none is running.
    async fn listener_channels(&self) -> Result<SharedChannels, DomainError> {
        let mut current = self.fanout.listener.lock().await;
        if let Some(listener) = current.as_ref() {
            let closed = listener.channels.lock().map_err(|e| lock_poisoned(&e))?.closed;
            if !closed && !listener.task.is_finished() {
                return Ok(Arc::clone(&listener.channels));
            }
        }

        let mut listener = PgListener::connect_with(&self.pool)
            .await
            .map_err(|e| db_error(&e))?;
        listener
            .listen(DOCUMENT_CHANGES_CHANNEL)
            .await
            .map_err(|e| db_error(&e))?;
        info!(channel = DOCUMENT_CHANGES_CHANNEL, "document listener started");

        let channels = SharedChannels::default();
        let task = tokio::spawn(fan_out(listener, self.pool.clone(), Arc::clone(&channels)));
        *current = Some(Listener {
            task,
            channels: Arc::clone(&channels),
        });
        Ok(channels)
    }
}

fn channels_guard(channels: &SharedChannels) -> Result<MutexGuard<'_, Channels>, DomainError> {
    channels.lock().map_err(|e| lock_poisoned(&e))
}

/// Re-reads every announced document that has receivers and pushes it to
/// them. A deleted document is pushed as `None` and its channel dropped; a
/// failed re-read drops the channel so its receivers see it close.
async fn fan_out(mut listener: PgListener, pool: PgPool, channels: SharedChannels) {
    loop {
        let notification = match listener.recv().await {
            Ok(notification) => notification,
            Err(e) => {
                warn!(error = %e, "document listener failed");
                break;
            }
        };
        let Ok(notice) = serde_json::from_str::<ChangeNotice>(notification.payload()) else {
            debug!(payload = notification.payload(), "ignoring malformed change notice");
            continue;
        };
        let key = (notice.collection, notice.key);

        let watched = match channels_guard(&channels) {
            Ok(mut guard) => {
                guard.senders.retain(|_, sender| sender.receiver_count() > 0);
                guard.senders.contains_key(&key)
            }
            Err(_) => break,
        };
        if !watched {
            continue;
        }

        let change = PgDocumentStore::fetch(&pool, &key.0, &key.1).await;
        let Ok(mut guard) = channels_guard(&channels) else {
            break;
        };
        match change {
            Ok(document) => {
                let deleted = document.is_none();
                if let Some(sender) = guard.senders.get(&key) {
                    // No receivers is not an error.
                    let _ = sender.send(document);
                }
                if deleted {
                    guard.senders.remove(&key);
                }
            }
            Err(e) => {
                warn!(collection = %key.0, key = %key.1, error = %e, "document re-read failed");
                guard.senders.remove(&key);
            }
        }
    }

    if let Ok(mut guard) = channels_guard(&channels) {
        guard.closed = true;
        guard.senders.clear();
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn set(&self, collection: &str, key: &str, document: Value) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO documents (collection, key, body) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, key) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()",
        )
        .bind(collection)
        .bind(key)
        .bind(document)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn update_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE documents SET body = jsonb_set(body, ARRAY[$3], $4, true), updated_at = NOW() \
             WHERE collection = $1 AND key = $2",
        )
        .bind(collection)
        .bind(key)
        .bind(field)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("{collection}/{key}")));
        }
        Ok(())
    }

    async fn update_field_if(
        &self,
        collection: &str,
        key: &str,
        precondition: Precondition,
        field: &str,
        value: Value,
    ) -> Result<(), DomainError> {
        let Precondition::FieldEquals {
            field: guard_field,
            value: guard_value,
        } = precondition;

        let result = sqlx::query(
            "UPDATE documents SET body = jsonb_set(body, ARRAY[$3], $4, true), updated_at = NOW() \
             WHERE collection = $1 AND key = $2 AND body -> $5 = $6",
        )
        .bind(collection)
        .bind(key)
        .bind(field)
        .bind(value)
        .bind(guard_field)
        .bind(guard_value)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(&e))?;

        if result.rows_affected() == 0 {
            if Self::fetch(&self.pool, collection, key).await?.is_none() {
                return Err(DomainError::NotFound(format!("{collection}/{key}")));
            }
            return Err(DomainError::ConcurrencyConflict {
                key: format!("{collection}/{key}"),
                detail: format!("{guard_field} changed since it was read"),
            });
        }
        Ok(())
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, DomainError> {
        Self::fetch(&self.pool, collection, key).await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND key = $2")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(&e))?;
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &str,
        key: &str,
    ) -> Result<DocumentSubscription, DomainError> {
        let label = format!("{collection}/{key}");
        // Register with the listener before the first read so no change
        // between them is missed.
        let channels = self.listener_channels().await?;
        let mut changes = {
            let mut guard = channels_guard(&channels)?;
            if guard.closed {
                return Err(DomainError::Infrastructure(format!(
                    "document listener closed before {label} was subscribed"
                )));
            }
            guard
                .senders
                .entry((collection.to_owned(), key.to_owned()))
                .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
                .subscribe()
        };

        let current = Self::fetch(&self.pool, collection, key)
            .await?
            .ok_or_else(|| DomainError::NotFound(label.clone()))?;

        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        tx.try_send(Ok(Some(current)))
            .map_err(|e| DomainError::Infrastructure(format!("subscription send: {e}")))?;

        let task = tokio::spawn(async move {
            loop {
                let change = match changes.recv().await {
                    Ok(change) => Ok(change),
                    Err(broadcast::error::RecvError::Closed) => {
                        warn!(document = %label, "document listener closed");
                        Err(DomainError::Infrastructure(format!(
                            "change feed for {label} closed"
                        )))
                    }
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
