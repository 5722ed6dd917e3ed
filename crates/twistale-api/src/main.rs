//! Twistale API server entry point.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use twistale_api::config::AppConfig;
use twistale_api::error::AppError;
use twistale_api::state::{AppState, StoreKind};
use twistale_core::clock::SystemClock;
use twistale_core::document::DocumentStore;
use twistale_core::preferences::RoomPreferences;
use twistale_core::rng::SystemRng;
use twistale_game::application::services::GameSettings;
use twistale_store::fs_blob_store::FsBlobStore;
use twistale_store::json_preferences::JsonFileRoomPreferences;
use twistale_store::memory::{InMemoryDocumentStore, InMemoryRoomPreferences};
use twistale_store::memory_auth::InMemoryAuthProvider;
use twistale_store::pg_document_store::PgDocumentStore;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Twistale API server");

    let config = AppConfig::from_env()?;

    let (documents, store_kind): (Arc<dyn DocumentStore>, StoreKind) =
        if let Some(database_url) = &config.database_url {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("../../migrations").run(&pool).await?;
            (Arc::new(PgDocumentStore::new(pool)), StoreKind::Postgres)
        } else {
            tracing::warn!("DATABASE_URL not set, rooms are kept in memory");
            (Arc::new(InMemoryDocumentStore::new()), StoreKind::Memory)
        };

    let preferences: Arc<dyn RoomPreferences> = match &config.preferences_path {
        Some(path) => Arc::new(JsonFileRoomPreferences::open(path).await?),
        None => Arc::new(InMemoryRoomPreferences::new()),
    };

    let app_state = AppState {
        clock: Arc::new(SystemClock),
        rng: Arc::new(Mutex::new(SystemRng::new())),
        documents,
        store_kind,
        blobs: Arc::new(FsBlobStore::new(&config.blob_root, &config.public_base_url)),
        preferences,
        auth: Arc::new(InMemoryAuthProvider::new()),
        settings: GameSettings {
            min_players: config.min_players,
            write_policy: config.write_policy,
        },
    };

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = twistale_api::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!(%addr, store = ?store_kind, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
