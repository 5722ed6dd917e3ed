//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::PgPool;
use twistale_api::state::{AppState, StoreKind};
use twistale_core::clock::Clock;
use twistale_core::document::DocumentStore;
use twistale_core::rng::DeterministicRng;
use twistale_game::application::services::GameSettings;
use twistale_store::memory::{InMemoryDocumentStore, InMemoryRoomPreferences};
use twistale_store::memory_auth::InMemoryAuthProvider;
use twistale_store::pg_document_store::PgDocumentStore;
use twistale_test_support::{FixedClock, RecordingBlobStore, SequenceRng};
use tower::ServiceExt;

/// A minimal payload starting with the PNG signature.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 3, 1, 12, 0, 0).unwrap(),
    ))
}

/// Build the full app router over in-memory collaborators. The RNG yields
/// room code 4242, then chain ids 101, 102, 103.
pub fn build_test_app() -> Router {
    build_test_app_with_rng(SequenceRng::new(vec![4242, 101, 102, 103]))
}

/// Build the full app router with a custom `SequenceRng`.
pub fn build_test_app_with_rng(rng: SequenceRng) -> Router {
    build_app(rng, Arc::new(InMemoryDocumentStore::new()), StoreKind::Memory)
}

/// Build the full app router over a real `PgDocumentStore`.
pub fn build_pg_test_app(pool: PgPool) -> Router {
    build_app(
        SequenceRng::new(vec![4242, 101, 102, 103]),
        Arc::new(PgDocumentStore::new(pool)),
        StoreKind::Postgres,
    )
}

fn build_app(rng: SequenceRng, documents: Arc<dyn DocumentStore>, store_kind: StoreKind) -> Router {
    let rng: Arc<Mutex<dyn DeterministicRng + Send>> = Arc::new(Mutex::new(rng));
    let app_state = AppState {
        clock: fixed_clock(),
        rng,
        documents,
        store_kind,
        blobs: Arc::new(RecordingBlobStore::new()),
        preferences: Arc::new(InMemoryRoomPreferences::new()),
        auth: Arc::new(InMemoryAuthProvider::new()),
        settings: GameSettings::default(),
    };
    twistale_api::router(app_state)
}

/// Send a request and return the raw response.
pub async fn send_raw(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = send_raw(app, request).await;
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap()
    };

    (status, json)
}

fn request(method: &str, uri: &str, token: Option<&str>) -> axum::http::request::Builder {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = request("POST", uri, token)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    send(app, request).await
}

/// Send a POST request without a body.
pub async fn post_empty(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let request = request("POST", uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Send a POST request with raw bytes.
pub async fn post_bytes(
    app: &Router,
    uri: &str,
    token: Option<&str>,
    bytes: &[u8],
) -> (StatusCode, serde_json::Value) {
    let request = request("POST", uri, token)
        .header(header::CONTENT_TYPE, "image/png")
        .body(Body::from(bytes.to_vec()))
        .unwrap();
    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let request = request("GET", uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

/// Send a DELETE request and return the response.
pub async fn delete(
    app: &Router,
    uri: &str,
    token: Option<&str>,
) -> (StatusCode, serde_json::Value) {
    let request = request("DELETE", uri, token).body(Body::empty()).unwrap();
    send(app, request).await
}

/// A registered user.
pub struct Account {
    pub token: String,
    pub uid: String,
}

/// Register an account named `name` and return its session.
pub async fn register(app: &Router, name: &str) -> Account {
    let (status, json) = post_json(
        app,
        "/api/v1/auth/register",
        None,
        &serde_json::json!({
            "email": format!("{}@example.com", name.to_lowercase()),
            "password": "secret1",
            "display_name": name,
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "register failed: {json}");

    Account {
        token: json["token"].as_str().unwrap().to_owned(),
        uid: json["user"]["uid"].as_str().unwrap().to_owned(),
    }
}

/// Register a host and a guest, create a room and join it.
pub async fn two_player_room(app: &Router) -> (Account, Account, String) {
    let ana = register(app, "Ana").await;
    let ben = register(app, "Ben").await;

    let (status, json) = post_empty(app, "/api/v1/rooms", Some(&ana.token)).await;
    assert_eq!(status, StatusCode::OK, "create failed: {json}");
    let room = json["room_id"].to_string();

    let (status, json) =
        post_empty(app, &format!("/api/v1/rooms/{room}/join"), Some(&ben.token)).await;
    assert_eq!(status, StatusCode::OK, "join failed: {json}");

    (ana, ben, room)
}
