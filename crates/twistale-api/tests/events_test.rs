//! Integration tests for the room event stream.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;

async fn next_chunk(body: &mut Body) -> Option<String> {
    let frame = body.frame().await?.unwrap();
    let data = frame.into_data().unwrap();
    Some(String::from_utf8(data.to_vec()).unwrap())
}

#[tokio::test]
async fn test_event_stream_pushes_snapshots_until_room_closes() {
    let app = common::build_test_app();
    let (ana, ben, room) = common::two_player_room(&app).await;

    // EventSource clients pass the token in the query string.
    let response = common::send_raw(
        &app,
        Request::builder()
            .uri(format!("/api/v1/rooms/{room}/events?access_token={}", ben.token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    let mut body = response.into_body();

    let first = next_chunk(&mut body).await.unwrap();
    assert!(first.starts_with("event: snapshot\n"), "{first}");
    assert!(first.contains("\"destination\":\"lobby\""), "{first}");
    assert!(first.contains("\"play\":null"), "{first}");

    common::post_empty(&app, &format!("/api/v1/rooms/{room}/start"), Some(&ana.token)).await;
    let started = next_chunk(&mut body).await.unwrap();
    assert!(started.starts_with("event: snapshot\n"), "{started}");
    assert!(started.contains("\"IN_PROGRESS\""), "{started}");
    assert!(started.contains("\"round_type\":\"WRITING\""), "{started}");

    common::delete(&app, &format!("/api/v1/rooms/{room}"), Some(&ana.token)).await;
    let closed = next_chunk(&mut body).await.unwrap();
    assert!(closed.starts_with("event: closed\n"), "{closed}");
    assert!(closed.contains("\"destination\":\"exit\""), "{closed}");

    assert_eq!(next_chunk(&mut body).await, None);
}

#[tokio::test]
async fn test_event_stream_rejects_outsiders() {
    let app = common::build_test_app();
    let (_ana, _ben, room) = common::two_player_room(&app).await;
    let carl = common::register(&app, "Carl").await;

    let (status, json) = common::get_json(
        &app,
        &format!("/api/v1/rooms/{room}/events"),
        Some(&carl.token),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["error"], "forbidden");
}

#[tokio::test]
async fn test_event_stream_for_missing_room_is_not_found() {
    let app = common::build_test_app();
    let ana = common::register(&app, "Ana").await;

    let (status, _) =
        common::get_json(&app, "/api/v1/rooms/9999/events", Some(&ana.token)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
