//! Routes for the game room context.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Json, Router,
    routing::{get, post},
};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use twistale_core::auth::AuthUser;
use twistale_core::error::DomainError;
use twistale_game::application::command_handlers::{self, RoomCommandResult};
use twistale_game::application::query_handlers::{self, RoomSubscription};
use twistale_game::domain::commands;
use twistale_game::domain::model::{Game, GameStatus, Story};
use twistale_game::domain::room_id::RoomId;
use twistale_game::domain::views::{Destination, LobbyState, PlayState};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ErrorBody};
use crate::state::AppState;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// A room as written by a command.
#[derive(Debug, Serialize)]
pub struct RoomResponse {
    /// The room's code.
    pub room_id: RoomId,
    /// The room document.
    pub game: Game,
}

impl From<RoomCommandResult> for RoomResponse {
    fn from(result: RoomCommandResult) -> Self {
        Self {
            room_id: result.room_id,
            game: result.game,
        }
    }
}

/// Response body for GET /current.
#[derive(Debug, Serialize)]
pub struct CurrentRoomResponse {
    /// The caller's active room, if any.
    pub room_id: Option<RoomId>,
}

/// Request body for POST /{id}/tales/writing.
#[derive(Debug, Deserialize)]
pub struct WritingRequest {
    /// The phrase.
    pub text: String,
}

/// Query string for GET /{id}/play.
#[derive(Debug, Default, Deserialize)]
pub struct PlayQuery {
    /// The round the caller last saw.
    pub last_round: Option<u32>,
}

fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    Ok(raw.parse::<RoomId>()?)
}

/// POST /
#[instrument(skip_all, fields(uid = %user.uid))]
async fn create_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::CreateRoom {
        correlation_id: Uuid::new_v4(),
    };

    info!(correlation_id = %command.correlation_id, "handling create_room command");

    let result = command_handlers::handle_create_room(
        &command,
        &user,
        state.rng.as_ref(),
        &state.room_services(),
    )
    .await?;
    Ok(Json(result.into()))
}

/// GET /current
async fn current_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CurrentRoomResponse>, ApiError> {
    let room_id = query_handlers::current_room_id(
        state.preferences.as_ref(),
        state.documents.as_ref(),
        &user.uid,
    )
    .await?;
    Ok(Json(CurrentRoomResponse { room_id }))
}

/// GET /{id}
async fn get_room(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let game = query_handlers::get_room(state.documents.as_ref(), room_id).await?;
    Ok(Json(RoomResponse { room_id, game }))
}

/// POST /{id}/join
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn join_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::JoinRoom {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling join_room command");

    let result =
        command_handlers::handle_join_room(&command, &user, &state.room_services()).await?;
    Ok(Json(result.into()))
}

/// POST /{id}/start
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn start_game(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::StartGame {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling start_game command");

    let result =
        command_handlers::handle_start_game(&command, &user, &state.room_services()).await?;
    Ok(Json(result.into()))
}

/// GET /{id}/lobby
async fn lobby(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<LobbyState>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let lobby = query_handlers::lobby_state(
        state.documents.as_ref(),
        room_id,
        &user.uid,
        state.settings.min_players,
    )
    .await?;
    Ok(Json(lobby))
}

/// GET /{id}/play
async fn play(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<PlayQuery>,
) -> Result<Json<PlayState>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let play = query_handlers::play_state(
        state.documents.as_ref(),
        room_id,
        &user.uid,
        query.last_round,
    )
    .await?;
    Ok(Json(play))
}

async fn submit(
    state: &AppState,
    user: &AuthUser,
    room_id: RoomId,
    input: commands::TaleInput,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::SubmitTale {
        correlation_id: Uuid::new_v4(),
        room_id,
        input,
    };

    info!(correlation_id = %command.correlation_id, "handling submit_tale command");

    let result = command_handlers::handle_submit_tale(
        &command,
        user,
        state.rng.as_ref(),
        &state.room_services(),
    )
    .await?;
    Ok(Json(result.into()))
}

/// POST /{id}/tales/writing
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn submit_writing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<WritingRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = parse_room_id(&id)?;
    submit(&state, &user, room_id, commands::TaleInput::Text(request.text)).await
}

/// POST /{id}/tales/drawing, body: PNG bytes.
#[instrument(skip_all, fields(room = %id, uid = %user.uid, bytes = body.len()))]
async fn submit_drawing(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<RoomResponse>, ApiError> {
    let room_id = parse_room_id(&id)?;
    if !body.starts_with(&PNG_SIGNATURE) {
        return Err(DomainError::Validation("drawing must be a PNG image".into()).into());
    }
    submit(&state, &user, room_id, commands::TaleInput::Drawing(body.to_vec())).await
}

/// POST /{id}/next-round
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn next_round(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::StartNextRound {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling start_next_round command");

    let result =
        command_handlers::handle_start_next_round(&command, &user, &state.room_services())
            .await?;
    Ok(Json(result.into()))
}

/// POST /{id}/finish
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn finish_game(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let command = commands::FinishGame {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling finish_game command");

    let result =
        command_handlers::handle_finish_game(&command, &user, &state.room_services()).await?;
    Ok(Json(result.into()))
}

/// GET /{id}/stories
async fn stories(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<Story>>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let stories =
        query_handlers::get_all_stories(state.documents.as_ref(), room_id, &user.uid).await?;
    Ok(Json(stories))
}

/// POST /{id}/leave
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn leave_room(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let command = commands::LeaveRoom {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling leave_room command");

    command_handlers::handle_leave_room(&command, &user, &state.room_services()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /{id}
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn end_game(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let command = commands::EndGame {
        correlation_id: Uuid::new_v4(),
        room_id: parse_room_id(&id)?,
    };

    info!(correlation_id = %command.correlation_id, "handling end_game command");

    command_handlers::handle_end_game(&command, &user, &state.room_services()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Payload of every event on the room feed.
#[derive(Debug, Serialize)]
struct RoomEvent<'a> {
    room_id: RoomId,
    game: Option<&'a Game>,
    lobby: &'a LobbyState,
    play: Option<&'a PlayState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

/// Folds room pushes into the viewer's lobby and play states.
struct EventFeed {
    subscription: RoomSubscription,
    user_id: String,
    min_players: usize,
    lobby: LobbyState,
    play: PlayState,
    done: bool,
}

impl EventFeed {
    async fn next_event(&mut self) -> Option<Event> {
        if self.done {
            return None;
        }
        let (snapshot, mut failure) = match self.subscription.next().await? {
            Ok(snapshot) => (snapshot, None),
            Err(e) => (None, Some(ApiError(e).body())),
        };

        self.lobby = LobbyState::reduce(
            &self.lobby,
            snapshot.as_ref(),
            &self.user_id,
            self.min_players,
        );
        let playing = snapshot
            .as_ref()
            .is_none_or(|game| game.status != GameStatus::Waiting);
        if playing {
            match PlayState::reduce(&self.play, snapshot.as_ref(), &self.user_id) {
                Ok(play) => self.play = play,
                Err(e) => {
                    self.play = PlayState {
                        destination: Destination::Exit,
                        ..PlayState::default()
                    };
                    failure = Some(ApiError(e).body());
                }
            }
        }

        let name = match (&failure, &snapshot) {
            (Some(_), _) => "error",
            (None, None) => "closed",
            (None, Some(_)) => "snapshot",
        };
        self.done = name != "snapshot";
        let payload = RoomEvent {
            room_id: self.subscription.room_id(),
            game: snapshot.as_ref(),
            lobby: &self.lobby,
            play: playing.then_some(&self.play),
            error: failure,
        };
        let event = Event::default().event(name).json_data(&payload);
        Some(event.unwrap_or_else(|e| {
            Event::default()
                .event("error")
                .data(format!("failed to encode room event: {e}"))
        }))
    }
}

/// GET /{id}/events
///
/// Server-sent events: one `snapshot` per committed change carrying the room
/// and the caller's lobby and play states, then `closed` once the room is
/// deleted, or `error` if the feed fails. The last event always carries the
/// exit destination.
#[instrument(skip_all, fields(room = %id, uid = %user.uid))]
async fn events(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let room_id = parse_room_id(&id)?;
    let game = query_handlers::get_room(state.documents.as_ref(), room_id).await?;
    if game.player(&user.uid).is_none() {
        return Err(DomainError::Forbidden(format!("{} is not in room {room_id}", user.uid)).into());
    }
    let subscription = query_handlers::observe_room(state.documents.as_ref(), room_id).await?;

    info!("room feed opened");

    let feed = EventFeed {
        subscription,
        user_id: user.uid,
        min_players: state.settings.min_players,
        lobby: LobbyState::for_room(room_id),
        play: PlayState::default(),
        done: false,
    };
    let stream = futures::stream::unfold(feed, |mut feed| async move {
        feed.next_event()
            .await
            .map(|event| (Ok::<_, Infallible>(event), feed))
    });
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Returns the router for the game room context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_room))
        .route("/current", get(current_room))
        .route("/{id}", get(get_room).delete(end_game))
        .route("/{id}/join", post(join_room))
        .route("/{id}/start", post(start_game))
        .route("/{id}/lobby", get(lobby))
        .route("/{id}/play", get(play))
        .route("/{id}/tales/writing", post(submit_writing))
        .route("/{id}/tales/drawing", post(submit_drawing))
        .route("/{id}/next-round", post(next_round))
        .route("/{id}/finish", post(finish_game))
        .route("/{id}/stories", get(stories))
        .route("/{id}/events", get(events))
        .route("/{id}/leave", post(leave_room))
}
