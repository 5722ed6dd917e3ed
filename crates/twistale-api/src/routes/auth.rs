//! Routes for the accounts context.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    Json, Router,
    routing::{get, post},
};
use serde::Deserialize;
use tracing::{info, instrument};
use twistale_accounts::application::command_handlers;
use twistale_accounts::domain::commands;
use twistale_core::auth::{AuthUser, Session};
use uuid::Uuid;

use crate::auth::{BearerToken, CurrentUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /register.
#[derive(Deserialize)]
pub struct RegisterRequest {
    /// Sign-in e-mail address.
    pub email: String,
    /// Password, at least six characters.
    pub password: String,
    /// Name shown to other players.
    pub display_name: String,
}

/// Request body for POST /login.
#[derive(Deserialize)]
pub struct LoginRequest {
    /// Sign-in e-mail address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// POST /register
#[instrument(skip_all)]
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<Session>, ApiError> {
    let command = commands::RegisterAccount {
        correlation_id: Uuid::new_v4(),
        email: request.email,
        password: request.password,
        display_name: request.display_name,
    };

    info!(correlation_id = %command.correlation_id, "handling register command");

    let session = command_handlers::handle_register(&command, state.auth.as_ref()).await?;
    Ok(Json(session))
}

/// POST /login
#[instrument(skip_all)]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<Session>, ApiError> {
    let command = commands::SignIn {
        correlation_id: Uuid::new_v4(),
        email: request.email,
        password: request.password,
    };

    info!(correlation_id = %command.correlation_id, "handling sign_in command");

    let session = command_handlers::handle_sign_in(&command, state.auth.as_ref()).await?;
    Ok(Json(session))
}

/// POST /logout
#[instrument(skip_all)]
async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError> {
    let command = commands::SignOut {
        correlation_id: Uuid::new_v4(),
        token,
    };

    info!(correlation_id = %command.correlation_id, "handling sign_out command");

    command_handlers::handle_sign_out(&command, state.auth.as_ref()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /me
async fn me(CurrentUser(user): CurrentUser) -> Json<AuthUser> {
    Json(user)
}

/// Returns the router for the accounts context.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
