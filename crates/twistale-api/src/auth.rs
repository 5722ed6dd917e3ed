//! Bearer-token extractors.
//!
//! The token comes from `Authorization: Bearer <token>`, or from an
//! `access_token` query parameter for clients such as `EventSource` that
//! cannot set headers.

use axum::extract::{FromRequestParts, Query};
use axum::http::header;
use axum::http::request::Parts;
use serde::Deserialize;
use twistale_accounts::application::query_handlers::require_user;
use twistale_core::auth::{AuthUser, SessionToken};
use twistale_core::error::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

fn bearer_from_header(parts: &Parts) -> Option<Result<String, DomainError>> {
    let value = parts.headers.get(header::AUTHORIZATION)?;
    let parsed = value.to_str().ok().and_then(|raw| {
        let mut pieces = raw.split_whitespace();
        match (pieces.next(), pieces.next(), pieces.next()) {
            (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                Some(token.to_owned())
            }
            _ => None,
        }
    });
    Some(parsed.ok_or(DomainError::Unauthenticated))
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    access_token: Option<String>,
}

fn bearer_from_query(parts: &Parts) -> Option<String> {
    let Query(query) = Query::<TokenQuery>::try_from_uri(&parts.uri).ok()?;
    query.access_token.filter(|token| !token.is_empty())
}

/// The caller's session token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub SessionToken);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match bearer_from_header(parts) {
            Some(result) => result?,
            None => bearer_from_query(parts).ok_or(DomainError::Unauthenticated)?,
        };
        Ok(Self(SessionToken(token)))
    }
}

/// The signed-in user making the request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = require_user(state.auth.as_ref(), &token).await?;
        Ok(Self(user))
    }
}
