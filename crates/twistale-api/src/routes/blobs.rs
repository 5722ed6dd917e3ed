//! Serves uploaded drawings.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use twistale_core::error::DomainError;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /blobs/{*path}
async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state
        .blobs
        .download(&path)
        .await?
        .ok_or_else(|| DomainError::NotFound(format!("blob {path}")))?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}

/// Returns the blob router.
pub fn router() -> Router<AppState> {
    Router::new().route("/blobs/{*path}", get(download))
}
