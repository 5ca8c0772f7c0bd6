//! Card download handler
//!
//! Handles GET /api/cards/{id} for cards still inside their TTL.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::state::AppState;

/// GET /api/cards/{id} - Download a rendered card
///
/// Returns 404 once the card has expired or been swept.
pub async fn card_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state
        .artifacts
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Card not found or expired"))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/jpeg"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        bytes,
    )
        .into_response())
}
