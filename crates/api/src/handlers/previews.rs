use axum::extract::{Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::IntoResponse;
use tryon_core::error::CoreError;
use uuid::Uuid;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/v1/previews/{preview_id}
///
/// Serves the bytes of a live preview. Returns 404 once the preview has
/// been released.
pub async fn get_preview(
    State(state): State<AppState>,
    Path(preview_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .previews
        .get(preview_id)
        .ok_or_else(|| CoreError::NotFound {
            entity: "Preview",
            id: preview_id.to_string(),
        })?;

    Ok((
        [
            (CONTENT_TYPE, entry.content_type),
            (CACHE_CONTROL, "no-store".to_string()),
        ],
        entry.bytes.to_vec(),
    ))
}
