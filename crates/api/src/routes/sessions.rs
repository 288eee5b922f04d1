//! Route definitions for try-on sessions and their previews.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tryon_core::selection::MAX_IMAGE_BYTES;

use crate::handlers::{previews, sessions};
use crate::state::AppState;

/// Headroom for multipart framing on top of the image itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Session routes mounted at `/sessions`.
///
/// ```text
/// POST   /                      -> create_session
/// GET    /{id}                  -> get_session
/// DELETE /{id}                  -> delete_session
/// PUT    /{id}/images/{role}    -> select_image
/// PUT    /{id}/category         -> set_category
/// POST   /{id}/try-on           -> start_try_on
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(sessions::create_session))
        .route(
            "/{id}",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route(
            "/{id}/images/{role}",
            put(sessions::select_image)
                .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/{id}/category", put(sessions::set_category))
        .route("/{id}/try-on", post(sessions::start_try_on))
}

/// Preview routes mounted at `/previews`.
///
/// ```text
/// GET /{preview_id}  -> get_preview
/// ```
pub fn preview_router() -> Router<AppState> {
    Router::new().route("/{preview_id}", get(previews::get_preview))
}
