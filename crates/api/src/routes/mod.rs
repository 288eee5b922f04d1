pub mod health;
pub mod sessions;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sessions                           create
/// /sessions/{id}                      get, delete
/// /sessions/{id}/images/{role}        select model or garment image (PUT)
/// /sessions/{id}/category             set category (PUT)
/// /sessions/{id}/try-on               start attempt (POST)
///
/// /previews/{preview_id}              preview bytes
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/previews", sessions::preview_router())
}

/// Root-level page routes.
pub fn page_router() -> Router<AppState> {
    Router::new().route("/", get(handlers::page::index))
}
