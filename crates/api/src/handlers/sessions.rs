//! Handlers for the try-on session lifecycle.
//!
//! A session is created empty, receives a model and a garment image plus
//! a category, and then runs at most one attempt at a time. Attempts run
//! in a background task; clients poll `GET /sessions/{id}` for progress.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tryon_core::category::Category;
use tryon_core::selection::{ImageRole, SelectedImage};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::sessions::SessionView;
use crate::state::AppState;

/// Request body for `PUT /sessions/{id}/category`.
#[derive(Debug, Deserialize)]
pub struct CategoryInput {
    pub category: String,
}

/// POST /api/v1/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<DataResponse<SessionView>>) {
    let view = state.sessions.create(&state.cancel).await;
    (StatusCode::CREATED, Json(DataResponse { data: view }))
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let view = state.sessions.view(id).await?;
    Ok(Json(DataResponse { data: view }))
}

/// DELETE /api/v1/sessions/{id}
///
/// Cancels any in-flight attempt and releases the session's previews.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.sessions.remove(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/sessions/{id}/images/{role}
///
/// Accepts a multipart form with a required `file` field. Replacing an
/// image releases the preview of the previous one.
pub async fn select_image(
    State(state): State<AppState>,
    Path((id, role)): Path<(Uuid, String)>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let role: ImageRole = role.parse()?;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{role}-image"));
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        file = Some((file_name, content_type, data.to_vec()));
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    let image = SelectedImage::new(role, file_name, content_type.as_deref(), bytes)?;

    tracing::info!(
        session_id = %id,
        %role,
        file_name = %image.file_name,
        content_type = %image.content_type,
        bytes = image.len(),
        "Image selected",
    );

    let previews = state.previews.clone();
    let view = state
        .sessions
        .update(id, |session| {
            session.select_image(image, &previews);
            Ok(())
        })
        .await?;

    Ok(Json(DataResponse { data: view }))
}

/// PUT /api/v1/sessions/{id}/category
pub async fn set_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CategoryInput>,
) -> AppResult<Json<DataResponse<SessionView>>> {
    let category: Category = input.category.parse()?;
    let view = state
        .sessions
        .update(id, |session| {
            session.set_category(category);
            Ok(())
        })
        .await?;
    Ok(Json(DataResponse { data: view }))
}

/// POST /api/v1/sessions/{id}/try-on
///
/// Starts an attempt and returns 202 immediately. Returns 400 when an
/// image is missing (no collaborator is contacted) and 409 while another
/// attempt is still running.
pub async fn start_try_on(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<DataResponse<SessionView>>)> {
    let started = state.sessions.begin_attempt(id).await?;
    let attempt_id = started.inputs.attempt_id;

    tracing::info!(
        session_id = %id,
        %attempt_id,
        category = %started.inputs.category,
        "Try-on attempt started",
    );

    let workflow = state.workflow.clone();
    let sessions = state.sessions.clone();
    let inputs = started.inputs;
    let cancel = started.cancel;
    tokio::spawn(async move {
        let result = workflow.run(&inputs, &cancel).await;
        sessions.finish(id, attempt_id, &result).await;
    });

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: started.view })))
}
