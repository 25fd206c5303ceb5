//! Handlers for `/videos/{id}/languages/{lc}/subtitles/notes`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_db::models::note::SubtitleNote;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddNoteRequest {
    #[validate(length(min = 1, max = 4000))]
    pub body: String,
}

/// GET /api/v1/videos/{id}/languages/{lc}/subtitles/notes
pub async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<SubtitleNote>>>> {
    let notes = state
        .services
        .videos
        .list_notes(&id, &lc, viewer.actor())
        .await?;
    Ok(Json(DataResponse { data: notes }))
}

/// POST /api/v1/videos/{id}/languages/{lc}/subtitles/notes
pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<AddNoteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubtitleNote>>)> {
    input.validate()?;
    let note = state
        .services
        .videos
        .add_note(&id, &lc, user.actor(), &input.body)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: note })))
}
