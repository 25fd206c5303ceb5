//! Handlers for `/videos/{id}/languages`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_core::lineage::TranslationStatus;
use subhub_db::models::language::SubtitleLanguage;
use subhub_pipeline::videos::LanguageSummary;

use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLanguageRequest {
    pub language_code: String,
    #[serde(default)]
    pub subtitles_complete: bool,
}

/// GET /api/v1/videos/{id}/languages
pub async fn list(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<LanguageSummary>>>> {
    let languages = state
        .services
        .videos
        .list_languages(&id, viewer.actor())
        .await?;
    Ok(Json(DataResponse { data: languages }))
}

/// POST /api/v1/videos/{id}/languages
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<CreateLanguageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubtitleLanguage>>)> {
    let language = state
        .services
        .videos
        .create_language(
            &id,
            user.actor(),
            &input.language_code,
            input.subtitles_complete,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: language })))
}

/// POST /api/v1/videos/{id}/languages/{lc}/fork
pub async fn fork(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<SubtitleLanguage>>> {
    let language = state
        .services
        .videos
        .fork_language(&id, &lc, user.actor())
        .await?;
    Ok(Json(DataResponse { data: language }))
}

/// GET /api/v1/videos/{id}/languages/{lc}/status
///
/// `data` is null for originals and forked translations.
pub async fn status(
    State(state): State<AppState>,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Option<TranslationStatus>>>> {
    let status = state.services.videos.translation_status(&id, &lc).await?;
    Ok(Json(DataResponse { data: status }))
}
