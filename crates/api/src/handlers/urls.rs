//! Handlers for `/videos/{id}/urls`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use subhub_core::types::DbId;
use subhub_db::models::video::VideoUrl;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AddUrlRequest {
    #[validate(length(min = 1, max = 512))]
    pub url: String,
    #[serde(default)]
    pub primary: bool,
}

/// GET /api/v1/videos/{id}/urls
pub async fn list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Vec<VideoUrl>>>> {
    let urls = state.services.videos.list_urls(&id).await?;
    Ok(Json(DataResponse { data: urls }))
}

/// POST /api/v1/videos/{id}/urls
pub async fn add(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(input): Json<AddUrlRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<VideoUrl>>)> {
    input.validate()?;
    let url = state
        .services
        .videos
        .add_url(&id, user.actor(), &input.url, input.primary)
        .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: url })))
}

/// PUT /api/v1/videos/{id}/urls/{url_id}
///
/// Promotes the URL to primary; the previous primary is demoted.
pub async fn make_primary(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, url_id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<VideoUrl>>> {
    let url = state
        .services
        .videos
        .make_primary(&id, url_id, user.actor())
        .await?;
    Ok(Json(DataResponse { data: url }))
}

/// DELETE /api/v1/videos/{id}/urls/{url_id}
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, url_id)): Path<(String, DbId)>,
) -> AppResult<StatusCode> {
    state
        .services
        .videos
        .delete_url(&id, url_id, user.actor())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
