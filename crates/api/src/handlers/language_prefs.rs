//! Handlers for a team's preferred and blacklisted languages.

use axum::extract::{Path, State};
use axum::Json;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/teams/{slug}/languages/preferred
pub async fn get_preferred(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let lists = state.services.language_prefs.lists(&slug).await?;
    Ok(Json(DataResponse {
        data: lists.preferred,
    }))
}

/// PUT /api/v1/teams/{slug}/languages/preferred
///
/// Replaces the list. Codes also on the blacklist are rejected.
pub async fn set_preferred(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(codes): Json<Vec<String>>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let lists = state
        .services
        .language_prefs
        .set_preferred(&slug, user.actor(), codes)
        .await?;
    Ok(Json(DataResponse {
        data: lists.preferred,
    }))
}

/// GET /api/v1/teams/{slug}/languages/blacklisted
pub async fn get_blacklisted(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let lists = state.services.language_prefs.lists(&slug).await?;
    Ok(Json(DataResponse {
        data: lists.blacklisted,
    }))
}

/// PUT /api/v1/teams/{slug}/languages/blacklisted
pub async fn set_blacklisted(
    State(state): State<AppState>,
    user: AuthUser,
    Path(slug): Path<String>,
    Json(codes): Json<Vec<String>>,
) -> AppResult<Json<DataResponse<Vec<String>>>> {
    let lists = state
        .services
        .language_prefs
        .set_blacklisted(&slug, user.actor(), codes)
        .await?;
    Ok(Json(DataResponse {
        data: lists.blacklisted,
    }))
}
