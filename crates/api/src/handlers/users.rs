//! Handlers for `/users`.
//!
//! There is no password store; creating a user hands back an access token
//! directly, which is enough for local development and the test suite.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use subhub_core::error::CoreError;
use subhub_db::models::user::User;
use validator::Validate;

use crate::auth::jwt::generate_access_token;
use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 30))]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedUser {
    pub user: User,
    pub access_token: String,
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreatedUser>>)> {
    input.validate()?;

    let mut tx = state.services.ctx.begin().await?;
    if tx.find_user_by_username(&input.username).await?.is_some() {
        tx.rollback().await?;
        return Err(CoreError::Conflict(format!(
            "Username '{}' is taken",
            input.username
        ))
        .into());
    }
    let user = tx.create_user(&input.username).await?;
    tx.commit().await?;

    let access_token = generate_access_token(user.id, &user.username, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation failed: {e}")))?;

    tracing::info!(user_id = user.id, username = %user.username, "User created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CreatedUser { user, access_token },
        }),
    ))
}
