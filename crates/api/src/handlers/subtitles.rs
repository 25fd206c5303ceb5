//! Handlers for `/videos/{id}/languages/{lc}/subtitles`.
//!
//! Payloads travel as a string in one of the interchange formats, except
//! `sub_format=json`, where `subtitles` may also be the native item list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use subhub_core::error::CoreError;
use subhub_core::lineage::Lineage;
use subhub_core::subtitles::{json as native_json, SubtitleDiff, SubtitleFormat, SubtitleSet};
use subhub_core::types::{DbId, Timestamp};
use subhub_core::version_graph::{ParentRef, ParentSpec};
use subhub_core::visibility::{VersionVisibility, Visibility};
use subhub_core::workflow::WorkflowAction;
use subhub_db::models::version::SubtitleVersion;
use subhub_pipeline::pipeline::{AddSubtitlesOptions, ORIGIN_API, ORIGIN_EDITOR};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::{DiffQuery, VersionQuery};
use crate::response::DataResponse;
use crate::state::AppState;

/// Format assumed for string payloads when the caller names none.
const DEFAULT_FORMAT: SubtitleFormat = SubtitleFormat::Dfxp;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct AddSubtitlesRequest {
    pub subtitles: Value,
    pub sub_format: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub metadata: Option<Value>,
    pub action: Option<WorkflowAction>,
    pub is_complete: Option<bool>,
    #[serde(default)]
    pub from_editor: bool,
    #[serde(default)]
    pub parents: Vec<ParentSpec>,
}

#[derive(Debug, Deserialize)]
pub struct RollbackRequest {
    pub version: i32,
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: WorkflowAction,
}

/// One version as the API shows it.
#[derive(Debug, Serialize)]
pub struct VersionView {
    pub video_id: String,
    pub language_code: String,
    pub version_number: i32,
    pub author_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub metadata: Value,
    pub visibility: Visibility,
    pub subtitle_count: i32,
    pub rollback_of_version_number: Option<i32>,
    pub parents: Vec<ParentRef>,
    pub lineage: Lineage,
    pub origin: String,
    pub created_at: Timestamp,
    pub sub_format: SubtitleFormat,
    /// A string in `sub_format`, or the item list for json.
    pub subtitles: Value,
}

impl VersionView {
    fn render(version: SubtitleVersion, format: SubtitleFormat) -> AppResult<Self> {
        let subtitles = match format {
            SubtitleFormat::Json => native_json::to_value(version.subtitle_set()),
            other => Value::String(other.serialize(version.subtitle_set())?),
        };
        Ok(Self {
            visibility: version.effective_visibility(),
            video_id: version.video_id,
            language_code: version.language_code,
            version_number: version.version_number,
            author_id: version.author_id,
            title: version.title,
            description: version.description,
            metadata: version.metadata.0,
            subtitle_count: version.subtitle_count,
            rollback_of_version_number: version.rollback_of_version_number,
            parents: version.parents.0,
            lineage: version.lineage.0,
            origin: version.origin,
            created_at: version.created_at,
            sub_format: format,
            subtitles,
        })
    }

    /// Metadata only; the payload is omitted.
    fn summary(version: SubtitleVersion) -> AppResult<Self> {
        let mut view = Self::render(version, SubtitleFormat::Json)?;
        view.subtitles = Value::Null;
        Ok(view)
    }
}

fn requested_format(raw: Option<&str>) -> AppResult<Option<SubtitleFormat>> {
    Ok(raw.map(str::parse::<SubtitleFormat>).transpose()?)
}

/// Decode the submitted payload according to its declared format.
fn decode_payload(subtitles: Value, format: Option<SubtitleFormat>) -> AppResult<SubtitleSet> {
    match (format, subtitles) {
        (Some(SubtitleFormat::Json), Value::String(text)) => Ok(native_json::parse(&text)?),
        (Some(SubtitleFormat::Json) | None, value @ Value::Array(_)) => {
            Ok(native_json::from_value(value)?)
        }
        (format, Value::String(text)) => Ok(format.unwrap_or(DEFAULT_FORMAT).parse(&text)?),
        (Some(format), _) => Err(AppError::BadRequest(format!(
            "subtitles must be a string when sub_format is {}",
            format.as_str()
        ))),
        (None, _) => Err(AppError::BadRequest(
            "subtitles must be a string or a list of items".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/videos/{id}/languages/{lc}/subtitles?version=&sub_format=
///
/// Without `version`, returns the newest version the caller may see.
pub async fn get_subtitles(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((id, lc)): Path<(String, String)>,
    Query(query): Query<VersionQuery>,
) -> AppResult<Json<DataResponse<VersionView>>> {
    let format = requested_format(query.sub_format.as_deref())?.unwrap_or(SubtitleFormat::Json);
    let version = state
        .services
        .videos
        .get_subtitles(&id, &lc, query.version, viewer.actor())
        .await?;
    Ok(Json(DataResponse {
        data: VersionView::render(version, format)?,
    }))
}

/// POST /api/v1/videos/{id}/languages/{lc}/subtitles
pub async fn add_subtitles(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<AddSubtitlesRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<VersionView>>)> {
    let format = requested_format(input.sub_format.as_deref())?;
    let subtitles = decode_payload(input.subtitles, format)?;
    let origin = if input.from_editor {
        ORIGIN_EDITOR
    } else {
        ORIGIN_API
    };

    let options = AddSubtitlesOptions {
        title: input.title,
        description: input.description,
        metadata: input.metadata,
        author: user.actor(),
        parents: input.parents,
        complete: input.is_complete,
        action: input.action,
        origin: Some(origin.to_string()),
        ..AddSubtitlesOptions::default()
    };
    let version = state
        .services
        .pipeline
        .add_subtitles(&id, &lc, subtitles, options)
        .await?;

    let view = VersionView::render(version, format.unwrap_or(SubtitleFormat::Json))?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: view })))
}

/// GET /api/v1/videos/{id}/languages/{lc}/subtitles/versions
///
/// Newest first, restricted to what the caller may see.
pub async fn list_versions(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<VersionView>>>> {
    let versions = state
        .services
        .videos
        .list_versions(&id, &lc, viewer.actor())
        .await?;
    let views = versions
        .into_iter()
        .map(VersionView::summary)
        .collect::<AppResult<Vec<_>>>()?;
    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/videos/{id}/languages/{lc}/subtitles/diff?from=&to=
pub async fn diff(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((id, lc)): Path<(String, String)>,
    Query(query): Query<DiffQuery>,
) -> AppResult<Json<DataResponse<SubtitleDiff>>> {
    let diff = state
        .services
        .videos
        .diff_versions(&id, &lc, query.from, query.to, viewer.actor())
        .await?;
    Ok(Json(DataResponse { data: diff }))
}

/// POST /api/v1/videos/{id}/languages/{lc}/subtitles/rollback
pub async fn rollback(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<RollbackRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<VersionView>>)> {
    if input.version < 1 {
        return Err(CoreError::Validation(format!(
            "invalid version number: {}",
            input.version
        ))
        .into());
    }
    let version = state
        .services
        .pipeline
        .rollback_to(&id, &lc, input.version, user.actor())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: VersionView::summary(version)?,
        }),
    ))
}

/// GET /api/v1/videos/{id}/languages/{lc}/subtitles/actions
pub async fn list_actions(
    State(state): State<AppState>,
    viewer: MaybeAuthUser,
    Path((id, lc)): Path<(String, String)>,
) -> AppResult<Json<DataResponse<Vec<WorkflowAction>>>> {
    let actions = state
        .services
        .videos
        .available_actions(&id, &lc, viewer.actor())
        .await?;
    Ok(Json(DataResponse { data: actions }))
}

/// POST /api/v1/videos/{id}/languages/{lc}/subtitles/actions
pub async fn perform_action(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, lc)): Path<(String, String)>,
    Json(input): Json<ActionRequest>,
) -> AppResult<Json<DataResponse<VersionView>>> {
    let version = state
        .services
        .pipeline
        .perform_action(&id, &lc, user.actor(), input.action)
        .await?;
    Ok(Json(DataResponse {
        data: VersionView::summary(version)?,
    }))
}
