//! Video and video URL models.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use subhub_core::types::{DbId, Timestamp, VideoId};
use subhub_core::writelock::WriteLockState;

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: VideoId,
    pub primary_audio_language_code: Option<String>,
    pub title: String,
    pub description: String,
    pub duration_ms: Option<i64>,
    pub thumbnail: String,
    pub metadata: Json<serde_json::Value>,
    pub languages_count: i32,
    pub complete_date: Option<Timestamp>,
    #[serde(skip)]
    pub writelock_owner_id: Option<DbId>,
    #[serde(skip)]
    pub writelock_anonymous: bool,
    #[serde(skip)]
    pub writelock_session_key: Option<String>,
    #[serde(skip)]
    pub writelock_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    pub fn is_complete(&self) -> bool {
        self.complete_date.is_some()
    }

    pub fn writelock(&self) -> WriteLockState {
        WriteLockState::from_columns(
            self.writelock_owner_id,
            self.writelock_anonymous,
            self.writelock_session_key.clone(),
            self.writelock_time,
        )
    }

    pub fn set_writelock(&mut self, state: WriteLockState) {
        let (owner, anonymous, key, time) = state.into_columns();
        self.writelock_owner_id = owner;
        self.writelock_anonymous = anonymous;
        self.writelock_session_key = key;
        self.writelock_time = time;
    }
}

/// Insert payload for a video.
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: VideoId,
    pub primary_audio_language_code: Option<String>,
    pub title: String,
    pub description: String,
    pub duration_ms: Option<i64>,
    pub thumbnail: String,
    pub metadata: serde_json::Value,
}

/// Patch for the editable video attributes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVideo {
    pub primary_audio_language_code: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_ms: Option<i64>,
    pub thumbnail: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl UpdateVideo {
    pub fn apply(self, video: &mut Video) {
        if let Some(lc) = self.primary_audio_language_code {
            video.primary_audio_language_code = Some(lc).filter(|l| !l.is_empty());
        }
        if let Some(title) = self.title {
            video.title = title;
        }
        if let Some(description) = self.description {
            video.description = description;
        }
        if self.duration_ms.is_some() {
            video.duration_ms = self.duration_ms;
        }
        if let Some(thumbnail) = self.thumbnail {
            video.thumbnail = thumbnail;
        }
        if let Some(metadata) = self.metadata {
            video.metadata = Json(metadata);
        }
    }
}

// ---------------------------------------------------------------------------
// VideoUrl
// ---------------------------------------------------------------------------

/// A row from the `video_urls` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VideoUrl {
    pub id: DbId,
    pub video_id: VideoId,
    pub url: String,
    #[serde(rename = "primary")]
    pub is_primary: bool,
    pub original: bool,
    pub added_by_id: Option<DbId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct NewVideoUrl {
    pub video_id: VideoId,
    pub url: String,
    pub is_primary: bool,
    pub original: bool,
    pub added_by_id: Option<DbId>,
}
