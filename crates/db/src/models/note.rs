use serde::Serialize;
use sqlx::FromRow;
use subhub_core::types::{DbId, Timestamp, VideoId};

/// A row from the `subtitle_notes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubtitleNote {
    pub id: DbId,
    pub video_id: VideoId,
    pub language_code: String,
    pub user_id: Option<DbId>,
    pub body: String,
    pub created_at: Timestamp,
}
