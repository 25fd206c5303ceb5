//! Subtitle language model.

use serde::Serialize;
use sqlx::FromRow;
use subhub_core::metadata::SignoffCounts;
use subhub_core::types::{DbId, Timestamp, VideoId};
use subhub_core::writelock::WriteLockState;

/// A row from the `subtitle_languages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubtitleLanguage {
    pub id: DbId,
    pub video_id: VideoId,
    pub language_code: String,
    pub subtitles_complete: bool,
    pub is_forked: bool,
    pub standard_language_code: Option<String>,
    pub official_signoff_count: i32,
    pub unofficial_signoff_count: i32,
    pub pending_signoff_count: i32,
    pub pending_signoff_expired_count: i32,
    pub pending_signoff_unexpired_count: i32,
    pub subtitle_count: i32,
    pub percent_done: i32,
    pub has_version: bool,
    pub had_version: bool,
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

impl SubtitleLanguage {
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

    pub fn set_signoff_counts(&mut self, counts: SignoffCounts) {
        self.official_signoff_count = counts.official;
        self.unofficial_signoff_count = counts.unofficial;
        self.pending_signoff_count = counts.pending;
        self.pending_signoff_expired_count = counts.pending_expired;
        self.pending_signoff_unexpired_count = counts.pending_unexpired;
    }

    /// A translation that still inherits timing from its source.
    pub fn source_language(&self) -> Option<&str> {
        if self.is_forked {
            None
        } else {
            self.standard_language_code.as_deref()
        }
    }
}
