//! Subtitle version model.

use serde::Serialize;
use sqlx::types::Json;
use sqlx::FromRow;
use subhub_core::lineage::{Lineage, ParentLineage};
use subhub_core::subtitles::SubtitleSet;
use subhub_core::types::{DbId, Timestamp, VideoId};
use subhub_core::version_graph::{ParentRef, ParentSpec};
use subhub_core::visibility::{VersionVisibility, Visibility};

/// A row from the `subtitle_versions` table.
///
/// Only `visibility` and `visibility_override` change after insert.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubtitleVersion {
    pub id: DbId,
    pub video_id: VideoId,
    pub subtitle_language_id: DbId,
    pub language_code: String,
    pub version_number: i32,
    pub author_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub metadata: Json<serde_json::Value>,
    pub subtitles: Json<SubtitleSet>,
    pub subtitle_count: i32,
    pub visibility: String,
    pub visibility_override: Option<String>,
    pub rollback_of_version_number: Option<i32>,
    pub parents: Json<Vec<ParentRef>>,
    pub lineage: Json<Lineage>,
    pub origin: String,
    pub created_at: Timestamp,
}

impl SubtitleVersion {
    pub fn parent_ref(&self) -> ParentRef {
        ParentRef::new(self.language_code.clone(), self.version_number)
    }

    pub fn parent_lineage(&self) -> ParentLineage<'_> {
        ParentLineage {
            language_code: &self.language_code,
            version_number: self.version_number,
            lineage: &self.lineage.0,
        }
    }

    pub fn subtitle_set(&self) -> &SubtitleSet {
        &self.subtitles.0
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.0.subtitle_count() == 0
    }
}

impl VersionVisibility for SubtitleVersion {
    fn version_number(&self) -> i32 {
        self.version_number
    }

    fn visibility(&self) -> Visibility {
        Visibility::from_db(&self.visibility)
    }

    fn visibility_override(&self) -> Option<Visibility> {
        self.visibility_override.as_deref().map(Visibility::from_db)
    }
}

impl From<&SubtitleVersion> for ParentSpec {
    fn from(v: &SubtitleVersion) -> Self {
        ParentSpec::Version {
            id: v.id,
            video_id: v.video_id.clone(),
            language_code: v.language_code.clone(),
            version_number: v.version_number,
        }
    }
}

/// Insert payload for a version. The pipeline computes every field.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub video_id: VideoId,
    pub subtitle_language_id: DbId,
    pub language_code: String,
    pub version_number: i32,
    pub author_id: Option<DbId>,
    pub title: String,
    pub description: String,
    pub metadata: serde_json::Value,
    pub subtitles: SubtitleSet,
    pub visibility: Visibility,
    pub visibility_override: Option<Visibility>,
    pub rollback_of_version_number: Option<i32>,
    pub parents: Vec<ParentRef>,
    pub lineage: Lineage,
    pub origin: String,
}
