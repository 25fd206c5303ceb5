//! Repository for the append-only `subtitle_versions` table.

use sqlx::types::Json;
use sqlx::PgConnection;
use subhub_core::types::DbId;
use subhub_core::visibility::Visibility;

use crate::models::version::{NewVersion, SubtitleVersion};

const COLUMNS: &str = "id, video_id, subtitle_language_id, language_code, version_number, \
                       author_id, title, description, metadata, subtitles, subtitle_count, \
                       visibility, visibility_override, rollback_of_version_number, parents, \
                       lineage, origin, created_at";

pub struct SubtitleVersionRepo;

impl SubtitleVersionRepo {
    /// Insert a version. A duplicate number fails on
    /// `uq_subtitle_versions_language_number`.
    pub async fn create(
        conn: &mut PgConnection,
        input: &NewVersion,
    ) -> Result<SubtitleVersion, sqlx::Error> {
        let query = format!(
            "INSERT INTO subtitle_versions \
                (video_id, subtitle_language_id, language_code, version_number, author_id, \
                 title, description, metadata, subtitles, subtitle_count, visibility, \
                 visibility_override, rollback_of_version_number, parents, lineage, origin) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(&input.video_id)
            .bind(input.subtitle_language_id)
            .bind(&input.language_code)
            .bind(input.version_number)
            .bind(input.author_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(Json(&input.metadata))
            .bind(Json(&input.subtitles))
            .bind(input.subtitles.subtitle_count() as i32)
            .bind(input.visibility.as_str())
            .bind(input.visibility_override.map(Visibility::as_str))
            .bind(input.rollback_of_version_number)
            .bind(Json(&input.parents))
            .bind(Json(&input.lineage))
            .bind(&input.origin)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<SubtitleVersion>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM subtitle_versions WHERE id = $1");
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_number(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
        version_number: i32,
    ) -> Result<Option<SubtitleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_versions \
             WHERE video_id = $1 AND language_code = $2 AND version_number = $3"
        );
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(video_id)
            .bind(language_code)
            .bind(version_number)
            .fetch_optional(&mut *conn)
            .await
    }

    /// History of one language, oldest first.
    pub async fn list_for_language(
        conn: &mut PgConnection,
        subtitle_language_id: DbId,
    ) -> Result<Vec<SubtitleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_versions \
             WHERE subtitle_language_id = $1 ORDER BY version_number ASC"
        );
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(subtitle_language_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Every version of a video, grouped by language.
    pub async fn list_for_video(
        conn: &mut PgConnection,
        video_id: &str,
    ) -> Result<Vec<SubtitleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_versions \
             WHERE video_id = $1 ORDER BY language_code ASC, version_number ASC"
        );
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(video_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// The only mutation a version ever sees.
    pub async fn update_visibility(
        conn: &mut PgConnection,
        id: DbId,
        visibility: Visibility,
        visibility_override: Option<Visibility>,
    ) -> Result<Option<SubtitleVersion>, sqlx::Error> {
        let query = format!(
            "UPDATE subtitle_versions SET visibility = $2, visibility_override = $3 \
             WHERE id = $1 RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubtitleVersion>(&query)
            .bind(id)
            .bind(visibility.as_str())
            .bind(visibility_override.map(Visibility::as_str))
            .fetch_optional(&mut *conn)
            .await
    }
}
