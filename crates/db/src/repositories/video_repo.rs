//! Repositories for the `videos` and `video_urls` tables.

use sqlx::types::Json;
use sqlx::PgConnection;
use subhub_core::types::DbId;

use crate::models::video::{NewVideo, NewVideoUrl, Video, VideoUrl};

// ---------------------------------------------------------------------------
// VideoRepo
// ---------------------------------------------------------------------------

/// Column list for `videos` queries.
const VIDEO_COLUMNS: &str = "id, primary_audio_language_code, title, description, duration_ms, \
                             thumbnail, metadata, languages_count, complete_date, \
                             writelock_owner_id, writelock_anonymous, writelock_session_key, \
                             writelock_time, created_at, updated_at";

pub struct VideoRepo;

impl VideoRepo {
    pub async fn create(conn: &mut PgConnection, input: &NewVideo) -> Result<Video, sqlx::Error> {
        let query = format!(
            "INSERT INTO videos \
                (id, primary_audio_language_code, title, description, duration_ms, thumbnail, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {VIDEO_COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&input.id)
            .bind(&input.primary_audio_language_code)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.duration_ms)
            .bind(&input.thumbnail)
            .bind(Json(&input.metadata))
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: &str) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Load and row-lock a video for the rest of the transaction.
    pub async fn find_by_id_for_update(
        conn: &mut PgConnection,
        id: &str,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = $1 FOR UPDATE");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Persist every mutable column of `video`.
    pub async fn save(conn: &mut PgConnection, video: &Video) -> Result<Video, sqlx::Error> {
        let query = format!(
            "UPDATE videos SET \
                primary_audio_language_code = $2, title = $3, description = $4, \
                duration_ms = $5, thumbnail = $6, metadata = $7, languages_count = $8, \
                complete_date = $9, writelock_owner_id = $10, writelock_anonymous = $11, \
                writelock_session_key = $12, writelock_time = $13, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {VIDEO_COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(&video.id)
            .bind(&video.primary_audio_language_code)
            .bind(&video.title)
            .bind(&video.description)
            .bind(video.duration_ms)
            .bind(&video.thumbnail)
            .bind(&video.metadata)
            .bind(video.languages_count)
            .bind(video.complete_date)
            .bind(video.writelock_owner_id)
            .bind(video.writelock_anonymous)
            .bind(&video.writelock_session_key)
            .bind(video.writelock_time)
            .fetch_one(&mut *conn)
            .await
    }
}

// ---------------------------------------------------------------------------
// VideoUrlRepo
// ---------------------------------------------------------------------------

const URL_COLUMNS: &str = "id, video_id, url, is_primary, original, added_by_id, created_at";

pub struct VideoUrlRepo;

impl VideoUrlRepo {
    /// Primary first, then by insertion order.
    pub async fn list_for_video(
        conn: &mut PgConnection,
        video_id: &str,
    ) -> Result<Vec<VideoUrl>, sqlx::Error> {
        let query = format!(
            "SELECT {URL_COLUMNS} FROM video_urls WHERE video_id = $1 \
             ORDER BY is_primary DESC, id ASC"
        );
        sqlx::query_as::<_, VideoUrl>(&query)
            .bind(video_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<VideoUrl>, sqlx::Error> {
        let query = format!("SELECT {URL_COLUMNS} FROM video_urls WHERE id = $1");
        sqlx::query_as::<_, VideoUrl>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_url(conn: &mut PgConnection, url: &str) -> Result<Option<VideoUrl>, sqlx::Error> {
        let query = format!("SELECT {URL_COLUMNS} FROM video_urls WHERE url = $1");
        sqlx::query_as::<_, VideoUrl>(&query)
            .bind(url)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Insert a URL. A primary URL demotes the video's current primary first.
    pub async fn create(conn: &mut PgConnection, input: &NewVideoUrl) -> Result<VideoUrl, sqlx::Error> {
        if input.is_primary {
            Self::demote_all(conn, &input.video_id).await?;
        }
        let query = format!(
            "INSERT INTO video_urls (video_id, url, is_primary, original, added_by_id) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {URL_COLUMNS}"
        );
        sqlx::query_as::<_, VideoUrl>(&query)
            .bind(&input.video_id)
            .bind(&input.url)
            .bind(input.is_primary)
            .bind(input.original)
            .bind(input.added_by_id)
            .fetch_one(&mut *conn)
            .await
    }

    /// Make `url_id` the only primary URL of `video_id`.
    pub async fn set_primary(
        conn: &mut PgConnection,
        video_id: &str,
        url_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        // Two statements: the partial unique index is checked per row.
        Self::demote_all(conn, video_id).await?;
        let result = sqlx::query(
            "UPDATE video_urls SET is_primary = TRUE WHERE id = $1 AND video_id = $2",
        )
        .bind(url_id)
        .bind(video_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM video_urls WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn demote_all(conn: &mut PgConnection, video_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE video_urls SET is_primary = FALSE WHERE video_id = $1 AND is_primary")
            .bind(video_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
