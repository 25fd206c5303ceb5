use sqlx::PgConnection;
use subhub_core::types::DbId;

use crate::models::note::SubtitleNote;

const COLUMNS: &str = "id, video_id, language_code, user_id, body, created_at";

pub struct NoteRepo;

impl NoteRepo {
    pub async fn create(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        body: &str,
    ) -> Result<SubtitleNote, sqlx::Error> {
        let query = format!(
            "INSERT INTO subtitle_notes (video_id, language_code, user_id, body) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubtitleNote>(&query)
            .bind(video_id)
            .bind(language_code)
            .bind(user_id)
            .bind(body)
            .fetch_one(&mut *conn)
            .await
    }

    /// Oldest first.
    pub async fn list_for_language(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
    ) -> Result<Vec<SubtitleNote>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_notes WHERE video_id = $1 AND language_code = $2 \
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, SubtitleNote>(&query)
            .bind(video_id)
            .bind(language_code)
            .fetch_all(&mut *conn)
            .await
    }
}
