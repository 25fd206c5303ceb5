//! Repository for the `subtitle_languages` table.

use sqlx::PgConnection;

use crate::models::language::SubtitleLanguage;

const COLUMNS: &str = "id, video_id, language_code, subtitles_complete, is_forked, \
                       standard_language_code, official_signoff_count, unofficial_signoff_count, \
                       pending_signoff_count, pending_signoff_expired_count, \
                       pending_signoff_unexpired_count, subtitle_count, percent_done, \
                       has_version, had_version, writelock_owner_id, writelock_anonymous, \
                       writelock_session_key, writelock_time, created_at, updated_at";

pub struct SubtitleLanguageRepo;

impl SubtitleLanguageRepo {
    /// Insert a language row. A duplicate `(video_id, language_code)` fails
    /// on `uq_subtitle_languages_video_code`.
    pub async fn create(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
        standard_language_code: Option<&str>,
    ) -> Result<SubtitleLanguage, sqlx::Error> {
        let query = format!(
            "INSERT INTO subtitle_languages (video_id, language_code, standard_language_code) \
             VALUES ($1, $2, $3) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubtitleLanguage>(&query)
            .bind(video_id)
            .bind(language_code)
            .bind(standard_language_code)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
    ) -> Result<Option<SubtitleLanguage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_languages WHERE video_id = $1 AND language_code = $2"
        );
        sqlx::query_as::<_, SubtitleLanguage>(&query)
            .bind(video_id)
            .bind(language_code)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Same as [`find`](Self::find) but takes the row lock every language
    /// write serialises on.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        video_id: &str,
        language_code: &str,
    ) -> Result<Option<SubtitleLanguage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_languages \
             WHERE video_id = $1 AND language_code = $2 FOR UPDATE"
        );
        sqlx::query_as::<_, SubtitleLanguage>(&query)
            .bind(video_id)
            .bind(language_code)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn list_for_video(
        conn: &mut PgConnection,
        video_id: &str,
    ) -> Result<Vec<SubtitleLanguage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM subtitle_languages WHERE video_id = $1 ORDER BY language_code"
        );
        sqlx::query_as::<_, SubtitleLanguage>(&query)
            .bind(video_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Persist every mutable column of `language`.
    pub async fn save(
        conn: &mut PgConnection,
        language: &SubtitleLanguage,
    ) -> Result<SubtitleLanguage, sqlx::Error> {
        let query = format!(
            "UPDATE subtitle_languages SET \
                subtitles_complete = $2, is_forked = $3, standard_language_code = $4, \
                official_signoff_count = $5, unofficial_signoff_count = $6, \
                pending_signoff_count = $7, pending_signoff_expired_count = $8, \
                pending_signoff_unexpired_count = $9, subtitle_count = $10, percent_done = $11, \
                has_version = $12, had_version = $13, writelock_owner_id = $14, \
                writelock_anonymous = $15, writelock_session_key = $16, writelock_time = $17, \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SubtitleLanguage>(&query)
            .bind(language.id)
            .bind(language.subtitles_complete)
            .bind(language.is_forked)
            .bind(&language.standard_language_code)
            .bind(language.official_signoff_count)
            .bind(language.unofficial_signoff_count)
            .bind(language.pending_signoff_count)
            .bind(language.pending_signoff_expired_count)
            .bind(language.pending_signoff_unexpired_count)
            .bind(language.subtitle_count)
            .bind(language.percent_done)
            .bind(language.has_version)
            .bind(language.had_version)
            .bind(language.writelock_owner_id)
            .bind(language.writelock_anonymous)
            .bind(&language.writelock_session_key)
            .bind(language.writelock_time)
            .fetch_one(&mut *conn)
            .await
    }
}
