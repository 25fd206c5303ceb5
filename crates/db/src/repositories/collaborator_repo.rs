use sqlx::PgConnection;
use subhub_core::types::DbId;

use crate::models::collaborator::{Collaborator, SaveCollaborator};

const COLUMNS: &str = "id, subtitle_language_id, user_id, signoff, signoff_is_official, expired, \
                       expiration_start, created_at, updated_at";

pub struct CollaboratorRepo;

impl CollaboratorRepo {
    /// Insert or update the `(language, user)` row.
    pub async fn upsert(
        conn: &mut PgConnection,
        input: &SaveCollaborator,
    ) -> Result<Collaborator, sqlx::Error> {
        let query = format!(
            "INSERT INTO collaborators \
                (subtitle_language_id, user_id, signoff, signoff_is_official, expired, expiration_start) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (subtitle_language_id, user_id) DO UPDATE SET \
                signoff = EXCLUDED.signoff, \
                signoff_is_official = EXCLUDED.signoff_is_official, \
                expired = EXCLUDED.expired, \
                expiration_start = EXCLUDED.expiration_start, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Collaborator>(&query)
            .bind(input.subtitle_language_id)
            .bind(input.user_id)
            .bind(input.signoff)
            .bind(input.signoff_is_official)
            .bind(input.expired)
            .bind(input.expiration_start)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn list_for_language(
        conn: &mut PgConnection,
        subtitle_language_id: DbId,
    ) -> Result<Vec<Collaborator>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM collaborators WHERE subtitle_language_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, Collaborator>(&query)
            .bind(subtitle_language_id)
            .fetch_all(&mut *conn)
            .await
    }
}
