use sqlx::PgConnection;
use subhub_core::language_prefs::LanguagePreference;
use subhub_core::types::DbId;

use crate::models::team::TeamLanguagePreference;

const COLUMNS: &str = "id, team_id, language_code, preferred, allow_reads, allow_writes";

/// Stored per-team language rows; languages without a row use the defaults.
pub struct LanguagePreferenceRepo;

impl LanguagePreferenceRepo {
    pub async fn list_for_team(
        conn: &mut PgConnection,
        team_id: DbId,
    ) -> Result<Vec<TeamLanguagePreference>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM team_language_preferences WHERE team_id = $1 \
             ORDER BY language_code"
        );
        sqlx::query_as::<_, TeamLanguagePreference>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Replace the team's rows with `prefs`.
    pub async fn replace(
        conn: &mut PgConnection,
        team_id: DbId,
        prefs: &[LanguagePreference],
    ) -> Result<Vec<TeamLanguagePreference>, sqlx::Error> {
        sqlx::query("DELETE FROM team_language_preferences WHERE team_id = $1")
            .bind(team_id)
            .execute(&mut *conn)
            .await?;

        for pref in prefs {
            sqlx::query(
                "INSERT INTO team_language_preferences \
                    (team_id, language_code, preferred, allow_reads, allow_writes) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(team_id)
            .bind(&pref.language_code)
            .bind(pref.preferred)
            .bind(pref.allow_reads)
            .bind(pref.allow_writes)
            .execute(&mut *conn)
            .await?;
        }

        Self::list_for_team(conn, team_id).await
    }
}
