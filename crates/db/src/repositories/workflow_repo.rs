use sqlx::PgConnection;
use subhub_core::types::DbId;

use crate::models::team::{NewWorkflow, Workflow};

const COLUMNS: &str = "id, team_id, project_id, team_video_id, autocreate_subtitle, \
                       autocreate_translate, review_allowed, approve_allowed, created_at, updated_at";

/// Workflow records at team, project and team-video level.
pub struct WorkflowRepo;

impl WorkflowRepo {
    pub async fn list_for_team(
        conn: &mut PgConnection,
        team_id: DbId,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows WHERE team_id = $1 ORDER BY id");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Insert or replace the record for the input's level.
    pub async fn upsert(conn: &mut PgConnection, input: &NewWorkflow) -> Result<Workflow, sqlx::Error> {
        let query = format!(
            "INSERT INTO workflows \
                (team_id, project_id, team_video_id, autocreate_subtitle, autocreate_translate, \
                 review_allowed, approve_allowed) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (team_id, (COALESCE(project_id, 0)), (COALESCE(team_video_id, 0))) \
             DO UPDATE SET \
                autocreate_subtitle = EXCLUDED.autocreate_subtitle, \
                autocreate_translate = EXCLUDED.autocreate_translate, \
                review_allowed = EXCLUDED.review_allowed, \
                approve_allowed = EXCLUDED.approve_allowed, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Workflow>(&query)
            .bind(input.team_id)
            .bind(input.project_id)
            .bind(input.team_video_id)
            .bind(input.settings.autocreate_subtitle)
            .bind(input.settings.autocreate_translate)
            .bind(input.settings.review_allowed.as_str())
            .bind(input.settings.approve_allowed.as_str())
            .fetch_one(&mut *conn)
            .await
    }
}
