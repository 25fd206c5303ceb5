//! Repositories for `teams`, `projects` and `team_videos`.

use sqlx::PgConnection;
use subhub_core::types::DbId;

use crate::models::team::{NewProject, NewTeam, Project, Team, TeamVideo};

// ---------------------------------------------------------------------------
// TeamRepo
// ---------------------------------------------------------------------------

const TEAM_COLUMNS: &str = "id, slug, name, description, workflow_enabled, task_expiration_days, \
                            max_tasks_per_member, subtitle_policy, translate_policy, \
                            sync_disabled, created_at, updated_at";

pub struct TeamRepo;

impl TeamRepo {
    pub async fn create(conn: &mut PgConnection, input: &NewTeam) -> Result<Team, sqlx::Error> {
        let query = format!(
            "INSERT INTO teams \
                (slug, name, description, workflow_enabled, task_expiration_days, \
                 max_tasks_per_member, subtitle_policy, translate_policy, sync_disabled) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {TEAM_COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(&input.slug)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.workflow_enabled)
            .bind(input.task_expiration_days)
            .bind(input.max_tasks_per_member)
            .bind(&input.subtitle_policy)
            .bind(&input.translate_policy)
            .bind(input.sync_disabled)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_slug(conn: &mut PgConnection, slug: &str) -> Result<Option<Team>, sqlx::Error> {
        let query = format!("SELECT {TEAM_COLUMNS} FROM teams WHERE slug = $1");
        sqlx::query_as::<_, Team>(&query)
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn save(conn: &mut PgConnection, team: &Team) -> Result<Team, sqlx::Error> {
        let query = format!(
            "UPDATE teams SET \
                slug = $2, name = $3, description = $4, workflow_enabled = $5, \
                task_expiration_days = $6, max_tasks_per_member = $7, subtitle_policy = $8, \
                translate_policy = $9, sync_disabled = $10, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {TEAM_COLUMNS}"
        );
        sqlx::query_as::<_, Team>(&query)
            .bind(team.id)
            .bind(&team.slug)
            .bind(&team.name)
            .bind(&team.description)
            .bind(team.workflow_enabled)
            .bind(team.task_expiration_days)
            .bind(team.max_tasks_per_member)
            .bind(&team.subtitle_policy)
            .bind(&team.translate_policy)
            .bind(team.sync_disabled)
            .fetch_one(&mut *conn)
            .await
    }
}

// ---------------------------------------------------------------------------
// ProjectRepo
// ---------------------------------------------------------------------------

const PROJECT_COLUMNS: &str = "id, team_id, name, slug, description, guidelines, \
                               workflow_enabled, created_at, updated_at";

pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn create(conn: &mut PgConnection, input: &NewProject) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (team_id, name, slug, description, guidelines, workflow_enabled) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PROJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(input.team_id)
            .bind(&input.name)
            .bind(&input.slug)
            .bind(&input.description)
            .bind(&input.guidelines)
            .bind(input.workflow_enabled)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_slug(
        conn: &mut PgConnection,
        team_id: DbId,
        slug: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE team_id = $1 AND slug = $2");
        sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .bind(slug)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn list_for_team(conn: &mut PgConnection, team_id: DbId) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE team_id = $1 ORDER BY name");
        sqlx::query_as::<_, Project>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn save(conn: &mut PgConnection, project: &Project) -> Result<Project, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET name = $2, slug = $3, description = $4, guidelines = $5, \
                workflow_enabled = $6, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PROJECT_COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.slug)
            .bind(&project.description)
            .bind(&project.guidelines)
            .bind(project.workflow_enabled)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ---------------------------------------------------------------------------
// TeamVideoRepo
// ---------------------------------------------------------------------------

const TEAM_VIDEO_COLUMNS: &str = "id, team_id, video_id, project_id, added_by_id, created_at";

pub struct TeamVideoRepo;

impl TeamVideoRepo {
    pub async fn create(
        conn: &mut PgConnection,
        team_id: DbId,
        video_id: &str,
        project_id: Option<DbId>,
        added_by_id: Option<DbId>,
    ) -> Result<TeamVideo, sqlx::Error> {
        let query = format!(
            "INSERT INTO team_videos (team_id, video_id, project_id, added_by_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {TEAM_VIDEO_COLUMNS}"
        );
        sqlx::query_as::<_, TeamVideo>(&query)
            .bind(team_id)
            .bind(video_id)
            .bind(project_id)
            .bind(added_by_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<TeamVideo>, sqlx::Error> {
        let query = format!("SELECT {TEAM_VIDEO_COLUMNS} FROM team_videos WHERE id = $1");
        sqlx::query_as::<_, TeamVideo>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_video(
        conn: &mut PgConnection,
        video_id: &str,
    ) -> Result<Option<TeamVideo>, sqlx::Error> {
        let query = format!("SELECT {TEAM_VIDEO_COLUMNS} FROM team_videos WHERE video_id = $1");
        sqlx::query_as::<_, TeamVideo>(&query)
            .bind(video_id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn list_for_team(
        conn: &mut PgConnection,
        team_id: DbId,
    ) -> Result<Vec<TeamVideo>, sqlx::Error> {
        let query = format!(
            "SELECT {TEAM_VIDEO_COLUMNS} FROM team_videos WHERE team_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, TeamVideo>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn set_project(
        conn: &mut PgConnection,
        id: DbId,
        project_id: Option<DbId>,
    ) -> Result<Option<TeamVideo>, sqlx::Error> {
        let query = format!(
            "UPDATE team_videos SET project_id = $2 WHERE id = $1 RETURNING {TEAM_VIDEO_COLUMNS}"
        );
        sqlx::query_as::<_, TeamVideo>(&query)
            .bind(id)
            .bind(project_id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_videos WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
