//! Repository for the `tasks` table.

use sqlx::PgConnection;
use subhub_core::tasks::{TaskFilter, TaskOrder};
use subhub_core::types::DbId;

use crate::models::task::{NewTask, Task};

const COLUMNS: &str = "id, team_id, team_video_id, video_id, task_type, language_code, \
                       assignee_id, subtitle_version_id, approved, priority, body, completed_at, \
                       expiration_date, deleted, created_at, updated_at";

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create(conn: &mut PgConnection, input: &NewTask) -> Result<Task, sqlx::Error> {
        let query = format!(
            "INSERT INTO tasks \
                (team_id, team_video_id, video_id, task_type, language_code, assignee_id, \
                 subtitle_version_id, priority, expiration_date) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(input.team_id)
            .bind(input.team_video_id)
            .bind(&input.video_id)
            .bind(input.task_type.code())
            .bind(&input.language_code)
            .bind(input.assignee_id)
            .bind(input.subtitle_version_id)
            .bind(input.priority)
            .bind(input.expiration_date)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Persist every mutable column of `task`.
    pub async fn save(conn: &mut PgConnection, task: &Task) -> Result<Task, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET \
                language_code = $2, assignee_id = $3, subtitle_version_id = $4, approved = $5, \
                priority = $6, body = $7, completed_at = $8, expiration_date = $9, \
                deleted = $10, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(&task.language_code)
            .bind(task.assignee_id)
            .bind(task.subtitle_version_id)
            .bind(&task.approved)
            .bind(task.priority)
            .bind(&task.body)
            .bind(task.completed_at)
            .bind(task.expiration_date)
            .bind(task.deleted)
            .fetch_one(&mut *conn)
            .await
    }

    /// Tasks of one team video, including completed ones; deleted rows skipped.
    pub async fn list_for_team_video(
        conn: &mut PgConnection,
        team_video_id: DbId,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM tasks WHERE team_video_id = $1 AND NOT deleted ORDER BY id"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(team_video_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn count_open_assigned(
        conn: &mut PgConnection,
        team_id: DbId,
        user_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM tasks \
             WHERE team_id = $1 AND assignee_id = $2 AND completed_at IS NULL AND NOT deleted",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await
    }

    /// Filtered listing for the team task endpoint.
    pub async fn list(
        conn: &mut PgConnection,
        team_id: DbId,
        filter: &TaskFilter,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let mut conditions: Vec<String> = vec!["team_id = $1".to_string(), "NOT deleted".to_string()];
        let mut bind_idx: u32 = 2;

        if filter.assignee_id.is_some() {
            conditions.push(format!("assignee_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.priority.is_some() {
            conditions.push(format!("priority = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.task_type.is_some() {
            conditions.push(format!("task_type = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.language_code.is_some() {
            conditions.push(format!("language_code = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.video_id.is_some() {
            conditions.push(format!("video_id = ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.completed_before.is_some() {
            conditions.push(format!("completed_at < ${bind_idx}"));
            bind_idx += 1;
        }
        if filter.completed_after.is_some() {
            conditions.push(format!("completed_at > ${bind_idx}"));
        }
        match filter.completed {
            Some(true) => conditions.push("completed_at IS NOT NULL".to_string()),
            Some(false) => conditions.push("completed_at IS NULL".to_string()),
            None => {}
        }
        match filter.open {
            Some(true) => conditions.push("completed_at IS NULL".to_string()),
            Some(false) => conditions.push("completed_at IS NOT NULL".to_string()),
            None => {}
        }

        let order = filter.order_by.unwrap_or(TaskOrder::Created).sql();
        let query = format!(
            "SELECT {COLUMNS} FROM tasks WHERE {} ORDER BY {order}",
            conditions.join(" AND ")
        );

        let mut q = sqlx::query_as::<_, Task>(&query).bind(team_id);
        if let Some(assignee) = filter.assignee_id {
            q = q.bind(assignee);
        }
        if let Some(priority) = filter.priority {
            q = q.bind(priority);
        }
        if let Some(task_type) = filter.task_type {
            q = q.bind(task_type.code());
        }
        if let Some(lc) = &filter.language_code {
            q = q.bind(lc);
        }
        if let Some(video_id) = &filter.video_id {
            q = q.bind(video_id);
        }
        if let Some(before) = filter.completed_before {
            q = q.bind(before);
        }
        if let Some(after) = filter.completed_after {
            q = q.bind(after);
        }
        q.fetch_all(&mut *conn).await
    }
}
