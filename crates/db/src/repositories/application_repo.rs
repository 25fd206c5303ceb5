//! Repositories for team `applications` and `invitations`.

use sqlx::PgConnection;
use subhub_core::team::{ApplicationStatus, InvitationStatus};
use subhub_core::types::DbId;

use crate::models::team::{Application, Invitation, NewInvitation};

// ---------------------------------------------------------------------------
// ApplicationRepo
// ---------------------------------------------------------------------------

const APPLICATION_COLUMNS: &str = "id, team_id, user_id, note, status, created_at, updated_at";

pub struct ApplicationRepo;

impl ApplicationRepo {
    pub async fn create(
        conn: &mut PgConnection,
        team_id: DbId,
        user_id: DbId,
        note: &str,
    ) -> Result<Application, sqlx::Error> {
        let query = format!(
            "INSERT INTO applications (team_id, user_id, note) VALUES ($1, $2, $3) \
             RETURNING {APPLICATION_COLUMNS}"
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(team_id)
            .bind(user_id)
            .bind(note)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Application>, sqlx::Error> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1");
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn list_for_team(
        conn: &mut PgConnection,
        team_id: DbId,
    ) -> Result<Vec<Application>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE team_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status: ApplicationStatus,
    ) -> Result<Option<Application>, sqlx::Error> {
        let query = format!(
            "UPDATE applications SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {APPLICATION_COLUMNS}"
        );
        sqlx::query_as::<_, Application>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&mut *conn)
            .await
    }
}

// ---------------------------------------------------------------------------
// InvitationRepo
// ---------------------------------------------------------------------------

const INVITATION_COLUMNS: &str =
    "id, team_id, user_id, author_id, role, note, status, created_at, updated_at";

pub struct InvitationRepo;

impl InvitationRepo {
    pub async fn create(conn: &mut PgConnection, input: &NewInvitation) -> Result<Invitation, sqlx::Error> {
        let query = format!(
            "INSERT INTO invitations (team_id, user_id, author_id, role, note) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {INVITATION_COLUMNS}"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(input.team_id)
            .bind(input.user_id)
            .bind(input.author_id)
            .bind(input.role.as_str())
            .bind(&input.note)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: DbId) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!("SELECT {INVITATION_COLUMNS} FROM invitations WHERE id = $1");
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: DbId,
        status: InvitationStatus,
    ) -> Result<Option<Invitation>, sqlx::Error> {
        let query = format!(
            "UPDATE invitations SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {INVITATION_COLUMNS}"
        );
        sqlx::query_as::<_, Invitation>(&query)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&mut *conn)
            .await
    }
}
