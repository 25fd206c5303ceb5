//! Repositories for `team_members` and `membership_narrowings`.

use sqlx::PgConnection;
use subhub_core::permissions::Narrowing;
use subhub_core::roles::TeamRole;
use subhub_core::types::DbId;

use crate::models::team::{MembershipNarrowing, TeamMember};

const MEMBER_COLUMNS: &str = "id, team_id, user_id, role, created_at";

pub struct TeamMemberRepo;

impl TeamMemberRepo {
    pub async fn create(
        conn: &mut PgConnection,
        team_id: DbId,
        user_id: DbId,
        role: TeamRole,
    ) -> Result<TeamMember, sqlx::Error> {
        let query = format!(
            "INSERT INTO team_members (team_id, user_id, role) VALUES ($1, $2, $3) \
             RETURNING {MEMBER_COLUMNS}"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .bind(user_id)
            .bind(role.as_str())
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find(
        conn: &mut PgConnection,
        team_id: DbId,
        user_id: DbId,
    ) -> Result<Option<TeamMember>, sqlx::Error> {
        let query = format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND user_id = $2"
        );
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn list_for_team(
        conn: &mut PgConnection,
        team_id: DbId,
    ) -> Result<Vec<TeamMember>, sqlx::Error> {
        let query = format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 ORDER BY id");
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(team_id)
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn update_role(
        conn: &mut PgConnection,
        id: DbId,
        role: TeamRole,
    ) -> Result<Option<TeamMember>, sqlx::Error> {
        let query = format!("UPDATE team_members SET role = $2 WHERE id = $1 RETURNING {MEMBER_COLUMNS}");
        sqlx::query_as::<_, TeamMember>(&query)
            .bind(id)
            .bind(role.as_str())
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn delete(conn: &mut PgConnection, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

const NARROWING_COLUMNS: &str = "id, member_id, project_id, language_code, added_by_id, created_at";

pub struct NarrowingRepo;

impl NarrowingRepo {
    pub async fn create(
        conn: &mut PgConnection,
        member_id: DbId,
        narrowing: &Narrowing,
        added_by_id: Option<DbId>,
    ) -> Result<MembershipNarrowing, sqlx::Error> {
        let (project_id, language_code) = match narrowing {
            Narrowing::Project(p) => (Some(*p), None),
            Narrowing::Language(lc) => (None, Some(lc.as_str())),
        };
        let query = format!(
            "INSERT INTO membership_narrowings (member_id, project_id, language_code, added_by_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {NARROWING_COLUMNS}"
        );
        sqlx::query_as::<_, MembershipNarrowing>(&query)
            .bind(member_id)
            .bind(project_id)
            .bind(language_code)
            .bind(added_by_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn list_for_member(
        conn: &mut PgConnection,
        member_id: DbId,
    ) -> Result<Vec<MembershipNarrowing>, sqlx::Error> {
        let query = format!(
            "SELECT {NARROWING_COLUMNS} FROM membership_narrowings WHERE member_id = $1 ORDER BY id"
        );
        sqlx::query_as::<_, MembershipNarrowing>(&query)
            .bind(member_id)
            .fetch_all(&mut *conn)
            .await
    }
}
