//! Transactional storage seam.
//!
//! Services talk to storage only through [`Store::begin`] and the
//! [`StoreTx`] it returns. Every write happens inside one transaction; a
//! dropped transaction is rolled back. [`PgStore`] runs on Postgres and
//! [`MemoryStore`] keeps everything in process for tests and local runs.

mod memory;
mod postgres;

use async_trait::async_trait;
use subhub_core::error::CoreError;
use subhub_core::language_prefs::LanguagePreference;
use subhub_core::permissions::Narrowing;
use subhub_core::roles::TeamRole;
use subhub_core::tasks::TaskFilter;
use subhub_core::team::{ApplicationStatus, InvitationStatus};
use subhub_core::types::DbId;
use subhub_core::visibility::Visibility;

use crate::models::collaborator::{Collaborator, SaveCollaborator};
use crate::models::language::SubtitleLanguage;
use crate::models::note::SubtitleNote;
use crate::models::task::{NewTask, Task};
use crate::models::team::{
    Application, Invitation, MembershipNarrowing, NewInvitation, NewProject, NewTeam,
    NewWorkflow, Project, Team, TeamLanguagePreference, TeamMember, TeamVideo, Workflow,
};
use crate::models::user::User;
use crate::models::version::{NewVersion, SubtitleVersion};
use crate::models::video::{NewVideo, NewVideoUrl, Video, VideoUrl};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// PostgreSQL unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

pub const LANGUAGE_UNIQUE_CONSTRAINT: &str = "uq_subtitle_languages_video_code";
pub const VERSION_UNIQUE_CONSTRAINT: &str = "uq_subtitle_versions_language_number";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// `(video, language_code)` already has a language row.
    #[error("Language already exists: {0}")]
    LanguageExists(String),

    /// Another writer took the same `(language, version_number)`.
    #[error("Version number already taken: {0}")]
    VersionConflict(String),

    /// Any other unique constraint, by name.
    #[error("Duplicate value violates unique constraint: {0}")]
    UniqueViolation(String),

    /// An update targeted a row that does not exist.
    #[error("{0} not found")]
    Missing(&'static str),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                match db_err.constraint() {
                    Some(LANGUAGE_UNIQUE_CONSTRAINT) => {
                        return StoreError::LanguageExists(db_err.message().to_string())
                    }
                    Some(VERSION_UNIQUE_CONSTRAINT) => {
                        return StoreError::VersionConflict(db_err.message().to_string())
                    }
                    Some(other) => return StoreError::UniqueViolation(other.to_string()),
                    None => {}
                }
            }
        }
        StoreError::Database(err)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LanguageExists(msg) => CoreError::LanguageExists(msg),
            StoreError::VersionConflict(msg) => CoreError::Conflict(msg),
            StoreError::UniqueViolation(constraint) => CoreError::Conflict(format!(
                "Duplicate value violates unique constraint: {constraint}"
            )),
            StoreError::Missing(entity) => CoreError::NotFound {
                entity,
                key: String::new(),
            },
            StoreError::Database(e) => CoreError::Internal(format!("Database error: {e}")),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A source of transactions.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;

    /// Cheap liveness probe for `/health`.
    async fn ping(&self) -> StoreResult<()>;
}

/// One open transaction. `*_for_update` reads lock the row until commit.
#[async_trait]
pub trait StoreTx: Send {
    // --- users ---
    async fn get_user(&mut self, id: DbId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>>;
    async fn create_user(&mut self, username: &str) -> StoreResult<User>;

    // --- videos ---
    async fn insert_video(&mut self, input: &NewVideo) -> StoreResult<Video>;
    async fn get_video(&mut self, id: &str) -> StoreResult<Option<Video>>;
    async fn get_video_for_update(&mut self, id: &str) -> StoreResult<Option<Video>>;
    async fn update_video(&mut self, video: &Video) -> StoreResult<Video>;

    // --- video urls ---
    async fn list_video_urls(&mut self, video_id: &str) -> StoreResult<Vec<VideoUrl>>;
    async fn get_video_url(&mut self, id: DbId) -> StoreResult<Option<VideoUrl>>;
    async fn find_video_url(&mut self, url: &str) -> StoreResult<Option<VideoUrl>>;
    async fn insert_video_url(&mut self, input: &NewVideoUrl) -> StoreResult<VideoUrl>;
    async fn set_primary_url(&mut self, video_id: &str, url_id: DbId) -> StoreResult<bool>;
    async fn delete_video_url(&mut self, id: DbId) -> StoreResult<bool>;

    // --- languages ---
    async fn get_language(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>>;
    async fn get_language_for_update(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>>;
    async fn list_languages(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleLanguage>>;
    async fn insert_language(
        &mut self,
        video_id: &str,
        language_code: &str,
        standard_language_code: Option<&str>,
    ) -> StoreResult<SubtitleLanguage>;
    async fn update_language(&mut self, language: &SubtitleLanguage) -> StoreResult<SubtitleLanguage>;

    // --- versions ---
    /// Oldest first.
    async fn list_versions(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<SubtitleVersion>>;
    async fn list_video_versions(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleVersion>>;
    async fn get_version(&mut self, id: DbId) -> StoreResult<Option<SubtitleVersion>>;
    async fn get_version_by_number(
        &mut self,
        video_id: &str,
        language_code: &str,
        version_number: i32,
    ) -> StoreResult<Option<SubtitleVersion>>;
    async fn insert_version(&mut self, input: &NewVersion) -> StoreResult<SubtitleVersion>;
    async fn update_version_visibility(
        &mut self,
        id: DbId,
        visibility: Visibility,
        visibility_override: Option<Visibility>,
    ) -> StoreResult<SubtitleVersion>;

    // --- teams ---
    async fn insert_team(&mut self, input: &NewTeam) -> StoreResult<Team>;
    async fn get_team(&mut self, id: DbId) -> StoreResult<Option<Team>>;
    async fn get_team_by_slug(&mut self, slug: &str) -> StoreResult<Option<Team>>;
    async fn update_team(&mut self, team: &Team) -> StoreResult<Team>;

    // --- projects ---
    async fn insert_project(&mut self, input: &NewProject) -> StoreResult<Project>;
    async fn get_project(&mut self, id: DbId) -> StoreResult<Option<Project>>;
    async fn get_project_by_slug(&mut self, team_id: DbId, slug: &str) -> StoreResult<Option<Project>>;
    async fn list_projects(&mut self, team_id: DbId) -> StoreResult<Vec<Project>>;
    async fn update_project(&mut self, project: &Project) -> StoreResult<Project>;
    async fn delete_project(&mut self, id: DbId) -> StoreResult<bool>;

    // --- team videos ---
    async fn insert_team_video(
        &mut self,
        team_id: DbId,
        video_id: &str,
        project_id: Option<DbId>,
        added_by_id: Option<DbId>,
    ) -> StoreResult<TeamVideo>;
    async fn get_team_video(&mut self, id: DbId) -> StoreResult<Option<TeamVideo>>;
    async fn get_team_video_by_video(&mut self, video_id: &str) -> StoreResult<Option<TeamVideo>>;
    async fn list_team_videos(&mut self, team_id: DbId) -> StoreResult<Vec<TeamVideo>>;
    async fn set_team_video_project(
        &mut self,
        id: DbId,
        project_id: Option<DbId>,
    ) -> StoreResult<TeamVideo>;
    async fn delete_team_video(&mut self, id: DbId) -> StoreResult<bool>;

    // --- members ---
    async fn get_member(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<Option<TeamMember>>;
    async fn list_members(&mut self, team_id: DbId) -> StoreResult<Vec<TeamMember>>;
    async fn insert_member(&mut self, team_id: DbId, user_id: DbId, role: TeamRole) -> StoreResult<TeamMember>;
    async fn update_member_role(&mut self, id: DbId, role: TeamRole) -> StoreResult<TeamMember>;
    async fn delete_member(&mut self, id: DbId) -> StoreResult<bool>;
    async fn list_narrowings(&mut self, member_id: DbId) -> StoreResult<Vec<MembershipNarrowing>>;
    async fn insert_narrowing(
        &mut self,
        member_id: DbId,
        narrowing: &Narrowing,
        added_by_id: Option<DbId>,
    ) -> StoreResult<MembershipNarrowing>;

    // --- workflows ---
    async fn list_workflows(&mut self, team_id: DbId) -> StoreResult<Vec<Workflow>>;
    async fn upsert_workflow(&mut self, input: &NewWorkflow) -> StoreResult<Workflow>;

    // --- tasks ---
    async fn insert_task(&mut self, input: &NewTask) -> StoreResult<Task>;
    async fn get_task(&mut self, id: DbId) -> StoreResult<Option<Task>>;
    async fn update_task(&mut self, task: &Task) -> StoreResult<Task>;
    async fn list_tasks(&mut self, team_id: DbId, filter: &TaskFilter) -> StoreResult<Vec<Task>>;
    /// Non-deleted tasks of one team video, oldest first.
    async fn list_video_tasks(&mut self, team_video_id: DbId) -> StoreResult<Vec<Task>>;
    async fn count_open_assigned(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<i64>;

    // --- language preferences ---
    async fn list_language_preferences(&mut self, team_id: DbId) -> StoreResult<Vec<TeamLanguagePreference>>;
    async fn replace_language_preferences(
        &mut self,
        team_id: DbId,
        prefs: &[LanguagePreference],
    ) -> StoreResult<Vec<TeamLanguagePreference>>;

    // --- collaborators ---
    async fn upsert_collaborator(&mut self, input: &SaveCollaborator) -> StoreResult<Collaborator>;
    async fn list_collaborators(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<Collaborator>>;

    // --- applications and invitations ---
    async fn insert_application(&mut self, team_id: DbId, user_id: DbId, note: &str) -> StoreResult<Application>;
    async fn get_application(&mut self, id: DbId) -> StoreResult<Option<Application>>;
    async fn list_applications(&mut self, team_id: DbId) -> StoreResult<Vec<Application>>;
    async fn update_application_status(
        &mut self,
        id: DbId,
        status: ApplicationStatus,
    ) -> StoreResult<Application>;
    async fn insert_invitation(&mut self, input: &NewInvitation) -> StoreResult<Invitation>;
    async fn get_invitation(&mut self, id: DbId) -> StoreResult<Option<Invitation>>;
    async fn update_invitation_status(
        &mut self,
        id: DbId,
        status: InvitationStatus,
    ) -> StoreResult<Invitation>;

    // --- notes ---
    async fn insert_note(
        &mut self,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        body: &str,
    ) -> StoreResult<SubtitleNote>;
    async fn list_notes(&mut self, video_id: &str, language_code: &str) -> StoreResult<Vec<SubtitleNote>>;

    // --- lifecycle ---
    async fn commit(self: Box<Self>) -> StoreResult<()>;
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
