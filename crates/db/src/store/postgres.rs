//! Postgres-backed [`Store`], delegating to the repositories.

use async_trait::async_trait;
use sqlx::{Postgres, Transaction};
use subhub_core::language_prefs::LanguagePreference;
use subhub_core::permissions::Narrowing;
use subhub_core::roles::TeamRole;
use subhub_core::tasks::TaskFilter;
use subhub_core::team::{ApplicationStatus, InvitationStatus};
use subhub_core::types::DbId;
use subhub_core::visibility::Visibility;

use super::{Store, StoreError, StoreResult, StoreTx};
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
use crate::repositories::{
    ApplicationRepo, CollaboratorRepo, InvitationRepo, LanguagePreferenceRepo, NarrowingRepo,
    NoteRepo, ProjectRepo, SubtitleLanguageRepo, SubtitleVersionRepo, TaskRepo, TeamMemberRepo,
    TeamRepo, TeamVideoRepo, UserRepo, VideoRepo, VideoUrlRepo, WorkflowRepo,
};
use crate::DbPool;

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTx { tx }))
    }

    async fn ping(&self) -> StoreResult<()> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn found<T>(row: Option<T>, entity: &'static str) -> StoreResult<T> {
    row.ok_or(StoreError::Missing(entity))
}

#[async_trait]
impl StoreTx for PgTx {
    // --- users ---

    async fn get_user(&mut self, id: DbId) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(UserRepo::find_by_username(&mut self.tx, username).await?)
    }

    async fn create_user(&mut self, username: &str) -> StoreResult<User> {
        Ok(UserRepo::create(&mut self.tx, username).await?)
    }

    // --- videos ---

    async fn insert_video(&mut self, input: &NewVideo) -> StoreResult<Video> {
        Ok(VideoRepo::create(&mut self.tx, input).await?)
    }

    async fn get_video(&mut self, id: &str) -> StoreResult<Option<Video>> {
        Ok(VideoRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn get_video_for_update(&mut self, id: &str) -> StoreResult<Option<Video>> {
        Ok(VideoRepo::find_by_id_for_update(&mut self.tx, id).await?)
    }

    async fn update_video(&mut self, video: &Video) -> StoreResult<Video> {
        Ok(VideoRepo::save(&mut self.tx, video).await?)
    }

    async fn list_video_urls(&mut self, video_id: &str) -> StoreResult<Vec<VideoUrl>> {
        Ok(VideoUrlRepo::list_for_video(&mut self.tx, video_id).await?)
    }

    async fn get_video_url(&mut self, id: DbId) -> StoreResult<Option<VideoUrl>> {
        Ok(VideoUrlRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn find_video_url(&mut self, url: &str) -> StoreResult<Option<VideoUrl>> {
        Ok(VideoUrlRepo::find_by_url(&mut self.tx, url).await?)
    }

    async fn insert_video_url(&mut self, input: &NewVideoUrl) -> StoreResult<VideoUrl> {
        Ok(VideoUrlRepo::create(&mut self.tx, input).await?)
    }

    async fn set_primary_url(&mut self, video_id: &str, url_id: DbId) -> StoreResult<bool> {
        Ok(VideoUrlRepo::set_primary(&mut self.tx, video_id, url_id).await?)
    }

    async fn delete_video_url(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(VideoUrlRepo::delete(&mut self.tx, id).await?)
    }

    // --- languages ---

    async fn get_language(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>> {
        Ok(SubtitleLanguageRepo::find(&mut self.tx, video_id, language_code).await?)
    }

    async fn get_language_for_update(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>> {
        Ok(SubtitleLanguageRepo::find_for_update(&mut self.tx, video_id, language_code).await?)
    }

    async fn list_languages(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleLanguage>> {
        Ok(SubtitleLanguageRepo::list_for_video(&mut self.tx, video_id).await?)
    }

    async fn insert_language(
        &mut self,
        video_id: &str,
        language_code: &str,
        standard_language_code: Option<&str>,
    ) -> StoreResult<SubtitleLanguage> {
        Ok(
            SubtitleLanguageRepo::create(&mut self.tx, video_id, language_code, standard_language_code)
                .await?,
        )
    }

    async fn update_language(&mut self, language: &SubtitleLanguage) -> StoreResult<SubtitleLanguage> {
        Ok(SubtitleLanguageRepo::save(&mut self.tx, language).await?)
    }

    // --- versions ---

    async fn list_versions(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<SubtitleVersion>> {
        Ok(SubtitleVersionRepo::list_for_language(&mut self.tx, subtitle_language_id).await?)
    }

    async fn list_video_versions(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleVersion>> {
        Ok(SubtitleVersionRepo::list_for_video(&mut self.tx, video_id).await?)
    }

    async fn get_version(&mut self, id: DbId) -> StoreResult<Option<SubtitleVersion>> {
        Ok(SubtitleVersionRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn get_version_by_number(
        &mut self,
        video_id: &str,
        language_code: &str,
        version_number: i32,
    ) -> StoreResult<Option<SubtitleVersion>> {
        Ok(
            SubtitleVersionRepo::find_by_number(&mut self.tx, video_id, language_code, version_number)
                .await?,
        )
    }

    async fn insert_version(&mut self, input: &NewVersion) -> StoreResult<SubtitleVersion> {
        Ok(SubtitleVersionRepo::create(&mut self.tx, input).await?)
    }

    async fn update_version_visibility(
        &mut self,
        id: DbId,
        visibility: Visibility,
        visibility_override: Option<Visibility>,
    ) -> StoreResult<SubtitleVersion> {
        let row = SubtitleVersionRepo::update_visibility(&mut self.tx, id, visibility, visibility_override)
            .await?;
        found(row, "SubtitleVersion")
    }

    // --- teams ---

    async fn insert_team(&mut self, input: &NewTeam) -> StoreResult<Team> {
        Ok(TeamRepo::create(&mut self.tx, input).await?)
    }

    async fn get_team(&mut self, id: DbId) -> StoreResult<Option<Team>> {
        Ok(TeamRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn get_team_by_slug(&mut self, slug: &str) -> StoreResult<Option<Team>> {
        Ok(TeamRepo::find_by_slug(&mut self.tx, slug).await?)
    }

    async fn update_team(&mut self, team: &Team) -> StoreResult<Team> {
        Ok(TeamRepo::save(&mut self.tx, team).await?)
    }

    // --- projects ---

    async fn insert_project(&mut self, input: &NewProject) -> StoreResult<Project> {
        Ok(ProjectRepo::create(&mut self.tx, input).await?)
    }

    async fn get_project(&mut self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn get_project_by_slug(&mut self, team_id: DbId, slug: &str) -> StoreResult<Option<Project>> {
        Ok(ProjectRepo::find_by_slug(&mut self.tx, team_id, slug).await?)
    }

    async fn list_projects(&mut self, team_id: DbId) -> StoreResult<Vec<Project>> {
        Ok(ProjectRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<Project> {
        Ok(ProjectRepo::save(&mut self.tx, project).await?)
    }

    async fn delete_project(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(ProjectRepo::delete(&mut self.tx, id).await?)
    }

    // --- team videos ---

    async fn insert_team_video(
        &mut self,
        team_id: DbId,
        video_id: &str,
        project_id: Option<DbId>,
        added_by_id: Option<DbId>,
    ) -> StoreResult<TeamVideo> {
        Ok(TeamVideoRepo::create(&mut self.tx, team_id, video_id, project_id, added_by_id).await?)
    }

    async fn get_team_video(&mut self, id: DbId) -> StoreResult<Option<TeamVideo>> {
        Ok(TeamVideoRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn get_team_video_by_video(&mut self, video_id: &str) -> StoreResult<Option<TeamVideo>> {
        Ok(TeamVideoRepo::find_by_video(&mut self.tx, video_id).await?)
    }

    async fn list_team_videos(&mut self, team_id: DbId) -> StoreResult<Vec<TeamVideo>> {
        Ok(TeamVideoRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn set_team_video_project(
        &mut self,
        id: DbId,
        project_id: Option<DbId>,
    ) -> StoreResult<TeamVideo> {
        let row = TeamVideoRepo::set_project(&mut self.tx, id, project_id).await?;
        found(row, "TeamVideo")
    }

    async fn delete_team_video(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(TeamVideoRepo::delete(&mut self.tx, id).await?)
    }

    // --- members ---

    async fn get_member(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<Option<TeamMember>> {
        Ok(TeamMemberRepo::find(&mut self.tx, team_id, user_id).await?)
    }

    async fn list_members(&mut self, team_id: DbId) -> StoreResult<Vec<TeamMember>> {
        Ok(TeamMemberRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn insert_member(&mut self, team_id: DbId, user_id: DbId, role: TeamRole) -> StoreResult<TeamMember> {
        Ok(TeamMemberRepo::create(&mut self.tx, team_id, user_id, role).await?)
    }

    async fn update_member_role(&mut self, id: DbId, role: TeamRole) -> StoreResult<TeamMember> {
        let row = TeamMemberRepo::update_role(&mut self.tx, id, role).await?;
        found(row, "TeamMember")
    }

    async fn delete_member(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(TeamMemberRepo::delete(&mut self.tx, id).await?)
    }

    async fn list_narrowings(&mut self, member_id: DbId) -> StoreResult<Vec<MembershipNarrowing>> {
        Ok(NarrowingRepo::list_for_member(&mut self.tx, member_id).await?)
    }

    async fn insert_narrowing(
        &mut self,
        member_id: DbId,
        narrowing: &Narrowing,
        added_by_id: Option<DbId>,
    ) -> StoreResult<MembershipNarrowing> {
        Ok(NarrowingRepo::create(&mut self.tx, member_id, narrowing, added_by_id).await?)
    }

    // --- workflows ---

    async fn list_workflows(&mut self, team_id: DbId) -> StoreResult<Vec<Workflow>> {
        Ok(WorkflowRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn upsert_workflow(&mut self, input: &NewWorkflow) -> StoreResult<Workflow> {
        Ok(WorkflowRepo::upsert(&mut self.tx, input).await?)
    }

    // --- tasks ---

    async fn insert_task(&mut self, input: &NewTask) -> StoreResult<Task> {
        Ok(TaskRepo::create(&mut self.tx, input).await?)
    }

    async fn get_task(&mut self, id: DbId) -> StoreResult<Option<Task>> {
        Ok(TaskRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn update_task(&mut self, task: &Task) -> StoreResult<Task> {
        Ok(TaskRepo::save(&mut self.tx, task).await?)
    }

    async fn list_tasks(&mut self, team_id: DbId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        Ok(TaskRepo::list(&mut self.tx, team_id, filter).await?)
    }

    async fn list_video_tasks(&mut self, team_video_id: DbId) -> StoreResult<Vec<Task>> {
        Ok(TaskRepo::list_for_team_video(&mut self.tx, team_video_id).await?)
    }

    async fn count_open_assigned(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<i64> {
        Ok(TaskRepo::count_open_assigned(&mut self.tx, team_id, user_id).await?)
    }

    // --- language preferences ---

    async fn list_language_preferences(&mut self, team_id: DbId) -> StoreResult<Vec<TeamLanguagePreference>> {
        Ok(LanguagePreferenceRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn replace_language_preferences(
        &mut self,
        team_id: DbId,
        prefs: &[LanguagePreference],
    ) -> StoreResult<Vec<TeamLanguagePreference>> {
        Ok(LanguagePreferenceRepo::replace(&mut self.tx, team_id, prefs).await?)
    }

    // --- collaborators ---

    async fn upsert_collaborator(&mut self, input: &SaveCollaborator) -> StoreResult<Collaborator> {
        Ok(CollaboratorRepo::upsert(&mut self.tx, input).await?)
    }

    async fn list_collaborators(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<Collaborator>> {
        Ok(CollaboratorRepo::list_for_language(&mut self.tx, subtitle_language_id).await?)
    }

    // --- applications and invitations ---

    async fn insert_application(&mut self, team_id: DbId, user_id: DbId, note: &str) -> StoreResult<Application> {
        Ok(ApplicationRepo::create(&mut self.tx, team_id, user_id, note).await?)
    }

    async fn get_application(&mut self, id: DbId) -> StoreResult<Option<Application>> {
        Ok(ApplicationRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn list_applications(&mut self, team_id: DbId) -> StoreResult<Vec<Application>> {
        Ok(ApplicationRepo::list_for_team(&mut self.tx, team_id).await?)
    }

    async fn update_application_status(
        &mut self,
        id: DbId,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        let row = ApplicationRepo::update_status(&mut self.tx, id, status).await?;
        found(row, "Application")
    }

    async fn insert_invitation(&mut self, input: &NewInvitation) -> StoreResult<Invitation> {
        Ok(InvitationRepo::create(&mut self.tx, input).await?)
    }

    async fn get_invitation(&mut self, id: DbId) -> StoreResult<Option<Invitation>> {
        Ok(InvitationRepo::find_by_id(&mut self.tx, id).await?)
    }

    async fn update_invitation_status(
        &mut self,
        id: DbId,
        status: InvitationStatus,
    ) -> StoreResult<Invitation> {
        let row = InvitationRepo::update_status(&mut self.tx, id, status).await?;
        found(row, "Invitation")
    }

    // --- notes ---

    async fn insert_note(
        &mut self,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        body: &str,
    ) -> StoreResult<SubtitleNote> {
        Ok(NoteRepo::create(&mut self.tx, video_id, language_code, user_id, body).await?)
    }

    async fn list_notes(&mut self, video_id: &str, language_code: &str) -> StoreResult<Vec<SubtitleNote>> {
        Ok(NoteRepo::list_for_language(&mut self.tx, video_id, language_code).await?)
    }

    // --- lifecycle ---

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
