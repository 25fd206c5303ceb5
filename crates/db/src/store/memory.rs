//! In-process [`Store`] for tests and database-less local runs.
//!
//! A transaction holds the store-wide lock for its whole life, works on a
//! copy of the state and swaps it back on commit. Transactions are therefore
//! fully serialised, which is a stronger guarantee than the row locks the
//! Postgres store takes. Unique constraints are mirrored by name so callers
//! see the same [`StoreError`]s.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use subhub_core::language_prefs::LanguagePreference;
use subhub_core::permissions::Narrowing;
use subhub_core::roles::TeamRole;
use subhub_core::tasks::{TaskFilter, TaskOrder};
use subhub_core::team::{ApplicationStatus, InvitationStatus};
use subhub_core::types::{DbId, VideoId};
use subhub_core::visibility::Visibility;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreResult, StoreTx, LANGUAGE_UNIQUE_CONSTRAINT, VERSION_UNIQUE_CONSTRAINT};
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

#[derive(Debug, Default, Clone)]
struct MemoryState {
    last_id: DbId,
    users: BTreeMap<DbId, User>,
    videos: BTreeMap<VideoId, Video>,
    video_urls: BTreeMap<DbId, VideoUrl>,
    languages: BTreeMap<DbId, SubtitleLanguage>,
    versions: BTreeMap<DbId, SubtitleVersion>,
    teams: BTreeMap<DbId, Team>,
    projects: BTreeMap<DbId, Project>,
    team_videos: BTreeMap<DbId, TeamVideo>,
    members: BTreeMap<DbId, TeamMember>,
    narrowings: BTreeMap<DbId, MembershipNarrowing>,
    workflows: BTreeMap<DbId, Workflow>,
    tasks: BTreeMap<DbId, Task>,
    language_prefs: BTreeMap<DbId, TeamLanguagePreference>,
    collaborators: BTreeMap<DbId, Collaborator>,
    applications: BTreeMap<DbId, Application>,
    invitations: BTreeMap<DbId, Invitation>,
    notes: BTreeMap<DbId, SubtitleNote>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.last_id += 1;
        self.last_id
    }
}

/// Shared, cloneable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    failing_version_inserts: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` version inserts fail with
    /// [`StoreError::VersionConflict`], as a concurrent writer would.
    pub fn fail_next_version_inserts(&self, count: usize) {
        self.failing_version_inserts.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTx {
            guard,
            working,
            failing_version_inserts: Arc::clone(&self.failing_version_inserts),
        }))
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    failing_version_inserts: Arc<AtomicUsize>,
}

fn missing<T>(entity: &'static str) -> StoreResult<T> {
    Err(StoreError::Missing(entity))
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_string())
}

fn sort_tasks(tasks: &mut [Task], order: TaskOrder) {
    match order {
        TaskOrder::Created => tasks.sort_by_key(|t| (t.created_at, t.id)),
        TaskOrder::CreatedDesc => tasks.sort_by_key(|t| Reverse((t.created_at, t.id))),
        TaskOrder::Priority => tasks.sort_by_key(|t| (t.priority, t.id)),
        TaskOrder::PriorityDesc => tasks.sort_by_key(|t| Reverse((t.priority, t.id))),
        TaskOrder::Type => tasks.sort_by_key(|t| (t.task_type, t.id)),
        TaskOrder::TypeDesc => tasks.sort_by_key(|t| Reverse((t.task_type, t.id))),
    }
}

#[async_trait]
impl StoreTx for MemoryTx {
    // --- users ---

    async fn get_user(&mut self, id: DbId) -> StoreResult<Option<User>> {
        Ok(self.working.users.get(&id).cloned())
    }

    async fn find_user_by_username(&mut self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .working
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&mut self, username: &str) -> StoreResult<User> {
        if self.working.users.values().any(|u| u.username == username) {
            return Err(unique("uq_users_username"));
        }
        let user = User {
            id: self.working.next_id(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        self.working.users.insert(user.id, user.clone());
        Ok(user)
    }

    // --- videos ---

    async fn insert_video(&mut self, input: &NewVideo) -> StoreResult<Video> {
        if self.working.videos.contains_key(&input.id) {
            return Err(unique("videos_pkey"));
        }
        let now = Utc::now();
        let video = Video {
            id: input.id.clone(),
            primary_audio_language_code: input.primary_audio_language_code.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            duration_ms: input.duration_ms,
            thumbnail: input.thumbnail.clone(),
            metadata: Json(input.metadata.clone()),
            languages_count: 0,
            complete_date: None,
            writelock_owner_id: None,
            writelock_anonymous: false,
            writelock_session_key: None,
            writelock_time: None,
            created_at: now,
            updated_at: now,
        };
        self.working.videos.insert(video.id.clone(), video.clone());
        Ok(video)
    }

    async fn get_video(&mut self, id: &str) -> StoreResult<Option<Video>> {
        Ok(self.working.videos.get(id).cloned())
    }

    async fn get_video_for_update(&mut self, id: &str) -> StoreResult<Option<Video>> {
        self.get_video(id).await
    }

    async fn update_video(&mut self, video: &Video) -> StoreResult<Video> {
        let Some(stored) = self.working.videos.get_mut(&video.id) else {
            return missing("Video");
        };
        *stored = video.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_video_urls(&mut self, video_id: &str) -> StoreResult<Vec<VideoUrl>> {
        let mut urls: Vec<VideoUrl> = self
            .working
            .video_urls
            .values()
            .filter(|u| u.video_id == video_id)
            .cloned()
            .collect();
        urls.sort_by_key(|u| (Reverse(u.is_primary), u.id));
        Ok(urls)
    }

    async fn get_video_url(&mut self, id: DbId) -> StoreResult<Option<VideoUrl>> {
        Ok(self.working.video_urls.get(&id).cloned())
    }

    async fn find_video_url(&mut self, url: &str) -> StoreResult<Option<VideoUrl>> {
        Ok(self
            .working
            .video_urls
            .values()
            .find(|u| u.url == url)
            .cloned())
    }

    async fn insert_video_url(&mut self, input: &NewVideoUrl) -> StoreResult<VideoUrl> {
        if self.working.video_urls.values().any(|u| u.url == input.url) {
            return Err(unique("uq_video_urls_url"));
        }
        if input.is_primary {
            for url in self.working.video_urls.values_mut() {
                if url.video_id == input.video_id {
                    url.is_primary = false;
                }
            }
        }
        let url = VideoUrl {
            id: self.working.next_id(),
            video_id: input.video_id.clone(),
            url: input.url.clone(),
            is_primary: input.is_primary,
            original: input.original,
            added_by_id: input.added_by_id,
            created_at: Utc::now(),
        };
        self.working.video_urls.insert(url.id, url.clone());
        Ok(url)
    }

    async fn set_primary_url(&mut self, video_id: &str, url_id: DbId) -> StoreResult<bool> {
        let exists = self
            .working
            .video_urls
            .get(&url_id)
            .is_some_and(|u| u.video_id == video_id);
        if !exists {
            return Ok(false);
        }
        for url in self.working.video_urls.values_mut() {
            if url.video_id == video_id {
                url.is_primary = url.id == url_id;
            }
        }
        Ok(true)
    }

    async fn delete_video_url(&mut self, id: DbId) -> StoreResult<bool> {
        Ok(self.working.video_urls.remove(&id).is_some())
    }

    // --- languages ---

    async fn get_language(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>> {
        Ok(self
            .working
            .languages
            .values()
            .find(|l| l.video_id == video_id && l.language_code == language_code)
            .cloned())
    }

    async fn get_language_for_update(
        &mut self,
        video_id: &str,
        language_code: &str,
    ) -> StoreResult<Option<SubtitleLanguage>> {
        self.get_language(video_id, language_code).await
    }

    async fn list_languages(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleLanguage>> {
        let mut languages: Vec<SubtitleLanguage> = self
            .working
            .languages
            .values()
            .filter(|l| l.video_id == video_id)
            .cloned()
            .collect();
        languages.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        Ok(languages)
    }

    async fn insert_language(
        &mut self,
        video_id: &str,
        language_code: &str,
        standard_language_code: Option<&str>,
    ) -> StoreResult<SubtitleLanguage> {
        let duplicate = self
            .working
            .languages
            .values()
            .any(|l| l.video_id == video_id && l.language_code == language_code);
        if duplicate {
            return Err(StoreError::LanguageExists(format!(
                "{LANGUAGE_UNIQUE_CONSTRAINT}: {video_id}/{language_code}"
            )));
        }
        let now = Utc::now();
        let language = SubtitleLanguage {
            id: self.working.next_id(),
            video_id: video_id.to_string(),
            language_code: language_code.to_string(),
            subtitles_complete: false,
            is_forked: false,
            standard_language_code: standard_language_code.map(str::to_string),
            official_signoff_count: 0,
            unofficial_signoff_count: 0,
            pending_signoff_count: 0,
            pending_signoff_expired_count: 0,
            pending_signoff_unexpired_count: 0,
            subtitle_count: 0,
            percent_done: 0,
            has_version: false,
            had_version: false,
            writelock_owner_id: None,
            writelock_anonymous: false,
            writelock_session_key: None,
            writelock_time: None,
            created_at: now,
            updated_at: now,
        };
        self.working.languages.insert(language.id, language.clone());
        Ok(language)
    }

    async fn update_language(&mut self, language: &SubtitleLanguage) -> StoreResult<SubtitleLanguage> {
        let Some(stored) = self.working.languages.get_mut(&language.id) else {
            return missing("SubtitleLanguage");
        };
        *stored = language.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    // --- versions ---

    async fn list_versions(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<SubtitleVersion>> {
        let mut versions: Vec<SubtitleVersion> = self
            .working
            .versions
            .values()
            .filter(|v| v.subtitle_language_id == subtitle_language_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    async fn list_video_versions(&mut self, video_id: &str) -> StoreResult<Vec<SubtitleVersion>> {
        let mut versions: Vec<SubtitleVersion> = self
            .working
            .versions
            .values()
            .filter(|v| v.video_id == video_id)
            .cloned()
            .collect();
        versions.sort_by(|a, b| {
            (a.language_code.as_str(), a.version_number).cmp(&(b.language_code.as_str(), b.version_number))
        });
        Ok(versions)
    }

    async fn get_version(&mut self, id: DbId) -> StoreResult<Option<SubtitleVersion>> {
        Ok(self.working.versions.get(&id).cloned())
    }

    async fn get_version_by_number(
        &mut self,
        video_id: &str,
        language_code: &str,
        version_number: i32,
    ) -> StoreResult<Option<SubtitleVersion>> {
        Ok(self
            .working
            .versions
            .values()
            .find(|v| {
                v.video_id == video_id
                    && v.language_code == language_code
                    && v.version_number == version_number
            })
            .cloned())
    }

    async fn insert_version(&mut self, input: &NewVersion) -> StoreResult<SubtitleVersion> {
        let injected = self
            .failing_version_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let duplicate = self.working.versions.values().any(|v| {
            v.subtitle_language_id == input.subtitle_language_id
                && v.version_number == input.version_number
        });
        if injected || duplicate {
            return Err(StoreError::VersionConflict(format!(
                "{VERSION_UNIQUE_CONSTRAINT}: {}#{}",
                input.language_code, input.version_number
            )));
        }
        let version = SubtitleVersion {
            id: self.working.next_id(),
            video_id: input.video_id.clone(),
            subtitle_language_id: input.subtitle_language_id,
            language_code: input.language_code.clone(),
            version_number: input.version_number,
            author_id: input.author_id,
            title: input.title.clone(),
            description: input.description.clone(),
            metadata: Json(input.metadata.clone()),
            subtitles: Json(input.subtitles.clone()),
            subtitle_count: input.subtitles.subtitle_count() as i32,
            visibility: input.visibility.as_str().to_string(),
            visibility_override: input.visibility_override.map(|v| v.as_str().to_string()),
            rollback_of_version_number: input.rollback_of_version_number,
            parents: Json(input.parents.clone()),
            lineage: Json(input.lineage.clone()),
            origin: input.origin.clone(),
            created_at: Utc::now(),
        };
        self.working.versions.insert(version.id, version.clone());
        Ok(version)
    }

    async fn update_version_visibility(
        &mut self,
        id: DbId,
        visibility: Visibility,
        visibility_override: Option<Visibility>,
    ) -> StoreResult<SubtitleVersion> {
        let Some(version) = self.working.versions.get_mut(&id) else {
            return missing("SubtitleVersion");
        };
        version.visibility = visibility.as_str().to_string();
        version.visibility_override = visibility_override.map(|v| v.as_str().to_string());
        Ok(version.clone())
    }

    // --- teams ---

    async fn insert_team(&mut self, input: &NewTeam) -> StoreResult<Team> {
        if self.working.teams.values().any(|t| t.slug == input.slug) {
            return Err(unique("uq_teams_slug"));
        }
        let now = Utc::now();
        let team = Team {
            id: self.working.next_id(),
            slug: input.slug.clone(),
            name: input.name.clone(),
            description: input.description.clone(),
            workflow_enabled: input.workflow_enabled,
            task_expiration_days: input.task_expiration_days,
            max_tasks_per_member: input.max_tasks_per_member,
            subtitle_policy: input.subtitle_policy.clone(),
            translate_policy: input.translate_policy.clone(),
            sync_disabled: input.sync_disabled,
            created_at: now,
            updated_at: now,
        };
        self.working.teams.insert(team.id, team.clone());
        Ok(team)
    }

    async fn get_team(&mut self, id: DbId) -> StoreResult<Option<Team>> {
        Ok(self.working.teams.get(&id).cloned())
    }

    async fn get_team_by_slug(&mut self, slug: &str) -> StoreResult<Option<Team>> {
        Ok(self.working.teams.values().find(|t| t.slug == slug).cloned())
    }

    async fn update_team(&mut self, team: &Team) -> StoreResult<Team> {
        if self
            .working
            .teams
            .values()
            .any(|t| t.slug == team.slug && t.id != team.id)
        {
            return Err(unique("uq_teams_slug"));
        }
        let Some(stored) = self.working.teams.get_mut(&team.id) else {
            return missing("Team");
        };
        *stored = team.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    // --- projects ---

    async fn insert_project(&mut self, input: &NewProject) -> StoreResult<Project> {
        if self
            .working
            .projects
            .values()
            .any(|p| p.team_id == input.team_id && p.slug == input.slug)
        {
            return Err(unique("uq_projects_team_slug"));
        }
        let now = Utc::now();
        let project = Project {
            id: self.working.next_id(),
            team_id: input.team_id,
            name: input.name.clone(),
            slug: input.slug.clone(),
            description: input.description.clone(),
            guidelines: input.guidelines.clone(),
            workflow_enabled: input.workflow_enabled,
            created_at: now,
            updated_at: now,
        };
        self.working.projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn get_project(&mut self, id: DbId) -> StoreResult<Option<Project>> {
        Ok(self.working.projects.get(&id).cloned())
    }

    async fn get_project_by_slug(&mut self, team_id: DbId, slug: &str) -> StoreResult<Option<Project>> {
        Ok(self
            .working
            .projects
            .values()
            .find(|p| p.team_id == team_id && p.slug == slug)
            .cloned())
    }

    async fn list_projects(&mut self, team_id: DbId) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .working
            .projects
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<Project> {
        if self
            .working
            .projects
            .values()
            .any(|p| p.team_id == project.team_id && p.slug == project.slug && p.id != project.id)
        {
            return Err(unique("uq_projects_team_slug"));
        }
        let Some(stored) = self.working.projects.get_mut(&project.id) else {
            return missing("Project");
        };
        *stored = project.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_project(&mut self, id: DbId) -> StoreResult<bool> {
        if self.working.projects.remove(&id).is_none() {
            return Ok(false);
        }
        // ON DELETE SET NULL / CASCADE
        for tv in self.working.team_videos.values_mut() {
            if tv.project_id == Some(id) {
                tv.project_id = None;
            }
        }
        self.working.workflows.retain(|_, w| w.project_id != Some(id));
        self.working.narrowings.retain(|_, n| n.project_id != Some(id));
        Ok(true)
    }

    // --- team videos ---

    async fn insert_team_video(
        &mut self,
        team_id: DbId,
        video_id: &str,
        project_id: Option<DbId>,
        added_by_id: Option<DbId>,
    ) -> StoreResult<TeamVideo> {
        if self.working.team_videos.values().any(|tv| tv.video_id == video_id) {
            return Err(unique("uq_team_videos_video"));
        }
        let team_video = TeamVideo {
            id: self.working.next_id(),
            team_id,
            video_id: video_id.to_string(),
            project_id,
            added_by_id,
            created_at: Utc::now(),
        };
        self.working.team_videos.insert(team_video.id, team_video.clone());
        Ok(team_video)
    }

    async fn get_team_video(&mut self, id: DbId) -> StoreResult<Option<TeamVideo>> {
        Ok(self.working.team_videos.get(&id).cloned())
    }

    async fn get_team_video_by_video(&mut self, video_id: &str) -> StoreResult<Option<TeamVideo>> {
        Ok(self
            .working
            .team_videos
            .values()
            .find(|tv| tv.video_id == video_id)
            .cloned())
    }

    async fn list_team_videos(&mut self, team_id: DbId) -> StoreResult<Vec<TeamVideo>> {
        Ok(self
            .working
            .team_videos
            .values()
            .filter(|tv| tv.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn set_team_video_project(
        &mut self,
        id: DbId,
        project_id: Option<DbId>,
    ) -> StoreResult<TeamVideo> {
        let Some(tv) = self.working.team_videos.get_mut(&id) else {
            return missing("TeamVideo");
        };
        tv.project_id = project_id;
        Ok(tv.clone())
    }

    async fn delete_team_video(&mut self, id: DbId) -> StoreResult<bool> {
        if self.working.team_videos.remove(&id).is_none() {
            return Ok(false);
        }
        self.working.tasks.retain(|_, t| t.team_video_id != id);
        self.working.workflows.retain(|_, w| w.team_video_id != Some(id));
        Ok(true)
    }

    // --- members ---

    async fn get_member(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<Option<TeamMember>> {
        Ok(self
            .working
            .members
            .values()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
            .cloned())
    }

    async fn list_members(&mut self, team_id: DbId) -> StoreResult<Vec<TeamMember>> {
        Ok(self
            .working
            .members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn insert_member(&mut self, team_id: DbId, user_id: DbId, role: TeamRole) -> StoreResult<TeamMember> {
        if self
            .working
            .members
            .values()
            .any(|m| m.team_id == team_id && m.user_id == user_id)
        {
            return Err(unique("uq_team_members_team_user"));
        }
        let member = TeamMember {
            id: self.working.next_id(),
            team_id,
            user_id,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        self.working.members.insert(member.id, member.clone());
        Ok(member)
    }

    async fn update_member_role(&mut self, id: DbId, role: TeamRole) -> StoreResult<TeamMember> {
        let Some(member) = self.working.members.get_mut(&id) else {
            return missing("TeamMember");
        };
        member.role = role.as_str().to_string();
        Ok(member.clone())
    }

    async fn delete_member(&mut self, id: DbId) -> StoreResult<bool> {
        if self.working.members.remove(&id).is_none() {
            return Ok(false);
        }
        self.working.narrowings.retain(|_, n| n.member_id != id);
        Ok(true)
    }

    async fn list_narrowings(&mut self, member_id: DbId) -> StoreResult<Vec<MembershipNarrowing>> {
        Ok(self
            .working
            .narrowings
            .values()
            .filter(|n| n.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn insert_narrowing(
        &mut self,
        member_id: DbId,
        narrowing: &Narrowing,
        added_by_id: Option<DbId>,
    ) -> StoreResult<MembershipNarrowing> {
        let (project_id, language_code) = match narrowing {
            Narrowing::Project(p) => (Some(*p), None),
            Narrowing::Language(lc) => (None, Some(lc.clone())),
        };
        let row = MembershipNarrowing {
            id: self.working.next_id(),
            member_id,
            project_id,
            language_code,
            added_by_id,
            created_at: Utc::now(),
        };
        self.working.narrowings.insert(row.id, row.clone());
        Ok(row)
    }

    // --- workflows ---

    async fn list_workflows(&mut self, team_id: DbId) -> StoreResult<Vec<Workflow>> {
        Ok(self
            .working
            .workflows
            .values()
            .filter(|w| w.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn upsert_workflow(&mut self, input: &NewWorkflow) -> StoreResult<Workflow> {
        let now = Utc::now();
        let existing = self.working.workflows.values_mut().find(|w| {
            w.team_id == input.team_id
                && w.project_id == input.project_id
                && w.team_video_id == input.team_video_id
        });
        if let Some(workflow) = existing {
            workflow.autocreate_subtitle = input.settings.autocreate_subtitle;
            workflow.autocreate_translate = input.settings.autocreate_translate;
            workflow.review_allowed = input.settings.review_allowed.as_str().to_string();
            workflow.approve_allowed = input.settings.approve_allowed.as_str().to_string();
            workflow.updated_at = now;
            return Ok(workflow.clone());
        }
        let workflow = Workflow {
            id: self.working.next_id(),
            team_id: input.team_id,
            project_id: input.project_id,
            team_video_id: input.team_video_id,
            autocreate_subtitle: input.settings.autocreate_subtitle,
            autocreate_translate: input.settings.autocreate_translate,
            review_allowed: input.settings.review_allowed.as_str().to_string(),
            approve_allowed: input.settings.approve_allowed.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.working.workflows.insert(workflow.id, workflow.clone());
        Ok(workflow)
    }

    // --- tasks ---

    async fn insert_task(&mut self, input: &NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: self.working.next_id(),
            team_id: input.team_id,
            team_video_id: input.team_video_id,
            video_id: input.video_id.clone(),
            task_type: input.task_type.code(),
            language_code: input.language_code.clone(),
            assignee_id: input.assignee_id,
            subtitle_version_id: input.subtitle_version_id,
            approved: None,
            priority: input.priority,
            body: String::new(),
            completed_at: None,
            expiration_date: input.expiration_date,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.working.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&mut self, id: DbId) -> StoreResult<Option<Task>> {
        Ok(self.working.tasks.get(&id).cloned())
    }

    async fn update_task(&mut self, task: &Task) -> StoreResult<Task> {
        let Some(stored) = self.working.tasks.get_mut(&task.id) else {
            return missing("Task");
        };
        *stored = task.clone();
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn list_tasks(&mut self, team_id: DbId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .working
            .tasks
            .values()
            .filter(|t| t.team_id == team_id && filter.matches(&t.facts()))
            .cloned()
            .collect();
        sort_tasks(&mut tasks, filter.order_by.unwrap_or(TaskOrder::Created));
        Ok(tasks)
    }

    async fn list_video_tasks(&mut self, team_video_id: DbId) -> StoreResult<Vec<Task>> {
        Ok(self
            .working
            .tasks
            .values()
            .filter(|t| t.team_video_id == team_video_id && !t.deleted)
            .cloned()
            .collect())
    }

    async fn count_open_assigned(&mut self, team_id: DbId, user_id: DbId) -> StoreResult<i64> {
        let count = self
            .working
            .tasks
            .values()
            .filter(|t| t.team_id == team_id && t.assignee_id == Some(user_id) && t.is_open())
            .count();
        Ok(count as i64)
    }

    // --- language preferences ---

    async fn list_language_preferences(&mut self, team_id: DbId) -> StoreResult<Vec<TeamLanguagePreference>> {
        let mut prefs: Vec<TeamLanguagePreference> = self
            .working
            .language_prefs
            .values()
            .filter(|p| p.team_id == team_id)
            .cloned()
            .collect();
        prefs.sort_by(|a, b| a.language_code.cmp(&b.language_code));
        Ok(prefs)
    }

    async fn replace_language_preferences(
        &mut self,
        team_id: DbId,
        prefs: &[LanguagePreference],
    ) -> StoreResult<Vec<TeamLanguagePreference>> {
        self.working.language_prefs.retain(|_, p| p.team_id != team_id);
        for pref in prefs {
            let row = TeamLanguagePreference {
                id: self.working.next_id(),
                team_id,
                language_code: pref.language_code.clone(),
                preferred: pref.preferred,
                allow_reads: pref.allow_reads,
                allow_writes: pref.allow_writes,
            };
            self.working.language_prefs.insert(row.id, row);
        }
        self.list_language_preferences(team_id).await
    }

    // --- collaborators ---

    async fn upsert_collaborator(&mut self, input: &SaveCollaborator) -> StoreResult<Collaborator> {
        let now = Utc::now();
        let existing = self.working.collaborators.values_mut().find(|c| {
            c.subtitle_language_id == input.subtitle_language_id && c.user_id == input.user_id
        });
        if let Some(collaborator) = existing {
            collaborator.signoff = input.signoff;
            collaborator.signoff_is_official = input.signoff_is_official;
            collaborator.expired = input.expired;
            collaborator.expiration_start = input.expiration_start;
            collaborator.updated_at = now;
            return Ok(collaborator.clone());
        }
        let collaborator = Collaborator {
            id: self.working.next_id(),
            subtitle_language_id: input.subtitle_language_id,
            user_id: input.user_id,
            signoff: input.signoff,
            signoff_is_official: input.signoff_is_official,
            expired: input.expired,
            expiration_start: input.expiration_start,
            created_at: now,
            updated_at: now,
        };
        self.working
            .collaborators
            .insert(collaborator.id, collaborator.clone());
        Ok(collaborator)
    }

    async fn list_collaborators(&mut self, subtitle_language_id: DbId) -> StoreResult<Vec<Collaborator>> {
        Ok(self
            .working
            .collaborators
            .values()
            .filter(|c| c.subtitle_language_id == subtitle_language_id)
            .cloned()
            .collect())
    }

    // --- applications and invitations ---

    async fn insert_application(&mut self, team_id: DbId, user_id: DbId, note: &str) -> StoreResult<Application> {
        let now = Utc::now();
        let application = Application {
            id: self.working.next_id(),
            team_id,
            user_id,
            note: note.to_string(),
            status: ApplicationStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.working
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn get_application(&mut self, id: DbId) -> StoreResult<Option<Application>> {
        Ok(self.working.applications.get(&id).cloned())
    }

    async fn list_applications(&mut self, team_id: DbId) -> StoreResult<Vec<Application>> {
        Ok(self
            .working
            .applications
            .values()
            .filter(|a| a.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn update_application_status(
        &mut self,
        id: DbId,
        status: ApplicationStatus,
    ) -> StoreResult<Application> {
        let Some(application) = self.working.applications.get_mut(&id) else {
            return missing("Application");
        };
        application.status = status.as_str().to_string();
        application.updated_at = Utc::now();
        Ok(application.clone())
    }

    async fn insert_invitation(&mut self, input: &NewInvitation) -> StoreResult<Invitation> {
        let now = Utc::now();
        let invitation = Invitation {
            id: self.working.next_id(),
            team_id: input.team_id,
            user_id: input.user_id,
            author_id: input.author_id,
            role: input.role.as_str().to_string(),
            note: input.note.clone(),
            status: InvitationStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.working
            .invitations
            .insert(invitation.id, invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation(&mut self, id: DbId) -> StoreResult<Option<Invitation>> {
        Ok(self.working.invitations.get(&id).cloned())
    }

    async fn update_invitation_status(
        &mut self,
        id: DbId,
        status: InvitationStatus,
    ) -> StoreResult<Invitation> {
        let Some(invitation) = self.working.invitations.get_mut(&id) else {
            return missing("Invitation");
        };
        invitation.status = status.as_str().to_string();
        invitation.updated_at = Utc::now();
        Ok(invitation.clone())
    }

    // --- notes ---

    async fn insert_note(
        &mut self,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        body: &str,
    ) -> StoreResult<SubtitleNote> {
        let note = SubtitleNote {
            id: self.working.next_id(),
            video_id: video_id.to_string(),
            language_code: language_code.to_string(),
            user_id,
            body: body.to_string(),
            created_at: Utc::now(),
        };
        self.working.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn list_notes(&mut self, video_id: &str, language_code: &str) -> StoreResult<Vec<SubtitleNote>> {
        Ok(self
            .working
            .notes
            .values()
            .filter(|n| n.video_id == video_id && n.language_code == language_code)
            .cloned()
            .collect())
    }

    // --- lifecycle ---

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use subhub_core::lineage::Lineage;
    use subhub_core::subtitles::SubtitleSet;

    use super::*;

    fn new_video(id: &str) -> NewVideo {
        NewVideo {
            id: id.to_string(),
            primary_audio_language_code: None,
            title: String::new(),
            description: String::new(),
            duration_ms: None,
            thumbnail: String::new(),
            metadata: serde_json::json!({}),
        }
    }

    fn new_version(language: &SubtitleLanguage, number: i32) -> NewVersion {
        NewVersion {
            video_id: language.video_id.clone(),
            subtitle_language_id: language.id,
            language_code: language.language_code.clone(),
            version_number: number,
            author_id: None,
            title: String::new(),
            description: String::new(),
            metadata: serde_json::json!({}),
            subtitles: SubtitleSet::from_timed(&[(0, 1000, "hi")]),
            visibility: Visibility::Public,
            visibility_override: None,
            rollback_of_version_number: None,
            parents: Vec::new(),
            lineage: Lineage::new(),
            origin: "api".to_string(),
        }
    }

    #[tokio::test]
    async fn committed_writes_are_visible_to_later_transactions() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_video(&new_video("abc")).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_video("abc").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_video(&new_video("abc")).await.unwrap();
        }
        let mut tx = store.begin().await.unwrap();
        assert!(tx.get_video("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_language_is_reported_as_language_exists() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_video(&new_video("abc")).await.unwrap();
        tx.insert_language("abc", "en", None).await.unwrap();
        assert_matches!(
            tx.insert_language("abc", "en", None).await,
            Err(StoreError::LanguageExists(_))
        );
    }

    #[tokio::test]
    async fn duplicate_version_number_is_a_conflict() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_video(&new_video("abc")).await.unwrap();
        let en = tx.insert_language("abc", "en", None).await.unwrap();
        tx.insert_version(&new_version(&en, 1)).await.unwrap();
        assert_matches!(
            tx.insert_version(&new_version(&en, 1)).await,
            Err(StoreError::VersionConflict(_))
        );
    }

    #[tokio::test]
    async fn injected_conflicts_are_consumed() {
        let store = MemoryStore::new();
        store.fail_next_version_inserts(1);
        let mut tx = store.begin().await.unwrap();
        tx.insert_video(&new_video("abc")).await.unwrap();
        let en = tx.insert_language("abc", "en", None).await.unwrap();
        assert_matches!(
            tx.insert_version(&new_version(&en, 1)).await,
            Err(StoreError::VersionConflict(_))
        );
        assert!(tx.insert_version(&new_version(&en, 1)).await.is_ok());
    }

    #[tokio::test]
    async fn primary_url_is_exclusive() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_video(&new_video("abc")).await.unwrap();
        let first = tx
            .insert_video_url(&NewVideoUrl {
                video_id: "abc".into(),
                url: "https://a.example/1".into(),
                is_primary: true,
                original: true,
                added_by_id: None,
            })
            .await
            .unwrap();
        let second = tx
            .insert_video_url(&NewVideoUrl {
                video_id: "abc".into(),
                url: "https://a.example/2".into(),
                is_primary: true,
                original: false,
                added_by_id: None,
            })
            .await
            .unwrap();
        let urls = tx.list_video_urls("abc").await.unwrap();
        assert_eq!(urls.iter().filter(|u| u.is_primary).count(), 1);
        assert_eq!(urls[0].id, second.id);

        assert!(tx.set_primary_url("abc", first.id).await.unwrap());
        let urls = tx.list_video_urls("abc").await.unwrap();
        assert_eq!(urls[0].id, first.id);
        assert!(!urls[1].is_primary);
    }

    #[tokio::test]
    async fn workflow_upsert_replaces_same_level() {
        use subhub_core::workflow::{ReviewAllowed, WorkflowSettings};

        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let mut input = NewWorkflow {
            team_id: 7,
            project_id: None,
            team_video_id: None,
            settings: WorkflowSettings::DISABLED,
        };
        let first = tx.upsert_workflow(&input).await.unwrap();
        input.settings.review_allowed = ReviewAllowed::Manager;
        let second = tx.upsert_workflow(&input).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.settings().review_allowed, ReviewAllowed::Manager);
        assert_eq!(tx.list_workflows(7).await.unwrap().len(), 1);
    }
}
