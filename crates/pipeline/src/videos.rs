//! Videos, their URLs and languages, and the read side of subtitle history.
//!
//! Private versions are only shown to members of the owning team and to
//! their authors. Languages a team has closed for reading are hidden from
//! everyone outside the team.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use subhub_core::error::CoreError;
use subhub_core::languages::validate_language_code;
use subhub_core::lineage::TranslationStatus;
use subhub_core::permissions::{Permission, PermissionTarget};
use subhub_core::subtitles::{diff, SubtitleDiff};
use subhub_core::types::{DbId, Timestamp};
use subhub_core::video::{
    ensure_url_deletable, generate_video_id, new_url_is_primary, validate_duration,
    validate_video_url,
};
use subhub_core::visibility::{public_tip, tip, VersionVisibility, Visibility};
use subhub_core::workflow::WorkflowAction;
use subhub_db::models::language::SubtitleLanguage;
use subhub_db::models::note::SubtitleNote;
use subhub_db::models::team::TeamVideo;
use subhub_db::models::version::SubtitleVersion;
use subhub_db::models::video::{NewVideo, NewVideoUrl, UpdateVideo, Video, VideoUrl};
use subhub_db::StoreTx;
use subhub_events::bus::VIDEO_CACHE_INVALIDATED;
use subhub_events::{DomainEvent, Outbox};

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::language_prefs::LanguagePreferenceService;
use crate::permissions::PermissionService;
use crate::teams::{load_project, load_team, TeamService};
use crate::workflow::WorkflowEngine;

// ---------------------------------------------------------------------------
// Inputs and views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateVideo {
    pub url: String,
    pub primary_audio_language_code: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_ms: Option<i64>,
    #[serde(default)]
    pub thumbnail: String,
    pub metadata: Option<Value>,
    /// Team slug to add the video to.
    pub team: Option<String>,
    /// Project slug within `team`.
    pub project: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub version_number: i32,
    pub author_id: Option<DbId>,
    pub visibility: Visibility,
    pub subtitle_count: i32,
    pub created_at: Timestamp,
}

impl VersionSummary {
    fn of(version: &SubtitleVersion) -> Self {
        Self {
            version_number: version.version_number,
            author_id: version.author_id,
            visibility: version.effective_visibility(),
            subtitle_count: version.subtitle_count,
            created_at: version.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageSummary {
    pub language_code: String,
    pub is_primary_audio_language: bool,
    pub subtitles_complete: bool,
    pub is_forked: bool,
    pub standard_language_code: Option<String>,
    pub subtitle_count: i32,
    pub percent_done: i32,
    pub official_signoff_count: i32,
    /// Newest first; only versions the caller may see.
    pub versions: Vec<VersionSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoDetails {
    #[serde(flatten)]
    pub video: Video,
    pub team: Option<String>,
    pub project: Option<String>,
    pub languages: Vec<LanguageSummary>,
    pub all_urls: Vec<String>,
}

/// Who is asking, and how much of the private history they may see.
struct Viewer {
    actor: Option<DbId>,
    is_member: bool,
}

impl Viewer {
    fn can_see(&self, version: &SubtitleVersion) -> bool {
        version.is_public()
            || self.is_member
            || (self.actor.is_some() && version.author_id == self.actor)
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct VideoService {
    ctx: ServiceContext,
    workflow: Arc<WorkflowEngine>,
    teams: Arc<TeamService>,
}

impl VideoService {
    pub fn new(ctx: ServiceContext, workflow: Arc<WorkflowEngine>, teams: Arc<TeamService>) -> Self {
        Self {
            ctx,
            workflow,
            teams,
        }
    }

    // -----------------------------------------------------------------------
    // Videos
    // -----------------------------------------------------------------------

    /// Create a video from its first URL, optionally straight into a team.
    pub async fn create_video(
        &self,
        actor: Option<DbId>,
        input: CreateVideo,
    ) -> PipelineResult<VideoDetails> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self.create_in(tx.as_mut(), actor, input, &mut outbox).await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn create_in(
        &self,
        tx: &mut dyn StoreTx,
        actor: Option<DbId>,
        input: CreateVideo,
        outbox: &mut Outbox,
    ) -> PipelineResult<VideoDetails> {
        let url = validate_video_url(&input.url)?;
        if let Some(existing) = tx.find_video_url(&url).await? {
            return Err(CoreError::Validation(format!(
                "video-exists: {url} belongs to video {}",
                existing.video_id
            ))
            .into());
        }
        validate_duration(input.duration_ms)?;
        let primary_audio_language_code = match input.primary_audio_language_code.as_deref() {
            Some(lc) if !lc.is_empty() => Some(validate_language_code(lc)?),
            _ => None,
        };

        let video = tx
            .insert_video(&NewVideo {
                id: generate_video_id(),
                primary_audio_language_code,
                title: input.title,
                description: input.description,
                duration_ms: input.duration_ms,
                thumbnail: input.thumbnail,
                metadata: input.metadata.unwrap_or_else(|| Value::Object(Default::default())),
            })
            .await?;
        tx.insert_video_url(&NewVideoUrl {
            video_id: video.id.clone(),
            url,
            is_primary: true,
            original: true,
            added_by_id: actor,
        })
        .await?;

        match input.team.as_deref() {
            Some(slug) => {
                let team = load_team(tx, slug).await?;
                let project_id = match input.project.as_deref() {
                    Some(p) => Some(load_project(tx, team.id, p).await?.id),
                    None => None,
                };
                self.teams
                    .attach_video(tx, &team, &video.id, project_id, actor, outbox)
                    .await?;
            }
            None if input.project.is_some() => {
                return Err(
                    CoreError::Validation("unknown-project: no team given".to_string()).into(),
                );
            }
            None => {}
        }

        tracing::info!(video_id = %video.id, user_id = ?actor, "Video created");
        self.details_in(tx, &video.id, actor).await
    }

    pub async fn get_video(&self, video_id: &str, actor: Option<DbId>) -> PipelineResult<VideoDetails> {
        let mut tx = self.ctx.begin().await?;
        let result = self.details_in(tx.as_mut(), video_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn details_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<VideoDetails> {
        let video = load_video(tx, video_id).await?;
        let team_video = tx.get_team_video_by_video(video_id).await?;
        let (team, project) = match &team_video {
            Some(tv) => {
                let team = tx.get_team(tv.team_id).await?.map(|t| t.slug);
                let project = match tv.project_id {
                    Some(id) => tx.get_project(id).await?.map(|p| p.slug),
                    None => None,
                };
                (team, project)
            }
            None => (None, None),
        };
        let languages = Self::languages_in(tx, &video, team_video.as_ref(), actor).await?;
        let all_urls = tx
            .list_video_urls(video_id)
            .await?
            .into_iter()
            .map(|u| u.url)
            .collect();
        Ok(VideoDetails {
            video,
            team,
            project,
            languages,
            all_urls,
        })
    }

    pub async fn update_video(
        &self,
        video_id: &str,
        actor: Option<DbId>,
        update: UpdateVideo,
    ) -> PipelineResult<VideoDetails> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .update_in(tx.as_mut(), video_id, actor, update, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn update_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        actor: Option<DbId>,
        mut update: UpdateVideo,
        outbox: &mut Outbox,
    ) -> PipelineResult<VideoDetails> {
        let mut video = tx
            .get_video_for_update(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        require_video_edit(tx, video_id, actor).await?;
        validate_duration(update.duration_ms)?;
        if let Some(lc) = update.primary_audio_language_code.as_deref() {
            if !lc.is_empty() {
                update.primary_audio_language_code = Some(validate_language_code(lc)?);
            }
        }
        update.apply(&mut video);
        tx.update_video(&video).await?;
        outbox.event(DomainEvent::new(VIDEO_CACHE_INVALIDATED).with_video(video_id));
        tracing::info!(video_id, user_id = ?actor, "Video updated");
        self.details_in(tx, video_id, actor).await
    }

    // -----------------------------------------------------------------------
    // URLs
    // -----------------------------------------------------------------------

    pub async fn list_urls(&self, video_id: &str) -> PipelineResult<Vec<VideoUrl>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_urls_in(tx.as_mut(), video_id).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_urls_in(tx: &mut dyn StoreTx, video_id: &str) -> PipelineResult<Vec<VideoUrl>> {
        load_video(tx, video_id).await?;
        Ok(tx.list_video_urls(video_id).await?)
    }

    /// Add a secondary URL, or a new primary one when `primary` is set.
    pub async fn add_url(
        &self,
        video_id: &str,
        actor: Option<DbId>,
        url: &str,
        primary: bool,
    ) -> PipelineResult<VideoUrl> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = Self::add_url_in(tx.as_mut(), video_id, actor, url, primary, &mut outbox).await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn add_url_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        actor: Option<DbId>,
        url: &str,
        primary: bool,
        outbox: &mut Outbox,
    ) -> PipelineResult<VideoUrl> {
        load_video(tx, video_id).await?;
        require_video_edit(tx, video_id, actor).await?;
        let url = validate_video_url(url)?;
        if let Some(existing) = tx.find_video_url(&url).await? {
            return Err(CoreError::Validation(format!(
                "video-exists: {url} belongs to video {}",
                existing.video_id
            ))
            .into());
        }
        let existing = tx.list_video_urls(video_id).await?.len();
        let is_primary = new_url_is_primary(existing, primary);
        let mut added = tx
            .insert_video_url(&NewVideoUrl {
                video_id: video_id.to_string(),
                url,
                is_primary: false,
                original: existing == 0,
                added_by_id: actor,
            })
            .await?;
        if is_primary {
            tx.set_primary_url(video_id, added.id).await?;
            added.is_primary = true;
        }
        outbox.event(DomainEvent::new(VIDEO_CACHE_INVALIDATED).with_video(video_id));
        Ok(added)
    }

    /// Promote `url_id`, demoting the previous primary URL.
    pub async fn make_primary(
        &self,
        video_id: &str,
        url_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<VideoUrl> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::make_primary_in(tx.as_mut(), video_id, url_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn make_primary_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        url_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<VideoUrl> {
        require_video_edit(tx, video_id, actor).await?;
        let mut url = load_url(tx, video_id, url_id).await?;
        tx.set_primary_url(video_id, url_id).await?;
        url.is_primary = true;
        Ok(url)
    }

    pub async fn delete_url(
        &self,
        video_id: &str,
        url_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::delete_url_in(tx.as_mut(), video_id, url_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn delete_url_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        url_id: DbId,
        actor: Option<DbId>,
    ) -> PipelineResult<()> {
        require_video_edit(tx, video_id, actor).await?;
        let url = load_url(tx, video_id, url_id).await?;
        ensure_url_deletable(url.is_primary)?;
        tx.delete_video_url(url_id).await?;
        tracing::info!(video_id, url_id, user_id = ?actor, "Video URL deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Languages
    // -----------------------------------------------------------------------

    pub async fn list_languages(
        &self,
        video_id: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<LanguageSummary>> {
        let mut tx = self.ctx.begin().await?;
        let result = self.list_languages_in(tx.as_mut(), video_id, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_languages_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<LanguageSummary>> {
        let video = load_video(tx, video_id).await?;
        let team_video = tx.get_team_video_by_video(video_id).await?;
        Self::languages_in(tx, &video, team_video.as_ref(), actor).await
    }

    async fn languages_in(
        tx: &mut dyn StoreTx,
        video: &Video,
        team_video: Option<&TeamVideo>,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<LanguageSummary>> {
        let viewer = viewer_for(tx, team_video, actor).await?;
        let readable = match team_video {
            Some(tv) if !viewer.is_member => {
                Some(LanguagePreferenceService::sets_in(tx, tv.team_id).await?)
            }
            _ => None,
        };

        let mut summaries = Vec::new();
        for language in tx.list_languages(&video.id).await? {
            if readable
                .as_ref()
                .is_some_and(|sets| !sets.can_read(&language.language_code))
            {
                continue;
            }
            let versions = tx.list_versions(language.id).await?;
            summaries.push(summarize(video, language, &versions, &viewer));
        }
        Ok(summaries)
    }

    /// Create an empty language track.
    pub async fn create_language(
        &self,
        video_id: &str,
        actor: Option<DbId>,
        language_code: &str,
        subtitles_complete: bool,
    ) -> PipelineResult<SubtitleLanguage> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::create_language_in(
            tx.as_mut(),
            video_id,
            actor,
            language_code,
            subtitles_complete,
        )
        .await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn create_language_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        actor: Option<DbId>,
        language_code: &str,
        subtitles_complete: bool,
    ) -> PipelineResult<SubtitleLanguage> {
        let language_code = validate_language_code(language_code)?;
        load_video(tx, video_id).await?;
        if let Some(tv) = tx.get_team_video_by_video(video_id).await? {
            let team = tx
                .get_team(tv.team_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Team", tv.team_id))?;
            LanguagePreferenceService::ensure_writable(tx, team.id, &language_code).await?;
            let membership = PermissionService::membership(tx, team.id, actor).await?;
            let target = PermissionTarget::language(tv.project_id, language_code.as_str());
            PermissionService::check_subtitle_edit(&team, membership.as_ref(), &target, false)?;
        }
        let mut language = tx.insert_language(video_id, &language_code, None).await?;
        if subtitles_complete {
            language.subtitles_complete = true;
            language = tx.update_language(&language).await?;
        }
        tracing::info!(video_id, language = %language_code, user_id = ?actor, "Language created");
        Ok(language)
    }

    /// Break a translation's timing tie to its source. Open tasks on the
    /// language are left alone.
    pub async fn fork_language(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<SubtitleLanguage> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = Self::fork_in(tx.as_mut(), video_id, language_code, actor, &mut outbox).await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn fork_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<SubtitleLanguage> {
        let mut language = tx
            .get_language_for_update(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        if let Some(tv) = tx.get_team_video_by_video(video_id).await? {
            let team = tx
                .get_team(tv.team_id)
                .await?
                .ok_or_else(|| CoreError::not_found("Team", tv.team_id))?;
            let membership = PermissionService::membership(tx, team.id, actor).await?;
            let target = PermissionTarget::language(tv.project_id, language_code);
            PermissionService::check_subtitle_edit(&team, membership.as_ref(), &target, true)?;
        }
        if language.is_forked {
            return Ok(language);
        }
        language.is_forked = true;
        language.standard_language_code = None;
        let language = tx.update_language(&language).await?;
        outbox.event(
            DomainEvent::new(VIDEO_CACHE_INVALIDATED)
                .with_video(video_id)
                .with_language(language_code),
        );
        tracing::info!(video_id, language = language_code, user_id = ?actor, "Language forked");
        Ok(language)
    }

    /// Advisory staleness of a translation against its source's tip.
    /// `None` for languages without a source.
    pub async fn translation_status(
        &self,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Option<TranslationStatus>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::translation_status_in(tx.as_mut(), video_id, language_code).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn translation_status_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Option<TranslationStatus>> {
        let language = tx
            .get_language(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let Some(source_code) = language.source_language() else {
            return Ok(None);
        };
        let versions = tx.list_versions(language.id).await?;
        let Some(own_tip) = tip(&versions) else {
            return Ok(None);
        };
        let source_tip = match tx.get_language(video_id, source_code).await? {
            Some(source) => tip(&tx.list_versions(source.id).await?).map(|v| v.version_number),
            None => None,
        };
        Ok(source_tip.and_then(|n| {
            TranslationStatus::evaluate(language_code, &own_tip.lineage.0, source_code, n)
        }))
    }

    // -----------------------------------------------------------------------
    // Versions
    // -----------------------------------------------------------------------

    /// One version of a language. Without `version_number`, team members
    /// get the tip and everyone else the public tip.
    pub async fn get_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
        version_number: Option<i32>,
        actor: Option<DbId>,
    ) -> PipelineResult<SubtitleVersion> {
        let mut tx = self.ctx.begin().await?;
        let result =
            Self::get_subtitles_in(tx.as_mut(), video_id, language_code, version_number, actor)
                .await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn get_subtitles_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        version_number: Option<i32>,
        actor: Option<DbId>,
    ) -> PipelineResult<SubtitleVersion> {
        let versions = visible_versions(tx, video_id, language_code, actor).await?;
        let found = match version_number {
            Some(n) => versions.iter().find(|v| v.version_number == n),
            None => tip(&versions),
        };
        Ok(found.cloned().ok_or_else(|| match version_number {
            Some(n) => CoreError::not_found("SubtitleVersion", format!("{language_code}#{n}")),
            None => CoreError::not_found("SubtitleVersion", language_code),
        })?)
    }

    /// Versions of a language the caller may see, newest first.
    pub async fn list_versions(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<SubtitleVersion>> {
        let mut tx = self.ctx.begin().await?;
        let result = visible_versions(tx.as_mut(), video_id, language_code, actor)
            .await
            .map(|mut v| {
                v.reverse();
                v
            });
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    /// Item-level diff between two visible versions of a language.
    pub async fn diff_versions(
        &self,
        video_id: &str,
        language_code: &str,
        from: i32,
        to: i32,
        actor: Option<DbId>,
    ) -> PipelineResult<SubtitleDiff> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::diff_in(tx.as_mut(), video_id, language_code, from, to, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn diff_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        from: i32,
        to: i32,
        actor: Option<DbId>,
    ) -> PipelineResult<SubtitleDiff> {
        let versions = visible_versions(tx, video_id, language_code, actor).await?;
        let find = |n: i32| {
            versions
                .iter()
                .find(|v| v.version_number == n)
                .ok_or_else(|| CoreError::Validation(format!("invalid version number: {n}")))
        };
        Ok(diff(find(from)?.subtitle_set(), find(to)?.subtitle_set()))
    }

    // -----------------------------------------------------------------------
    // Notes and actions
    // -----------------------------------------------------------------------

    pub async fn list_notes(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<SubtitleNote>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_notes_in(tx.as_mut(), video_id, language_code, actor).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_notes_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<SubtitleNote>> {
        load_video(tx, video_id).await?;
        if let Some(tv) = tx.get_team_video_by_video(video_id).await? {
            PermissionService::require_member(tx, tv.team_id, actor).await?;
        }
        Ok(tx.list_notes(video_id, language_code).await?)
    }

    pub async fn add_note(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
        body: &str,
    ) -> PipelineResult<SubtitleNote> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::add_note_in(tx.as_mut(), video_id, language_code, actor, body).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn add_note_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
        body: &str,
    ) -> PipelineResult<SubtitleNote> {
        if actor.is_none() {
            return Err(CoreError::Unauthorized("Sign in to leave notes".to_string()).into());
        }
        if body.trim().is_empty() {
            return Err(CoreError::Validation("Note body cannot be empty".to_string()).into());
        }
        let language_code = validate_language_code(language_code)?;
        load_video(tx, video_id).await?;
        if let Some(tv) = tx.get_team_video_by_video(video_id).await? {
            PermissionService::require_member(tx, tv.team_id, actor).await?;
        }
        Ok(tx
            .insert_note(video_id, &language_code, actor, body.trim())
            .await?)
    }

    /// Actions the caller may attach to a new submission on this language.
    pub async fn available_actions(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<WorkflowAction>> {
        let mut tx = self.ctx.begin().await?;
        let result = self
            .available_actions_in(tx.as_mut(), video_id, language_code, actor)
            .await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn available_actions_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
    ) -> PipelineResult<Vec<WorkflowAction>> {
        load_video(tx, video_id).await?;
        let scope = self.workflow.scope_for_video(tx, video_id).await?;
        self.workflow
            .available_actions(tx, scope.as_ref(), language_code, actor)
            .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_video(tx: &mut dyn StoreTx, video_id: &str) -> PipelineResult<Video> {
    Ok(tx
        .get_video(video_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Video", video_id))?)
}

async fn load_url(tx: &mut dyn StoreTx, video_id: &str, url_id: DbId) -> PipelineResult<VideoUrl> {
    Ok(tx
        .get_video_url(url_id)
        .await?
        .filter(|u| u.video_id == video_id)
        .ok_or_else(|| CoreError::not_found("VideoUrl", url_id))?)
}

/// Team videos need the edit-video permission; others are open.
async fn require_video_edit(
    tx: &mut dyn StoreTx,
    video_id: &str,
    actor: Option<DbId>,
) -> PipelineResult<()> {
    match tx.get_team_video_by_video(video_id).await? {
        Some(tv) => {
            PermissionService::require(
                tx,
                tv.team_id,
                actor,
                Permission::EditVideo,
                &PermissionTarget::project(tv.project_id),
            )
            .await?;
            Ok(())
        }
        None if actor.is_none() => {
            Err(CoreError::Unauthorized("Sign in to edit videos".to_string()).into())
        }
        None => Ok(()),
    }
}

async fn viewer_for(
    tx: &mut dyn StoreTx,
    team_video: Option<&TeamVideo>,
    actor: Option<DbId>,
) -> PipelineResult<Viewer> {
    let is_member = match team_video {
        Some(tv) => PermissionService::membership(tx, tv.team_id, actor)
            .await?
            .is_some(),
        None => false,
    };
    Ok(Viewer { actor, is_member })
}

/// Versions of one language the caller may see, oldest first.
async fn visible_versions(
    tx: &mut dyn StoreTx,
    video_id: &str,
    language_code: &str,
    actor: Option<DbId>,
) -> PipelineResult<Vec<SubtitleVersion>> {
    let language = tx
        .get_language(video_id, language_code)
        .await?
        .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
    let team_video = tx.get_team_video_by_video(video_id).await?;
    let viewer = viewer_for(tx, team_video.as_ref(), actor).await?;
    Ok(tx
        .list_versions(language.id)
        .await?
        .into_iter()
        .filter(|v| viewer.can_see(v))
        .collect())
}

fn summarize(
    video: &Video,
    language: SubtitleLanguage,
    versions: &[SubtitleVersion],
    viewer: &Viewer,
) -> LanguageSummary {
    let shown: Vec<VersionSummary> = versions
        .iter()
        .rev()
        .filter(|v| viewer.can_see(v))
        .map(VersionSummary::of)
        .collect();
    // Outsiders see counts of the public tip, not of a pending draft.
    let subtitle_count = if viewer.is_member {
        language.subtitle_count
    } else {
        public_tip(versions).map_or(0, |v| v.subtitle_count)
    };
    LanguageSummary {
        is_primary_audio_language: video.primary_audio_language_code.as_deref()
            == Some(language.language_code.as_str()),
        language_code: language.language_code,
        subtitles_complete: language.subtitles_complete,
        is_forked: language.is_forked,
        standard_language_code: language.standard_language_code,
        subtitle_count,
        percent_done: language.percent_done,
        official_signoff_count: language.official_signoff_count,
        versions: shown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sqlx::types::Json;
    use subhub_core::lineage::Lineage;
    use subhub_core::subtitles::SubtitleSet;

    fn version(n: i32, author: Option<DbId>, visibility: Visibility) -> SubtitleVersion {
        SubtitleVersion {
            id: n as DbId,
            video_id: "abcdefghijkl".into(),
            subtitle_language_id: 1,
            language_code: "en".into(),
            version_number: n,
            author_id: author,
            title: String::new(),
            description: String::new(),
            metadata: Json(Value::Null),
            subtitles: Json(SubtitleSet::new()),
            subtitle_count: 0,
            visibility: visibility.as_str().to_string(),
            visibility_override: None,
            rollback_of_version_number: None,
            parents: Json(Vec::new()),
            lineage: Json(Lineage::new()),
            origin: "api".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn private_versions_visible_to_members_and_authors_only() {
        let private = version(2, Some(7), Visibility::Private);
        let outsider = Viewer { actor: Some(9), is_member: false };
        let author = Viewer { actor: Some(7), is_member: false };
        let member = Viewer { actor: Some(9), is_member: true };
        let anonymous = Viewer { actor: None, is_member: false };

        assert!(!outsider.can_see(&private));
        assert!(author.can_see(&private));
        assert!(member.can_see(&private));
        assert!(!anonymous.can_see(&private));
        assert!(anonymous.can_see(&version(1, None, Visibility::Public)));
    }
}
