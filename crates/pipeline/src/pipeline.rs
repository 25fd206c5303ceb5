//! The single mutating entry point for subtitle versions.
//!
//! [`Pipeline::add_subtitles`] and [`Pipeline::rollback_to`] each run in one
//! transaction: the language row is locked, the version number is derived
//! from the tip under that lock, and workflow, metadata and publication
//! follow-ups happen before commit. Signals leave through the outbox only
//! after the commit succeeds.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use subhub_core::error::CoreError;
use subhub_core::languages::validate_language_code;
use subhub_core::lineage::Lineage;
use subhub_core::permissions::Permission;
use subhub_core::subtitles::SubtitleSet;
use subhub_core::types::DbId;
use subhub_core::version_graph::{
    ancestors, merge_parents, next_version_number, validate_parent, ParentRef, ParentSpec,
};
use subhub_core::visibility::{any_public, tip, ModerationStatus, VersionVisibility, Visibility};
use subhub_core::workflow::WorkflowAction;
use subhub_db::models::language::SubtitleLanguage;
use subhub_db::models::version::{NewVersion, SubtitleVersion};
use subhub_db::models::video::Video;
use subhub_db::StoreTx;
use subhub_events::bus::{SUBTITLES_ADDED, SUBTITLES_ROLLED_BACK};
use subhub_events::{DomainEvent, Outbox};

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::external_sync::enqueue_sync;
use crate::language_prefs::LanguagePreferenceService;
use crate::metadata::MetadataUpdater;
use crate::permissions::PermissionService;
use crate::workflow::{Submission, TeamScope, WorkflowEngine};
use crate::writelock::WriteLockManager;

pub const ORIGIN_API: &str = "api";
pub const ORIGIN_ROLLBACK: &str = "rollback";
pub const ORIGIN_EDITOR: &str = "editor";

/// Optional inputs to [`Pipeline::add_subtitles`].
#[derive(Debug, Clone, Default)]
pub struct AddSubtitlesOptions {
    /// Defaults to the previous tip's title.
    pub title: Option<String>,
    /// Defaults to the previous tip's description.
    pub description: Option<String>,
    pub metadata: Option<Value>,
    pub author: Option<DbId>,
    /// Defaults to public; moderated teams force private.
    pub visibility: Option<Visibility>,
    pub visibility_override: Option<Visibility>,
    pub parents: Vec<ParentSpec>,
    pub complete: Option<bool>,
    /// Supersedes `complete`.
    pub action: Option<WorkflowAction>,
    pub origin: Option<String>,
}

/// Fully resolved inputs for one appended version.
struct VersionDraft<'a> {
    subtitles: &'a SubtitleSet,
    title: String,
    description: String,
    metadata: Value,
    author: Option<DbId>,
    visibility: Visibility,
    visibility_override: Option<Visibility>,
    explicit_parents: &'a [SubtitleVersion],
    rollback_of: Option<i32>,
    origin: String,
}

pub struct Pipeline {
    ctx: ServiceContext,
    workflow: Arc<WorkflowEngine>,
}

impl Pipeline {
    pub fn new(ctx: ServiceContext, workflow: Arc<WorkflowEngine>) -> Self {
        Self { ctx, workflow }
    }

    /// Append a version to `(video_id, language_code)`, creating the
    /// language when needed.
    ///
    /// A lost race on the version number is retried up to
    /// `integrity_retries` times; after that it surfaces as a conflict.
    pub async fn add_subtitles(
        &self,
        video_id: &str,
        language_code: &str,
        subtitles: SubtitleSet,
        options: AddSubtitlesOptions,
    ) -> PipelineResult<SubtitleVersion> {
        let mut attempt = 0;
        loop {
            let mut tx = self.ctx.begin().await?;
            let mut outbox = Outbox::new();
            let result = self
                .unsafe_add_subtitles(
                    tx.as_mut(),
                    video_id,
                    language_code,
                    &subtitles,
                    &options,
                    &mut outbox,
                )
                .await;
            match self.ctx.finish(tx, outbox, result).await {
                Err(e) if e.is_version_conflict() && attempt < self.ctx.config.integrity_retries => {
                    attempt += 1;
                    tracing::warn!(
                        video_id,
                        language = language_code,
                        attempt,
                        "Version number taken concurrently, retrying",
                    );
                }
                other => return other,
            }
        }
    }

    /// [`Pipeline::add_subtitles`] inside a caller-owned transaction.
    ///
    /// Nothing is committed or retried here; signals are appended to
    /// `outbox` for the caller to release.
    pub async fn unsafe_add_subtitles(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        subtitles: &SubtitleSet,
        options: &AddSubtitlesOptions,
        outbox: &mut Outbox,
    ) -> PipelineResult<SubtitleVersion> {
        let language_code = validate_language_code(language_code)?;
        let lc = language_code.as_str();
        let video = tx
            .get_video_for_update(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        let scope = self.workflow.scope_for_video(tx, video_id).await?;

        let explicit = resolve_parents(tx, video_id, &options.parents).await?;
        let source = foreign_parent_language(&explicit, lc);
        let mut language = match tx.get_language_for_update(video_id, lc).await? {
            Some(language) => language,
            None => tx.insert_language(video_id, lc, source).await?,
        };
        let versions = tx.list_versions(language.id).await?;
        // A language created empty (by a write-lock or an explicit create)
        // learns its source from its first translated version.
        if versions.is_empty() && !language.is_forked && language.standard_language_code.is_none() {
            if let Some(source) = source {
                language.standard_language_code = Some(source.to_string());
                language = tx.update_language(&language).await?;
            }
        }

        if let Some(scope) = &scope {
            check_team_edit(tx, scope, &video, &language, options.author).await?;
        }
        if options.action.is_some() {
            WriteLockManager::ensure_editable(tx, &language, options.author, self.ctx.now())
                .await?;
        }

        let previous = tip(&versions);
        let (mut visibility, mut visibility_override) = (
            options.visibility.unwrap_or(Visibility::Public),
            options.visibility_override,
        );
        let moderated = scope
            .as_ref()
            .is_some_and(|s| s.settings.requires_moderation());
        if moderated && options.action != Some(WorkflowAction::Publish) {
            let (v, o) = ModerationStatus::WaitingModeration.version_flags();
            visibility = v;
            visibility_override = o;
        }

        let draft = VersionDraft {
            subtitles,
            title: options
                .title
                .clone()
                .or_else(|| previous.map(|v| v.title.clone()))
                .unwrap_or_default(),
            description: options
                .description
                .clone()
                .or_else(|| previous.map(|v| v.description.clone()))
                .unwrap_or_default(),
            metadata: options.metadata.clone().unwrap_or_else(|| json!({})),
            author: options.author,
            visibility,
            visibility_override,
            explicit_parents: &explicit,
            rollback_of: None,
            origin: options.origin.clone().unwrap_or_else(|| ORIGIN_API.to_string()),
        };
        let version = append_version(tx, &language, &versions, draft).await?;

        let complete = options
            .action
            .and_then(WorkflowAction::subtitles_complete)
            .or(options.complete);
        if let Some(complete) = complete {
            if language.subtitles_complete != complete {
                language.subtitles_complete = complete;
                language = tx.update_language(&language).await?;
            }
        }

        if let Some(action) = options.action {
            let submission = Submission {
                language: &language,
                version: &version,
                actor: options.author,
                action,
            };
            self.workflow
                .handle_action(tx, scope.as_ref(), submission, outbox)
                .await?;
        }

        self.finish_append(tx, &version, SUBTITLES_ADDED, options.author, outbox)
            .await
    }

    /// Create a new version copying `version_number`'s payload, title and
    /// description. The result is public iff any version of the language
    /// already is.
    pub async fn rollback_to(
        &self,
        video_id: &str,
        language_code: &str,
        version_number: i32,
        author: Option<DbId>,
    ) -> PipelineResult<SubtitleVersion> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .rollback_in(tx.as_mut(), video_id, language_code, version_number, author, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn rollback_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        version_number: i32,
        author: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<SubtitleVersion> {
        if tx.get_video_for_update(video_id).await?.is_none() {
            return Err(CoreError::not_found("Video", video_id).into());
        }
        if let Some(scope) = self.workflow.scope_for_video(tx, video_id).await? {
            PermissionService::require(
                tx,
                scope.team.id,
                author,
                Permission::RollbackSubtitles,
                &scope.target(language_code),
            )
            .await?;
        }
        let language = tx
            .get_language_for_update(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let versions = tx.list_versions(language.id).await?;
        let target = versions
            .iter()
            .find(|v| v.version_number == version_number)
            .ok_or_else(|| {
                CoreError::Validation(format!("invalid version number: {version_number}"))
            })?;

        let visibility = if any_public(&versions) {
            Visibility::Public
        } else {
            Visibility::Private
        };
        let draft = VersionDraft {
            subtitles: target.subtitle_set(),
            title: target.title.clone(),
            description: target.description.clone(),
            metadata: target.metadata.0.clone(),
            author,
            visibility,
            visibility_override: None,
            explicit_parents: &[],
            rollback_of: Some(version_number),
            origin: ORIGIN_ROLLBACK.to_string(),
        };
        let version = append_version(tx, &language, &versions, draft).await?;
        self.finish_append(tx, &version, SUBTITLES_ROLLED_BACK, author, outbox)
            .await
    }

    /// Run a workflow action against the current tip without adding a
    /// version.
    pub async fn perform_action(
        &self,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
        action: WorkflowAction,
    ) -> PipelineResult<SubtitleVersion> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = self
            .perform_action_in(tx.as_mut(), video_id, language_code, actor, action, &mut outbox)
            .await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn perform_action_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        actor: Option<DbId>,
        action: WorkflowAction,
        outbox: &mut Outbox,
    ) -> PipelineResult<SubtitleVersion> {
        let mut language = tx
            .get_language_for_update(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let versions = tx.list_versions(language.id).await?;
        let version = tip(&versions).cloned().ok_or_else(|| {
            CoreError::ActionError(format!("'{language_code}' has no versions to act on"))
        })?;
        WriteLockManager::ensure_editable(tx, &language, actor, self.ctx.now()).await?;

        if let Some(complete) = action.subtitles_complete() {
            if language.subtitles_complete != complete {
                language.subtitles_complete = complete;
                language = tx.update_language(&language).await?;
            }
        }
        let scope = self.workflow.scope_for_video(tx, video_id).await?;
        let submission = Submission {
            language: &language,
            version: &version,
            actor,
            action,
        };
        self.workflow
            .handle_action(tx, scope.as_ref(), submission, outbox)
            .await?;

        MetadataUpdater::refresh_language(tx, video_id, language_code).await?;
        MetadataUpdater::refresh_video(tx, video_id, self.ctx.now(), outbox).await?;
        tracing::info!(
            video_id,
            language = language_code,
            action = %action,
            version = version.version_number,
            "Workflow action performed",
        );
        Ok(tx
            .get_version(version.id)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleVersion", version.id))?)
    }

    /// Every version reachable from `(language_code, version_number)`
    /// through parent edges.
    pub async fn ancestors(
        &self,
        video_id: &str,
        language_code: &str,
        version_number: i32,
    ) -> PipelineResult<Vec<ParentRef>> {
        let mut tx = self.ctx.begin().await?;
        let result = tx.list_video_versions(video_id).await.map_err(Into::into);
        let versions = self.ctx.finish(tx, Outbox::new(), result).await?;

        let graph: BTreeMap<ParentRef, Vec<ParentRef>> = versions
            .iter()
            .map(|v| (v.parent_ref(), v.parents.0.clone()))
            .collect();
        let start = ParentRef::new(language_code, version_number);
        if !graph.contains_key(&start) {
            return Err(CoreError::not_found("SubtitleVersion", &start).into());
        }
        Ok(ancestors(&start, |r| graph.get(r).cloned()).into_iter().collect())
    }

    /// Metadata refresh, signals and logging shared by every append.
    async fn finish_append(
        &self,
        tx: &mut dyn StoreTx,
        version: &SubtitleVersion,
        event: &str,
        actor: Option<DbId>,
        outbox: &mut Outbox,
    ) -> PipelineResult<SubtitleVersion> {
        let video_id = version.video_id.as_str();
        let lc = version.language_code.as_str();
        MetadataUpdater::refresh_language(tx, video_id, lc).await?;
        MetadataUpdater::refresh_video(tx, video_id, self.ctx.now(), outbox).await?;

        // Workflow effects may have changed the flags since insert.
        let version = tx
            .get_version(version.id)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleVersion", version.id))?;
        outbox.event(
            DomainEvent::new(event)
                .with_video(video_id)
                .with_language(lc)
                .with_actor(actor)
                .with_payload(json!({
                    "version_number": version.version_number,
                    "visibility": version.effective_visibility(),
                    "rollback_of_version_number": version.rollback_of_version_number,
                })),
        );
        if version.is_public() {
            enqueue_sync(outbox, video_id, lc);
        }
        tracing::info!(
            video_id,
            language = lc,
            version = version.version_number,
            visibility = %version.effective_visibility(),
            origin = %version.origin,
            "Subtitles added",
        );
        Ok(version)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Insert the next version of `language`, with the previous tip as an
/// implicit parent.
async fn append_version(
    tx: &mut dyn StoreTx,
    language: &SubtitleLanguage,
    versions: &[SubtitleVersion],
    draft: VersionDraft<'_>,
) -> PipelineResult<SubtitleVersion> {
    let previous = tip(versions);
    let next = next_version_number(previous.map(|v| v.version_number));

    for parent in draft.explicit_parents {
        validate_parent(&parent.parent_ref(), &language.language_code, next)?;
    }
    let parents = merge_parents(
        previous.map(SubtitleVersion::parent_ref),
        draft.explicit_parents.iter().map(SubtitleVersion::parent_ref).collect(),
    );
    let lineage = Lineage::from_parents(
        previous
            .into_iter()
            .chain(draft.explicit_parents)
            .map(SubtitleVersion::parent_lineage),
    );

    Ok(tx
        .insert_version(&NewVersion {
            video_id: language.video_id.clone(),
            subtitle_language_id: language.id,
            language_code: language.language_code.clone(),
            version_number: next,
            author_id: draft.author,
            title: draft.title,
            description: draft.description,
            metadata: draft.metadata,
            subtitles: draft.subtitles.clone(),
            visibility: draft.visibility,
            visibility_override: draft.visibility_override,
            rollback_of_version_number: draft.rollback_of,
            parents,
            lineage,
            origin: draft.origin,
        })
        .await?)
}

/// Resolve caller-supplied parents against `video_id`.
async fn resolve_parents(
    tx: &mut dyn StoreTx,
    video_id: &str,
    specs: &[ParentSpec],
) -> PipelineResult<Vec<SubtitleVersion>> {
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let found = match spec {
            ParentSpec::Version {
                id,
                video_id: parent_video,
                ..
            } => {
                if parent_video != video_id {
                    return Err(CoreError::VersionNotInVideo(format!(
                        "version {id} belongs to video {parent_video}"
                    ))
                    .into());
                }
                tx.get_version(*id).await?
            }
            ParentSpec::Id(id) => tx.get_version(*id).await?,
            ParentSpec::Ref(r) => {
                tx.get_version_by_number(video_id, &r.language_code, r.version_number)
                    .await?
            }
        };
        match found {
            Some(version) if version.video_id == video_id => out.push(version),
            _ => {
                return Err(CoreError::VersionNotInVideo(format!(
                    "parent {spec:?} is not a version of video {video_id}"
                ))
                .into())
            }
        }
    }
    Ok(out)
}

/// Language of the first explicit parent outside `language_code`.
fn foreign_parent_language<'a>(parents: &'a [SubtitleVersion], language_code: &str) -> Option<&'a str> {
    parents
        .iter()
        .map(|p| p.language_code.as_str())
        .find(|parent_lc| *parent_lc != language_code)
}

/// Team checks for writing to a language: the team must accept the
/// language and the actor must pass the subtitle or translation policy.
async fn check_team_edit(
    tx: &mut dyn StoreTx,
    scope: &TeamScope,
    video: &Video,
    language: &SubtitleLanguage,
    author: Option<DbId>,
) -> PipelineResult<()> {
    let lc = language.language_code.as_str();
    LanguagePreferenceService::ensure_writable(tx, scope.team.id, lc).await?;
    let membership = PermissionService::membership(tx, scope.team.id, author).await?;
    let is_translation = language.source_language().is_some()
        || video
            .primary_audio_language_code
            .as_deref()
            .is_some_and(|primary| primary != lc);
    PermissionService::check_subtitle_edit(
        &scope.team,
        membership.as_ref(),
        &scope.target(lc),
        is_translation,
    )
}
