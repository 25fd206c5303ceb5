//! Per-language collaborators and their signoffs.

use serde::Deserialize;
use subhub_core::error::CoreError;
use subhub_core::metadata::SignoffCounts;
use subhub_core::types::{DbId, Timestamp};
use subhub_db::models::collaborator::{Collaborator, SaveCollaborator};
use subhub_db::StoreTx;
use subhub_events::Outbox;

use crate::context::ServiceContext;
use crate::error::PipelineResult;

/// A signoff as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveSignoff {
    pub user_id: DbId,
    #[serde(default)]
    pub signoff: bool,
    #[serde(default)]
    pub signoff_is_official: bool,
    #[serde(default)]
    pub expired: bool,
    pub expiration_start: Option<Timestamp>,
}

pub struct CollaboratorService {
    ctx: ServiceContext,
}

impl CollaboratorService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, video_id: &str, language_code: &str) -> PipelineResult<Vec<Collaborator>> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::list_in(tx.as_mut(), video_id, language_code).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn list_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<Vec<Collaborator>> {
        let language = tx
            .get_language(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        Ok(tx.list_collaborators(language.id).await?)
    }

    /// Upsert one collaborator and recompute the language's signoff
    /// counters in the same transaction.
    pub async fn save_collaborator(
        &self,
        video_id: &str,
        language_code: &str,
        input: SaveSignoff,
    ) -> PipelineResult<Collaborator> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::save_in(tx.as_mut(), video_id, language_code, input).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn save_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        input: SaveSignoff,
    ) -> PipelineResult<Collaborator> {
        let mut language = tx
            .get_language_for_update(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        if tx.get_user(input.user_id).await?.is_none() {
            return Err(CoreError::not_found("User", input.user_id).into());
        }

        let saved = tx
            .upsert_collaborator(&SaveCollaborator {
                subtitle_language_id: language.id,
                user_id: input.user_id,
                signoff: input.signoff,
                signoff_is_official: input.signoff_is_official,
                expired: input.expired,
                expiration_start: input.expiration_start,
            })
            .await?;

        let collaborators = tx.list_collaborators(language.id).await?;
        let counts = SignoffCounts::tally(collaborators.iter().map(Collaborator::signoff_state));
        language.set_signoff_counts(counts);
        tx.update_language(&language).await?;

        tracing::debug!(
            video_id,
            language = language_code,
            user_id = input.user_id,
            official = counts.official,
            pending = counts.pending,
            "Collaborator saved",
        );
        Ok(saved)
    }
}
