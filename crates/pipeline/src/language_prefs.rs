//! Team language preferences: preferred and blacklisted lists.

use std::collections::BTreeSet;

use serde::Serialize;
use subhub_core::error::CoreError;
use subhub_core::language_prefs::{apply_language_lists, LanguagePreference, LanguageSets};
use subhub_core::languages::{all_codes, validate_language_code};
use subhub_core::permissions::{Permission, PermissionTarget};
use subhub_core::types::DbId;
use subhub_db::StoreTx;
use subhub_events::Outbox;

use crate::context::ServiceContext;
use crate::error::PipelineResult;
use crate::permissions::PermissionService;
use crate::teams::load_team;

/// The two lists exposed over the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageLists {
    pub preferred: Vec<String>,
    pub blacklisted: Vec<String>,
}

impl LanguageLists {
    fn from_sets(sets: &LanguageSets) -> Self {
        Self {
            preferred: sets.preferred.iter().cloned().collect(),
            blacklisted: sets.blacklisted.iter().cloned().collect(),
        }
    }
}

pub struct LanguagePreferenceService {
    ctx: ServiceContext,
}

impl LanguagePreferenceService {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Stored rows for `team_id`.
    pub async fn preferences_in(
        tx: &mut dyn StoreTx,
        team_id: DbId,
    ) -> PipelineResult<Vec<LanguagePreference>> {
        Ok(tx
            .list_language_preferences(team_id)
            .await?
            .iter()
            .map(|row| row.preference())
            .collect())
    }

    /// Writable, readable, preferred and blacklisted sets for `team_id`.
    pub async fn sets_in(tx: &mut dyn StoreTx, team_id: DbId) -> PipelineResult<LanguageSets> {
        let prefs = Self::preferences_in(tx, team_id).await?;
        Ok(LanguageSets::compute(all_codes(), &prefs))
    }

    /// Refuse new versions in a language the team has closed for writing.
    pub async fn ensure_writable(
        tx: &mut dyn StoreTx,
        team_id: DbId,
        language_code: &str,
    ) -> PipelineResult<()> {
        let sets = Self::sets_in(tx, team_id).await?;
        if !sets.can_write(language_code) {
            return Err(CoreError::Validation(format!(
                "The team does not accept subtitles in '{language_code}'"
            ))
            .into());
        }
        Ok(())
    }

    pub async fn lists(&self, team_slug: &str) -> PipelineResult<LanguageLists> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::lists_in(tx.as_mut(), team_slug).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn lists_in(tx: &mut dyn StoreTx, team_slug: &str) -> PipelineResult<LanguageLists> {
        let team = load_team(tx, team_slug).await?;
        let sets = Self::sets_in(tx, team.id).await?;
        Ok(LanguageLists::from_sets(&sets))
    }

    /// Replace the preferred list, keeping the blacklist.
    pub async fn set_preferred(
        &self,
        team_slug: &str,
        actor: Option<DbId>,
        codes: Vec<String>,
    ) -> PipelineResult<LanguageLists> {
        self.replace(team_slug, actor, Some(codes), None).await
    }

    /// Replace the blacklist, keeping the preferred list.
    pub async fn set_blacklisted(
        &self,
        team_slug: &str,
        actor: Option<DbId>,
        codes: Vec<String>,
    ) -> PipelineResult<LanguageLists> {
        self.replace(team_slug, actor, None, Some(codes)).await
    }

    async fn replace(
        &self,
        team_slug: &str,
        actor: Option<DbId>,
        preferred: Option<Vec<String>>,
        blacklisted: Option<Vec<String>>,
    ) -> PipelineResult<LanguageLists> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::replace_in(tx.as_mut(), team_slug, actor, preferred, blacklisted).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn replace_in(
        tx: &mut dyn StoreTx,
        team_slug: &str,
        actor: Option<DbId>,
        preferred: Option<Vec<String>>,
        blacklisted: Option<Vec<String>>,
    ) -> PipelineResult<LanguageLists> {
        let team = load_team(tx, team_slug).await?;
        PermissionService::require(
            tx,
            team.id,
            actor,
            Permission::ManageLanguagePreferences,
            &PermissionTarget::team(),
        )
        .await?;

        let existing = Self::preferences_in(tx, team.id).await?;
        let current = LanguageSets::compute(all_codes(), &existing);
        let preferred = match preferred {
            Some(codes) => normalize_codes(codes)?,
            None => current.preferred,
        };
        let blacklisted = match blacklisted {
            Some(codes) => normalize_codes(codes)?,
            None => current.blacklisted,
        };

        let rows = apply_language_lists(&existing, &preferred, &blacklisted)?;
        tx.replace_language_preferences(team.id, &rows).await?;
        tracing::info!(
            team = %team.slug,
            preferred = preferred.len(),
            blacklisted = blacklisted.len(),
            "Language preferences updated",
        );

        let sets = LanguageSets::compute(all_codes(), &rows);
        Ok(LanguageLists::from_sets(&sets))
    }
}

fn normalize_codes(codes: Vec<String>) -> PipelineResult<BTreeSet<String>> {
    codes
        .iter()
        .map(|code| validate_language_code(code).map_err(Into::into))
        .collect()
}
