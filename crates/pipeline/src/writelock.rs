//! Cooperative single-writer locks on languages and videos.
//!
//! Locks are advisory. Expiry is evaluated lazily against the service
//! clock on every check; nothing sweeps stale locks.

use chrono::Duration;
use serde::Serialize;
use subhub_core::error::CoreError;
use subhub_core::languages::validate_language_code;
use subhub_core::types::{DbId, Timestamp};
use subhub_core::writelock::{
    LockOwner, WriteLockState, ANONYMOUS_HOLDER, WRITELOCK_EXPIRATION_SECS,
};
use subhub_db::models::language::SubtitleLanguage;
use subhub_db::StoreTx;
use subhub_events::bus::WRITELOCK_RELEASED;
use subhub_events::{DomainEvent, Outbox};

use crate::context::ServiceContext;
use crate::error::PipelineResult;

/// A granted lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockGrant {
    pub session_key: String,
    pub locked_at: Timestamp,
    /// When the lock lapses unless refreshed.
    pub expires_at: Timestamp,
}

pub struct WriteLockManager {
    ctx: ServiceContext,
}

impl WriteLockManager {
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    // -----------------------------------------------------------------------
    // Language locks
    // -----------------------------------------------------------------------

    /// True iff nobody holds a live lock or `session_key` already holds it.
    pub async fn can_writelock(
        &self,
        video_id: &str,
        language_code: &str,
        session_key: &str,
    ) -> PipelineResult<bool> {
        let mut tx = self.ctx.begin().await?;
        let result = tx.get_language(video_id, language_code).await.map_err(Into::into);
        let language = self.ctx.finish(tx, Outbox::new(), result).await?;
        let now = self.ctx.now();
        Ok(language.map_or(true, |l| l.writelock().can_writelock(session_key, now)))
    }

    /// Take or refresh the lock on a language, creating the language row
    /// on first use.
    pub async fn writelock(
        &self,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        session_key: &str,
    ) -> PipelineResult<LockGrant> {
        let mut tx = self.ctx.begin().await?;
        let result = self
            .writelock_in(tx.as_mut(), video_id, language_code, user_id, session_key)
            .await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn writelock_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        user_id: Option<DbId>,
        session_key: &str,
    ) -> PipelineResult<LockGrant> {
        let language_code = validate_language_code(language_code)?;
        if tx.get_video(video_id).await?.is_none() {
            return Err(CoreError::not_found("Video", video_id).into());
        }
        let mut language = match tx.get_language_for_update(video_id, &language_code).await? {
            Some(language) => language,
            None => tx.insert_language(video_id, &language_code, None).await?,
        };

        let now = self.ctx.now();
        let mut state = language.writelock();
        self.acquire(tx, &mut state, user_id, session_key, now).await?;
        language.set_writelock(state);
        tx.update_language(&language).await?;

        tracing::debug!(
            video_id,
            language = %language_code,
            user_id = ?user_id,
            "Language write-lock taken",
        );
        Ok(self.grant(session_key, now))
    }

    /// Clear the lock on a language regardless of who holds it.
    pub async fn release(&self, video_id: &str, language_code: &str) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let mut outbox = Outbox::new();
        let result = Self::release_in(tx.as_mut(), video_id, language_code, &mut outbox).await;
        self.ctx.finish(tx, outbox, result).await
    }

    async fn release_in(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
        outbox: &mut Outbox,
    ) -> PipelineResult<()> {
        let mut language = tx
            .get_language_for_update(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let mut state = language.writelock();
        state.release();
        language.set_writelock(state);
        tx.update_language(&language).await?;

        outbox.event(
            DomainEvent::new(WRITELOCK_RELEASED)
                .with_video(video_id)
                .with_language(language_code),
        );
        Ok(())
    }

    /// Refuse to proceed when a live lock belongs to somebody other than
    /// `author`.
    pub async fn ensure_editable(
        tx: &mut dyn StoreTx,
        language: &SubtitleLanguage,
        author: Option<DbId>,
        now: Timestamp,
    ) -> PipelineResult<()> {
        let state = language.writelock();
        if state.held_by_other(author, now) {
            let holder = holder_name(tx, &state).await?;
            tracing::warn!(
                video_id = %language.video_id,
                language = %language.language_code,
                holder = %holder,
                "Language is locked by another editor",
            );
            return Err(CoreError::WriteLocked { holder }.into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Video locks
    // -----------------------------------------------------------------------

    pub async fn can_writelock_video(
        &self,
        video_id: &str,
        session_key: &str,
    ) -> PipelineResult<bool> {
        let mut tx = self.ctx.begin().await?;
        let result = tx.get_video(video_id).await.map_err(Into::into);
        let video = self
            .ctx
            .finish(tx, Outbox::new(), result)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        Ok(video.writelock().can_writelock(session_key, self.ctx.now()))
    }

    pub async fn writelock_video(
        &self,
        video_id: &str,
        user_id: Option<DbId>,
        session_key: &str,
    ) -> PipelineResult<LockGrant> {
        let mut tx = self.ctx.begin().await?;
        let result = self
            .writelock_video_in(tx.as_mut(), video_id, user_id, session_key)
            .await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn writelock_video_in(
        &self,
        tx: &mut dyn StoreTx,
        video_id: &str,
        user_id: Option<DbId>,
        session_key: &str,
    ) -> PipelineResult<LockGrant> {
        let mut video = tx
            .get_video_for_update(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        let now = self.ctx.now();
        let mut state = video.writelock();
        self.acquire(tx, &mut state, user_id, session_key, now).await?;
        video.set_writelock(state);
        tx.update_video(&video).await?;
        Ok(self.grant(session_key, now))
    }

    pub async fn release_video(&self, video_id: &str) -> PipelineResult<()> {
        let mut tx = self.ctx.begin().await?;
        let result = Self::release_video_in(tx.as_mut(), video_id).await;
        self.ctx.finish(tx, Outbox::new(), result).await
    }

    async fn release_video_in(tx: &mut dyn StoreTx, video_id: &str) -> PipelineResult<()> {
        let mut video = tx
            .get_video_for_update(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        let mut state = video.writelock();
        state.release();
        video.set_writelock(state);
        tx.update_video(&video).await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn acquire(
        &self,
        tx: &mut dyn StoreTx,
        state: &mut WriteLockState,
        user_id: Option<DbId>,
        session_key: &str,
        now: Timestamp,
    ) -> PipelineResult<()> {
        let holder = if state.can_writelock(session_key, now) {
            String::new()
        } else {
            holder_name(tx, state).await?
        };
        if let Err(e) = state.acquire(LockOwner::from_user(user_id), session_key, now, || holder) {
            tracing::warn!(error = %e, "Write-lock refused");
            return Err(e.into());
        }
        Ok(())
    }

    fn grant(&self, session_key: &str, now: Timestamp) -> LockGrant {
        LockGrant {
            session_key: session_key.to_string(),
            locked_at: now,
            expires_at: now + Duration::seconds(WRITELOCK_EXPIRATION_SECS),
        }
    }
}

/// Display name of whoever holds `state`.
async fn holder_name(tx: &mut dyn StoreTx, state: &WriteLockState) -> PipelineResult<String> {
    match state.owner {
        Some(LockOwner::User(id)) => Ok(tx
            .get_user(id)
            .await?
            .map_or_else(|| ANONYMOUS_HOLDER.to_string(), |u| u.username)),
        _ => Ok(ANONYMOUS_HOLDER.to_string()),
    }
}
