//! Denormalised counts on languages and videos.
//!
//! Refreshed inside the writing transaction after every pipeline commit.
//! Readers treat the values as advisory.

use serde_json::json;
use subhub_core::error::CoreError;
use subhub_core::metadata::{
    complete_date, languages_count, percent_done, version_flags, LanguageSummary,
};
use subhub_core::types::Timestamp;
use subhub_core::visibility::tip;
use subhub_db::models::language::SubtitleLanguage;
use subhub_db::models::video::Video;
use subhub_db::StoreTx;
use subhub_events::bus::VIDEO_CACHE_INVALIDATED;
use subhub_events::jobs::JOB_REINDEX_VIDEO;
use subhub_events::{DomainEvent, Job, Outbox};

use crate::error::PipelineResult;

pub struct MetadataUpdater;

impl MetadataUpdater {
    /// Recompute `subtitle_count`, `percent_done` and the version flags of
    /// one language from its tip.
    pub async fn refresh_language(
        tx: &mut dyn StoreTx,
        video_id: &str,
        language_code: &str,
    ) -> PipelineResult<SubtitleLanguage> {
        let mut language = tx
            .get_language(video_id, language_code)
            .await?
            .ok_or_else(|| CoreError::not_found("SubtitleLanguage", language_code))?;
        let versions = tx.list_versions(language.id).await?;
        let tip_count = tip(&versions).map_or(0, |v| v.subtitle_set().subtitle_count());

        let source_count = match language.source_language() {
            Some(source) => tx
                .get_language(video_id, source)
                .await?
                .map(|l| l.subtitle_count.max(0) as usize),
            None => None,
        };

        language.subtitle_count = tip_count as i32;
        language.percent_done = match source_count {
            Some(count) => percent_done(true, tip_count, count),
            None => percent_done(false, tip_count, 0),
        };
        let (has_version, had_version) = version_flags(tip_count > 0, language.had_version);
        language.has_version = has_version;
        language.had_version = had_version;

        Ok(tx.update_language(&language).await?)
    }

    /// Recompute `languages_count` and `complete_date` on the video,
    /// refresh translation percentages, and queue the cache signals.
    pub async fn refresh_video(
        tx: &mut dyn StoreTx,
        video_id: &str,
        now: Timestamp,
        outbox: &mut Outbox,
    ) -> PipelineResult<Video> {
        let mut video = tx
            .get_video(video_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Video", video_id))?;
        let languages = tx.list_languages(video_id).await?;

        for language in &languages {
            let Some(source) = language.source_language() else {
                continue;
            };
            let source_count = languages
                .iter()
                .find(|l| l.language_code == source)
                .map_or(0, |l| l.subtitle_count.max(0) as usize);
            let pct = percent_done(true, language.subtitle_count.max(0) as usize, source_count);
            if pct != language.percent_done {
                let mut updated = language.clone();
                updated.percent_done = pct;
                tx.update_language(&updated).await?;
            }
        }

        let summaries: Vec<LanguageSummary> = languages
            .iter()
            .map(|l| LanguageSummary {
                subtitles_complete: l.subtitles_complete,
                tip_subtitle_count: l.subtitle_count.max(0) as usize,
            })
            .collect();
        video.languages_count = languages_count(&summaries);
        video.complete_date = complete_date(video.complete_date, &summaries, now);
        let video = tx.update_video(&video).await?;

        outbox.event(DomainEvent::new(VIDEO_CACHE_INVALIDATED).with_video(video_id));
        outbox.job(Job::new(JOB_REINDEX_VIDEO, json!({ "video_id": video_id })));
        Ok(video)
    }
}
