//! Rules for pushing a language tip to an external hosting site.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::subtitles::{SubtitleFormat, SubtitleItem, SubtitleSet};

/// Default length of the credit window at the end of a video.
pub const CREDIT_WINDOW_MS: i64 = 3_000;

pub const DEFAULT_CREDIT_TEXT: &str = "Subtitles by the SubHub community";

/// Why a push is not allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncBlocked {
    NoSubtitles,
    NotFullySynced,
    TeamSyncDisabled,
    UnknownDuration,
}

impl fmt::Display for SyncBlocked {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SyncBlocked::NoSubtitles => "language has no subtitles",
            SyncBlocked::NotFullySynced => "language is not fully synced",
            SyncBlocked::TeamSyncDisabled => "owning team disables syncing",
            SyncBlocked::UnknownDuration => "video duration is unknown",
        };
        f.write_str(msg)
    }
}

/// Check the push preconditions, returning the known duration.
pub fn check_sync(
    subtitles: &SubtitleSet,
    team_sync_disabled: bool,
    duration_ms: Option<i64>,
) -> Result<i64, SyncBlocked> {
    if subtitles.subtitle_count() == 0 {
        return Err(SyncBlocked::NoSubtitles);
    }
    if !subtitles.is_fully_synced() {
        return Err(SyncBlocked::NotFullySynced);
    }
    if team_sync_disabled {
        return Err(SyncBlocked::TeamSyncDisabled);
    }
    duration_ms
        .filter(|d| *d > 0)
        .ok_or(SyncBlocked::UnknownDuration)
}

/// Append the credit line when the last subtitle ends before the video does.
///
/// The credit starts at `max(last_end, duration - window)` and ends at
/// `duration`.
pub fn append_credit(
    subtitles: &SubtitleSet,
    duration_ms: i64,
    credit_text: &str,
    window_ms: i64,
) -> SubtitleSet {
    let mut out = subtitles.clone();
    let last_end = subtitles.last_end_ms().unwrap_or(0);
    if last_end < duration_ms {
        let start = last_end.max(duration_ms - window_ms);
        out.push(SubtitleItem::timed(start, duration_ms, credit_text));
    }
    out
}

/// An outbound payload, ready for the sync adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPayload {
    pub video_id: String,
    pub language_code: String,
    pub version_number: i32,
    pub format: SubtitleFormat,
    pub body: String,
}

/// Settings for [`prepare_payload`].
#[derive(Debug, Clone)]
pub struct CreditSettings<'a> {
    pub text: &'a str,
    pub window_ms: i64,
    pub format: SubtitleFormat,
}

impl Default for CreditSettings<'_> {
    fn default() -> Self {
        Self {
            text: DEFAULT_CREDIT_TEXT,
            window_ms: CREDIT_WINDOW_MS,
            format: SubtitleFormat::Srt,
        }
    }
}

/// Re-serialise the tip with a credit appended.
pub fn prepare_payload(
    video_id: &str,
    language_code: &str,
    version_number: i32,
    subtitles: &SubtitleSet,
    duration_ms: i64,
    credit: &CreditSettings<'_>,
) -> Result<SyncPayload, CoreError> {
    let with_credit = append_credit(subtitles, duration_ms, credit.text, credit.window_ms);
    Ok(SyncPayload {
        video_id: video_id.to_string(),
        language_code: language_code.to_string(),
        version_number,
        format: credit.format,
        body: credit.format.serialize(&with_credit)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preconditions_in_order() {
        let empty = SubtitleSet::new();
        assert_eq!(check_sync(&empty, false, Some(10)), Err(SyncBlocked::NoSubtitles));

        let unsynced = SubtitleSet::from_items(vec![SubtitleItem::new(Some(0), None, "a")]);
        assert_eq!(check_sync(&unsynced, false, Some(10)), Err(SyncBlocked::NotFullySynced));

        let ok = SubtitleSet::from_timed(&[(0, 1000, "a")]);
        assert_eq!(check_sync(&ok, true, Some(10)), Err(SyncBlocked::TeamSyncDisabled));
        assert_eq!(check_sync(&ok, false, None), Err(SyncBlocked::UnknownDuration));
        assert_eq!(check_sync(&ok, false, Some(60_000)), Ok(60_000));
    }

    #[test]
    fn credit_fills_the_tail_window() {
        let set = SubtitleSet::from_timed(&[(0, 1000, "a")]);
        let out = append_credit(&set, 60_000, "thanks", CREDIT_WINDOW_MS);
        assert_eq!(out.len(), 2);
        assert_eq!(out.items()[1], SubtitleItem::timed(57_000, 60_000, "thanks"));
    }

    #[test]
    fn credit_starts_after_late_subtitles() {
        let set = SubtitleSet::from_timed(&[(0, 59_000, "a")]);
        let out = append_credit(&set, 60_000, "thanks", CREDIT_WINDOW_MS);
        assert_eq!(out.items()[1].start_ms, Some(59_000));
    }

    #[test]
    fn no_credit_when_subtitles_reach_the_end() {
        let set = SubtitleSet::from_timed(&[(0, 60_000, "a")]);
        assert_eq!(append_credit(&set, 60_000, "thanks", CREDIT_WINDOW_MS).len(), 1);
    }

    #[test]
    fn payload_is_reserialised() {
        let set = SubtitleSet::from_timed(&[(0, 1000, "a")]);
        let payload =
            prepare_payload("abc", "en", 2, &set, 10_000, &CreditSettings::default()).unwrap();
        assert!(payload.body.contains(DEFAULT_CREDIT_TEXT));
        assert!(payload.body.starts_with("1\n00:00:00,000 --> 00:00:01,000"));
    }
}
