//! Denormalised counts kept on languages and videos.
//!
//! These are advisory; readers may observe values one commit behind.

use serde::Serialize;

use crate::types::Timestamp;

/// `round(100 * translated / source_count)`, capped at 100.
///
/// Originals are always complete.
pub fn percent_done(is_translation: bool, translated: usize, source_tip_count: usize) -> i32 {
    if !is_translation {
        return 100;
    }
    if source_tip_count == 0 {
        return 0;
    }
    let pct = (100.0 * translated as f64 / source_tip_count as f64).round() as i32;
    pct.min(100)
}

/// `(has_version, had_version)` after a commit.
///
/// `had_version` never falls; `has_version` follows the tip.
pub fn version_flags(tip_non_empty: bool, previously_had: bool) -> (bool, bool) {
    (tip_non_empty, previously_had || tip_non_empty)
}

/// What the video-level counts need to know about one language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageSummary {
    pub subtitles_complete: bool,
    pub tip_subtitle_count: usize,
}

impl LanguageSummary {
    pub fn has_content(&self) -> bool {
        self.tip_subtitle_count > 0
    }
}

/// Number of languages whose tip is non-empty.
pub fn languages_count(languages: &[LanguageSummary]) -> i32 {
    languages.iter().filter(|l| l.has_content()).count() as i32
}

/// Keep or stamp the completion date while some language is complete with
/// content; clear it otherwise.
pub fn complete_date(
    current: Option<Timestamp>,
    languages: &[LanguageSummary],
    now: Timestamp,
) -> Option<Timestamp> {
    let complete = languages
        .iter()
        .any(|l| l.subtitles_complete && l.has_content());
    if complete {
        Some(current.unwrap_or(now))
    } else {
        None
    }
}

/// One collaborator's signoff state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignoffState {
    pub signoff: bool,
    pub signoff_is_official: bool,
    pub expired: bool,
}

/// The five signoff counters stored on a language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SignoffCounts {
    pub official: i32,
    pub unofficial: i32,
    pub pending: i32,
    pub pending_expired: i32,
    pub pending_unexpired: i32,
}

impl SignoffCounts {
    pub fn tally(collaborators: impl IntoIterator<Item = SignoffState>) -> Self {
        let mut counts = Self::default();
        for c in collaborators {
            match (c.signoff, c.signoff_is_official) {
                (true, true) => counts.official += 1,
                (true, false) => counts.unofficial += 1,
                (false, _) => {
                    counts.pending += 1;
                    if c.expired {
                        counts.pending_expired += 1;
                    } else {
                        counts.pending_unexpired += 1;
                    }
                }
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    #[test]
    fn percent_done_rounds_and_caps() {
        assert_eq!(percent_done(false, 0, 0), 100);
        assert_eq!(percent_done(true, 1, 3), 33);
        assert_eq!(percent_done(true, 2, 3), 67);
        assert_eq!(percent_done(true, 5, 3), 100);
        assert_eq!(percent_done(true, 4, 0), 0);
    }

    #[test]
    fn had_version_is_monotone() {
        assert_eq!(version_flags(true, false), (true, true));
        assert_eq!(version_flags(false, true), (false, true));
        assert_eq!(version_flags(false, false), (false, false));
    }

    #[test]
    fn complete_date_follows_languages() {
        let now = Utc::now();
        let earlier = now - Duration::days(1);
        let done = LanguageSummary {
            subtitles_complete: true,
            tip_subtitle_count: 3,
        };
        let empty_done = LanguageSummary {
            subtitles_complete: true,
            tip_subtitle_count: 0,
        };
        assert_eq!(complete_date(None, &[done], now), Some(now));
        assert_eq!(complete_date(Some(earlier), &[done], now), Some(earlier));
        assert_eq!(complete_date(Some(earlier), &[empty_done], now), None);
        assert_eq!(languages_count(&[done, empty_done]), 1);
    }

    #[test]
    fn signoff_tally() {
        let counts = SignoffCounts::tally([
            SignoffState { signoff: true, signoff_is_official: true, expired: false },
            SignoffState { signoff: true, signoff_is_official: false, expired: false },
            SignoffState { signoff: false, signoff_is_official: false, expired: true },
            SignoffState { signoff: false, signoff_is_official: false, expired: false },
        ]);
        assert_eq!(
            counts,
            SignoffCounts {
                official: 1,
                unofficial: 1,
                pending: 2,
                pending_expired: 1,
                pending_unexpired: 1
            }
        );
    }
}
