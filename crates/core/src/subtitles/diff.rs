//! Item-by-item comparison of two subtitle sets.

use serde::Serialize;

use super::{SubtitleItem, SubtitleSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemChange {
    Unchanged,
    Text,
    Timing,
    TextAndTiming,
    Added,
    Removed,
}

impl ItemChange {
    fn compare(old: &SubtitleItem, new: &SubtitleItem) -> Self {
        let text = old.text != new.text;
        let timing = old.start_ms != new.start_ms || old.end_ms != new.end_ms;
        match (text, timing) {
            (false, false) => ItemChange::Unchanged,
            (true, false) => ItemChange::Text,
            (false, true) => ItemChange::Timing,
            (true, true) => ItemChange::TextAndTiming,
        }
    }

    fn touches_text(self) -> bool {
        matches!(
            self,
            ItemChange::Text | ItemChange::TextAndTiming | ItemChange::Added | ItemChange::Removed
        )
    }

    fn touches_timing(self) -> bool {
        matches!(
            self,
            ItemChange::Timing
                | ItemChange::TextAndTiming
                | ItemChange::Added
                | ItemChange::Removed
        )
    }
}

/// Result of [`diff`]: one entry per position plus change ratios in `0..=1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleDiff {
    pub changes: Vec<ItemChange>,
    pub text_changed: f64,
    pub time_changed: f64,
}

impl SubtitleDiff {
    pub fn is_changed(&self) -> bool {
        self.changes.iter().any(|c| *c != ItemChange::Unchanged)
    }

    /// Share of positions with any change.
    pub fn change_ratio(&self) -> f64 {
        ratio(
            self.changes
                .iter()
                .filter(|c| **c != ItemChange::Unchanged)
                .count(),
            self.changes.len(),
        )
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Compare `old` against `new` position by position.
pub fn diff(old: &SubtitleSet, new: &SubtitleSet) -> SubtitleDiff {
    let len = old.len().max(new.len());
    let changes: Vec<ItemChange> = (0..len)
        .map(|idx| match (old.items().get(idx), new.items().get(idx)) {
            (Some(o), Some(n)) => ItemChange::compare(o, n),
            (None, Some(_)) => ItemChange::Added,
            (Some(_), None) => ItemChange::Removed,
            (None, None) => ItemChange::Unchanged,
        })
        .collect();
    let text = changes.iter().filter(|c| c.touches_text()).count();
    let timing = changes.iter().filter(|c| c.touches_timing()).count();
    SubtitleDiff {
        text_changed: ratio(text, len),
        time_changed: ratio(timing, len),
        changes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sets_have_no_changes() {
        let set = SubtitleSet::from_timed(&[(0, 1, "a")]);
        let d = diff(&set, &set);
        assert!(!d.is_changed());
        assert_eq!(d.change_ratio(), 0.0);
    }

    #[test]
    fn classifies_each_position() {
        let old = SubtitleSet::from_timed(&[(0, 100, "a"), (100, 200, "b"), (200, 300, "c")]);
        let new = SubtitleSet::from_timed(&[(0, 100, "a"), (150, 200, "B"), (200, 350, "c"), (400, 500, "d")]);
        let d = diff(&old, &new);
        assert_eq!(
            d.changes,
            vec![
                ItemChange::Unchanged,
                ItemChange::TextAndTiming,
                ItemChange::Timing,
                ItemChange::Added
            ]
        );
        assert_eq!(d.text_changed, 0.5);
        assert_eq!(d.time_changed, 0.75);
        assert_eq!(d.change_ratio(), 0.75);
    }

    #[test]
    fn empty_against_empty() {
        let d = diff(&SubtitleSet::new(), &SubtitleSet::new());
        assert!(d.changes.is_empty());
        assert_eq!(d.text_changed, 0.0);
    }
}
