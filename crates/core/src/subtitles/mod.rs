//! Subtitle payloads and their interchange formats.
//!
//! A version stores a [`SubtitleSet`]: an ordered list of items with
//! optional timing. Items without both times are "unsynced".

pub mod dfxp;
pub mod diff;
pub mod json;
pub mod sbv;
pub mod srt;
pub mod ssa;
pub mod timing;
pub mod txt;
pub mod vtt;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub use diff::{diff, SubtitleDiff};

/// One subtitle line (or block of lines).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleItem {
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

impl SubtitleItem {
    pub fn new(start_ms: Option<i64>, end_ms: Option<i64>, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            meta: BTreeMap::new(),
        }
    }

    pub fn timed(start_ms: i64, end_ms: i64, text: impl Into<String>) -> Self {
        Self::new(Some(start_ms), Some(end_ms), text)
    }

    pub fn is_synced(&self) -> bool {
        self.start_ms.is_some() && self.end_ms.is_some()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// The ordered subtitle payload of a version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtitleSet {
    items: Vec<SubtitleItem>,
}

impl SubtitleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<SubtitleItem>) -> Self {
        Self { items }
    }

    /// Build from `(start, end, text)` triples.
    pub fn from_timed(triples: &[(i64, i64, &str)]) -> Self {
        triples
            .iter()
            .map(|(s, e, t)| SubtitleItem::timed(*s, *e, *t))
            .collect()
    }

    pub fn push(&mut self, item: SubtitleItem) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[SubtitleItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SubtitleItem> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of items carrying non-blank text.
    pub fn subtitle_count(&self) -> usize {
        self.items.iter().filter(|i| !i.is_blank()).count()
    }

    /// Every item has both a start and an end time.
    pub fn is_fully_synced(&self) -> bool {
        self.items.iter().all(SubtitleItem::is_synced)
    }

    /// Latest end time among synced items.
    pub fn last_end_ms(&self) -> Option<i64> {
        self.items.iter().filter_map(|i| i.end_ms).max()
    }

    pub fn into_items(self) -> Vec<SubtitleItem> {
        self.items
    }
}

impl FromIterator<SubtitleItem> for SubtitleSet {
    fn from_iter<T: IntoIterator<Item = SubtitleItem>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SubtitleSet {
    type Item = &'a SubtitleItem;
    type IntoIter = std::slice::Iter<'a, SubtitleItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Interchange formats accepted on upload and offered on download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Dfxp,
    Srt,
    Sbv,
    Vtt,
    Ssa,
    Txt,
    Json,
}

impl SubtitleFormat {
    pub const ALL: [SubtitleFormat; 7] = [
        SubtitleFormat::Dfxp,
        SubtitleFormat::Srt,
        SubtitleFormat::Sbv,
        SubtitleFormat::Vtt,
        SubtitleFormat::Ssa,
        SubtitleFormat::Txt,
        SubtitleFormat::Json,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SubtitleFormat::Dfxp => "dfxp",
            SubtitleFormat::Srt => "srt",
            SubtitleFormat::Sbv => "sbv",
            SubtitleFormat::Vtt => "vtt",
            SubtitleFormat::Ssa => "ssa",
            SubtitleFormat::Txt => "txt",
            SubtitleFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            SubtitleFormat::Dfxp => "application/ttml+xml",
            SubtitleFormat::Vtt => "text/vtt",
            SubtitleFormat::Json => "application/json",
            _ => "text/plain",
        }
    }

    /// Parse a payload in this format.
    pub fn parse(self, input: &str) -> Result<SubtitleSet, CoreError> {
        match self {
            SubtitleFormat::Dfxp => dfxp::parse(input),
            SubtitleFormat::Srt => srt::parse(input),
            SubtitleFormat::Sbv => sbv::parse(input),
            SubtitleFormat::Vtt => vtt::parse(input),
            SubtitleFormat::Ssa => ssa::parse(input),
            SubtitleFormat::Txt => Ok(txt::parse(input)),
            SubtitleFormat::Json => json::parse(input),
        }
    }

    /// Render a set in this format.
    pub fn serialize(self, set: &SubtitleSet) -> Result<String, CoreError> {
        match self {
            SubtitleFormat::Dfxp => dfxp::serialize(set, None),
            SubtitleFormat::Srt => Ok(srt::serialize(set)),
            SubtitleFormat::Sbv => Ok(sbv::serialize(set)),
            SubtitleFormat::Vtt => Ok(vtt::serialize(set)),
            SubtitleFormat::Ssa => Ok(ssa::serialize(set)),
            SubtitleFormat::Txt => Ok(txt::serialize(set)),
            SubtitleFormat::Json => json::serialize(set),
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubtitleFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "dfxp" | "ttml" | "xml" => Ok(SubtitleFormat::Dfxp),
            "ass" => Ok(SubtitleFormat::Ssa),
            "webvtt" => Ok(SubtitleFormat::Vtt),
            other => SubtitleFormat::ALL
                .into_iter()
                .find(|f| f.as_str() == other)
                .ok_or_else(|| CoreError::Validation(format!("Unknown subtitle format '{s}'"))),
        }
    }
}

/// Normalise line endings and strip a leading byte-order mark.
pub(crate) fn normalize_input(input: &str) -> String {
    input
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n")
}

/// Split normalised input into blank-line separated blocks of lines.
pub(crate) fn blocks(input: &str) -> Vec<Vec<&str>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for line in input.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}
