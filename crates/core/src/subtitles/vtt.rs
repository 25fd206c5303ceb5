//! WebVTT (`.vtt`).

use super::srt::parse_arrow_line;
use super::timing::{format_clock, UNSYNCED_MS};
use super::{blocks, normalize_input, SubtitleItem, SubtitleSet};
use crate::error::CoreError;

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let input = normalize_input(input);
    if !input.trim_start().starts_with("WEBVTT") {
        return Err(CoreError::Validation(
            "WebVTT payload must start with 'WEBVTT'".to_string(),
        ));
    }

    let mut set = SubtitleSet::new();
    for (idx, block) in blocks(&input).into_iter().enumerate() {
        if idx == 0 || block.first().is_some_and(|l| l.starts_with("NOTE")) {
            continue;
        }
        if block
            .first()
            .is_some_and(|l| *l == "STYLE" || *l == "REGION")
        {
            continue;
        }
        let Some(timing_idx) = block.iter().position(|l| l.contains("-->")) else {
            continue;
        };
        let (start, end) = parse_arrow_line(block[timing_idx])?;
        let text = block[timing_idx + 1..].join("\n");
        set.push(SubtitleItem::new(start, end, text));
    }
    Ok(set)
}

pub fn serialize(set: &SubtitleSet) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for item in set {
        out.push_str(&format!(
            "{} --> {}\n{}\n\n",
            format_clock(item.start_ms.unwrap_or(UNSYNCED_MS), '.'),
            format_clock(item.end_ms.unwrap_or(UNSYNCED_MS), '.'),
            item.text
        ));
    }
    out
}
