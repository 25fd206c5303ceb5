//! SubStation Alpha / Advanced SubStation (`.ssa`, `.ass`).

use super::timing::{format_ssa, parse_clock, synced, UNSYNCED_MS};
use super::{normalize_input, SubtitleItem, SubtitleSet};
use crate::error::CoreError;

const DEFAULT_FORMAT: &[&str] = &[
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

const HEADER: &str = "[Script Info]\n\
ScriptType: v4.00+\n\
WrapStyle: 0\n\
ScaledBorderAndShadow: yes\n\
\n\
[V4+ Styles]\n\
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,2,2,10,10,10,1\n\
\n\
[Events]\n\
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n";

/// Strip `{...}` override blocks and decode line breaks.
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut depth = 0usize;
    for c in raw.chars() {
        match c {
            '{' => depth += 1,
            '}' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out.replace("\\N", "\n").replace("\\n", "\n")
}

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let input = normalize_input(input);
    let mut set = SubtitleSet::new();
    let mut in_events = false;
    let mut columns: Vec<String> = DEFAULT_FORMAT.iter().map(|c| c.to_string()).collect();

    for line in input.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_events = line.eq_ignore_ascii_case("[events]");
            continue;
        }
        if !in_events {
            continue;
        }
        if let Some(format) = line.strip_prefix("Format:") {
            columns = format.split(',').map(|c| c.trim().to_string()).collect();
            continue;
        }
        let Some(dialogue) = line.strip_prefix("Dialogue:") else {
            continue;
        };

        // Text is always the last column and may itself contain commas.
        let fields: Vec<&str> = dialogue.splitn(columns.len(), ',').collect();
        let column = |name: &str| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .and_then(|idx| fields.get(idx))
                .map(|v| v.trim())
                .ok_or_else(|| CoreError::Validation(format!("Dialogue line lacks '{name}'")))
        };
        let start = parse_clock(column("Start")?)?;
        let end = parse_clock(column("End")?)?;
        let text = columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case("Text"))
            .and_then(|idx| fields.get(idx))
            .copied()
            .unwrap_or_default();
        set.push(SubtitleItem::new(synced(start), synced(end), clean_text(text)));
    }
    Ok(set)
}

pub fn serialize(set: &SubtitleSet) -> String {
    let mut out = String::from(HEADER);
    for item in set {
        out.push_str(&format!(
            "Dialogue: 0,{},{},Default,,0,0,0,,{}\n",
            format_ssa(item.start_ms.unwrap_or(UNSYNCED_MS)),
            format_ssa(item.end_ms.unwrap_or(UNSYNCED_MS)),
            item.text.replace('\n', "\\N")
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dialogue_with_commas_and_overrides() {
        let input = "[Script Info]\nTitle: x\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,{\\i1}Well,{\\i0} hi\\Nthere\n";
        let set = parse(input).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.items()[0], SubtitleItem::timed(1000, 2500, "Well, hi\nthere"));
    }

    #[test]
    fn lines_outside_events_are_ignored() {
        let set = parse("[Script Info]\nDialogue: 0,0:00:01.00,0:00:02.00,,,0,0,0,,x\n").unwrap();
        assert!(set.is_empty());
    }
}
