//! SubRip (`.srt`).

use super::timing::{format_clock, parse_clock, synced, UNSYNCED_MS};
use super::{blocks, normalize_input, SubtitleItem, SubtitleSet};
use crate::error::CoreError;

/// Parse a `start --> end` line into optional times.
pub(crate) fn parse_arrow_line(line: &str) -> Result<(Option<i64>, Option<i64>), CoreError> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| CoreError::Validation(format!("Expected a timing line, got '{line}'")))?;
    // Cue settings may follow the end time.
    let end = rest.split_whitespace().next().unwrap_or_default();
    Ok((synced(parse_clock(start)?), synced(parse_clock(end)?)))
}

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let input = normalize_input(input);
    let mut set = SubtitleSet::new();
    for block in blocks(&input) {
        let mut lines = block.into_iter().peekable();
        // The numeric counter is optional in the wild.
        if lines.peek().is_some_and(|l| !l.contains("-->")) {
            lines.next();
        }
        let timing = lines
            .next()
            .ok_or_else(|| CoreError::Validation("SRT block has no timing line".to_string()))?;
        let (start, end) = parse_arrow_line(timing)?;
        let text = lines.collect::<Vec<_>>().join("\n");
        set.push(SubtitleItem::new(start, end, text));
    }
    Ok(set)
}

pub fn serialize(set: &SubtitleSet) -> String {
    let mut out = String::new();
    for (idx, item) in set.iter().enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            idx + 1,
            format_clock(item.start_ms.unwrap_or(UNSYNCED_MS), ','),
            format_clock(item.end_ms.unwrap_or(UNSYNCED_MS), ','),
            item.text
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbered_blocks() {
        let input = "1\r\n00:00:01,000 --> 00:00:02,500\r\nHello\r\nworld\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nBye\r\n";
        let set = parse(input).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.items()[0], SubtitleItem::timed(1000, 2500, "Hello\nworld"));
        assert_eq!(set.items()[1].start_ms, Some(3000));
    }

    #[test]
    fn unsynced_items_use_placeholder() {
        let set = SubtitleSet::from_items(vec![SubtitleItem::new(None, None, "later")]);
        let rendered = serialize(&set);
        assert!(rendered.contains("99:59:59,999 --> 99:59:59,999"));
        let parsed = parse(&rendered).unwrap();
        assert!(!parsed.items()[0].is_synced());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse("1\nnot a timing line\ntext\n").is_err());
    }
}
