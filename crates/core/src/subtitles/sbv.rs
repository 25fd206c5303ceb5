//! YouTube SubViewer (`.sbv`).

use super::timing::{format_sbv, parse_clock, synced, UNSYNCED_MS};
use super::{blocks, normalize_input, SubtitleItem, SubtitleSet};
use crate::error::CoreError;

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let input = normalize_input(input);
    let mut set = SubtitleSet::new();
    for block in blocks(&input) {
        let (timing, text) = block
            .split_first()
            .ok_or_else(|| CoreError::Validation("Empty SBV block".to_string()))?;
        let (start, end) = timing.split_once(',').ok_or_else(|| {
            CoreError::Validation(format!("Expected 'start,end' timing, got '{timing}'"))
        })?;
        set.push(SubtitleItem::new(
            synced(parse_clock(start)?),
            synced(parse_clock(end)?),
            text.join("\n"),
        ));
    }
    Ok(set)
}

pub fn serialize(set: &SubtitleSet) -> String {
    let mut out = String::new();
    for item in set {
        out.push_str(&format!(
            "{},{}\n{}\n\n",
            format_sbv(item.start_ms.unwrap_or(UNSYNCED_MS)),
            format_sbv(item.end_ms.unwrap_or(UNSYNCED_MS)),
            item.text
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_timing() {
        let set = parse("0:00:01.500,0:00:03.000\nHello\n\n0:00:04.000,0:00:05.000\nBye\n").unwrap();
        assert_eq!(set.items()[0], SubtitleItem::timed(1500, 3000, "Hello"));
        assert_eq!(set.len(), 2);
    }
}
