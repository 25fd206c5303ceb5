//! Plain text: one subtitle per paragraph, no timing.

use super::{blocks, normalize_input, SubtitleItem, SubtitleSet};

pub fn parse(input: &str) -> SubtitleSet {
    let input = normalize_input(input);
    blocks(&input)
        .into_iter()
        .map(|lines| SubtitleItem::new(None, None, lines.join("\n")))
        .collect()
}

pub fn serialize(set: &SubtitleSet) -> String {
    let mut out = set
        .iter()
        .map(|item| item.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_become_unsynced_items() {
        let set = parse("Hello\nworld\n\nBye\n");
        assert_eq!(set.len(), 2);
        assert!(!set.is_fully_synced());
        assert_eq!(set.items()[0].text, "Hello\nworld");
        assert_eq!(serialize(&set), "Hello\nworld\n\nBye\n");
    }
}
