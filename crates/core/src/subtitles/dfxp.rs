//! DFXP / TTML.
//!
//! Reads every `<p>` under the body, honouring `begin`/`end` (or `dur`) and
//! turning `<br/>` into line breaks. Styling spans are flattened to text.

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use super::timing::{format_clock, parse_ttml_time};
use super::{SubtitleItem, SubtitleSet};
use crate::error::CoreError;

pub const TTML_NS: &str = "http://www.w3.org/ns/ttml";

fn xml_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Validation(format!("Invalid DFXP: {e}"))
}

fn write_error(e: impl std::fmt::Display) -> CoreError {
    CoreError::Internal(format!("DFXP write failed: {e}"))
}

#[derive(Default)]
struct Paragraph {
    begin: Option<i64>,
    end: Option<i64>,
    dur: Option<i64>,
    text: String,
}

fn read_timing(e: &BytesStart<'_>) -> Result<Paragraph, CoreError> {
    let mut p = Paragraph::default();
    for attr in e.attributes() {
        let attr = attr.map_err(xml_error)?;
        let value = attr.unescape_value().map_err(xml_error)?;
        match attr.key.local_name().as_ref() {
            b"begin" => p.begin = Some(parse_ttml_time(&value)?),
            b"end" => p.end = Some(parse_ttml_time(&value)?),
            b"dur" => p.dur = Some(parse_ttml_time(&value)?),
            _ => {}
        }
    }
    Ok(p)
}

pub fn parse(input: &str) -> Result<SubtitleSet, CoreError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut set = SubtitleSet::new();
    let mut current: Option<Paragraph> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tt" => saw_root = true,
                b"p" => current = Some(read_timing(&e)?),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"br" => {
                    if let Some(p) = current.as_mut() {
                        p.text.push('\n');
                    }
                }
                b"p" => set.push(SubtitleItem::new(None, None, String::new())),
                _ => {}
            },
            Event::Text(t) => {
                if let Some(p) = current.as_mut() {
                    let text = t.unescape().map_err(xml_error)?;
                    // Source indentation is not content.
                    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                    if !collapsed.is_empty() {
                        if !p.text.is_empty() && !p.text.ends_with('\n') {
                            p.text.push(' ');
                        }
                        p.text.push_str(&collapsed);
                    }
                }
            }
            Event::CData(t) => {
                if let Some(p) = current.as_mut() {
                    p.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"p" {
                    if let Some(p) = current.take() {
                        let end = p.end.or_else(|| Some(p.begin? + p.dur?));
                        set.push(SubtitleItem::new(p.begin, end, p.text.trim().to_string()));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(CoreError::Validation(
            "DFXP payload has no <tt> root".to_string(),
        ));
    }
    Ok(set)
}

/// Render as TTML, optionally tagging the document language.
pub fn serialize(set: &SubtitleSet, language_code: Option<&str>) -> Result<String, CoreError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    let mut root = BytesStart::new("tt");
    root.push_attribute(("xmlns", TTML_NS));
    root.push_attribute(("xml:lang", language_code.unwrap_or("")));
    writer.write_event(Event::Start(root)).map_err(write_error)?;
    writer
        .write_event(Event::Empty(BytesStart::new("head")))
        .map_err(write_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("body")))
        .map_err(write_error)?;
    writer
        .write_event(Event::Start(BytesStart::new("div")))
        .map_err(write_error)?;

    for item in set {
        let mut p = BytesStart::new("p");
        let begin = item.start_ms.map(|ms| format_clock(ms, '.'));
        let end = item.end_ms.map(|ms| format_clock(ms, '.'));
        if let Some(begin) = begin.as_deref() {
            p.push_attribute(("begin", begin));
        }
        if let Some(end) = end.as_deref() {
            p.push_attribute(("end", end));
        }
        writer.write_event(Event::Start(p)).map_err(write_error)?;
        for (idx, line) in item.text.split('\n').enumerate() {
            if idx > 0 {
                writer
                    .write_event(Event::Empty(BytesStart::new("br")))
                    .map_err(write_error)?;
            }
            writer
                .write_event(Event::Text(BytesText::new(line)))
                .map_err(write_error)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("p")))
            .map_err(write_error)?;
    }

    for tag in ["div", "body", "tt"] {
        writer
            .write_event(Event::End(BytesEnd::new(tag)))
            .map_err(write_error)?;
    }

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| CoreError::Internal(format!("DFXP output is not UTF-8: {e}")))
}
