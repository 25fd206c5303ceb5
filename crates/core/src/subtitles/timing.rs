//! Timestamp parsing and formatting shared by the text formats.

use crate::error::CoreError;

/// Placeholder several formats use for a subtitle that has no timing yet.
pub const UNSYNCED_MS: i64 = 99 * 3_600_000 + 59 * 60_000 + 59_000 + 999;

fn invalid(value: &str) -> CoreError {
    CoreError::Validation(format!("Invalid timestamp '{value}'"))
}

/// Split milliseconds into `(hours, minutes, seconds, millis)`.
pub fn split_ms(ms: i64) -> (i64, i64, i64, i64) {
    let ms = ms.max(0);
    (
        ms / 3_600_000,
        (ms / 60_000) % 60,
        (ms / 1000) % 60,
        ms % 1000,
    )
}

/// `HH:MM:SS{sep}mmm`, e.g. `00:01:02,500` for srt or `00:01:02.500` for vtt.
pub fn format_clock(ms: i64, sep: char) -> String {
    let (h, m, s, millis) = split_ms(ms);
    format!("{h:02}:{m:02}:{s:02}{sep}{millis:03}")
}

/// `H:MM:SS.mmm` as used by sbv.
pub fn format_sbv(ms: i64) -> String {
    let (h, m, s, millis) = split_ms(ms);
    format!("{h}:{m:02}:{s:02}.{millis:03}")
}

/// `H:MM:SS.cc` (centiseconds) as used by ssa/ass.
pub fn format_ssa(ms: i64) -> String {
    let (h, m, s, millis) = split_ms(ms);
    format!("{h}:{m:02}:{s:02}.{:02}", millis / 10)
}

/// Parse `[[H]H:]MM:SS[.,]fraction`. The fraction is scaled to millis
/// whatever its digit count.
pub fn parse_clock(value: &str) -> Result<i64, CoreError> {
    let value = value.trim();
    let (clock, fraction) = match value.rfind(['.', ',']) {
        Some(idx) => (&value[..idx], &value[idx + 1..]),
        None => (value, ""),
    };

    let parts: Vec<&str> = clock.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(invalid(value));
    }
    let mut fields = [0i64; 3];
    let offset = 3 - parts.len();
    for (idx, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(value));
        }
        fields[offset + idx] = part.parse().map_err(|_| invalid(value))?;
    }
    let [h, m, s] = fields;
    if m >= 60 || s >= 60 {
        return Err(invalid(value));
    }

    let millis = parse_fraction(fraction).ok_or_else(|| invalid(value))?;
    Ok(h * 3_600_000 + m * 60_000 + s * 1000 + millis)
}

fn parse_fraction(fraction: &str) -> Option<i64> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: String = fraction.chars().chain("000".chars()).take(3).collect();
    digits.parse().ok()
}

/// Parse a TTML time expression: clock time or an offset such as `1.5s`,
/// `1500ms`, `2m`, `1h`.
pub fn parse_ttml_time(value: &str) -> Result<i64, CoreError> {
    let value = value.trim();
    if value.contains(':') {
        return parse_clock(value);
    }
    let (number, factor) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1000.0)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000.0)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3_600_000.0)
    } else {
        return Err(invalid(value));
    };
    let number: f64 = number.parse().map_err(|_| invalid(value))?;
    if number.is_sign_negative() || !number.is_finite() {
        return Err(invalid(value));
    }
    Ok((number * factor).round() as i64)
}

/// `None` for the unsynced placeholder, the value otherwise.
pub fn synced(ms: i64) -> Option<i64> {
    (ms != UNSYNCED_MS).then_some(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formats() {
        assert_eq!(format_clock(3_723_045, ','), "01:02:03,045");
        assert_eq!(format_sbv(62_500), "0:01:02.500");
        assert_eq!(format_ssa(62_510), "0:01:02.51");
        assert_eq!(format_clock(UNSYNCED_MS, ','), "99:59:59,999");
    }

    #[test]
    fn clock_parsing_accepts_variants() {
        assert_eq!(parse_clock("01:02:03,045").unwrap(), 3_723_045);
        assert_eq!(parse_clock("02:03.5").unwrap(), 123_500);
        assert_eq!(parse_clock("0:00:01.25").unwrap(), 1_250);
        assert_eq!(parse_clock("00:00:07").unwrap(), 7_000);
        assert!(parse_clock("1:2").is_ok());
        assert!(parse_clock("aa:bb:cc").is_err());
        assert!(parse_clock("00:61:00.000").is_err());
    }

    #[test]
    fn ttml_offsets() {
        assert_eq!(parse_ttml_time("1.5s").unwrap(), 1_500);
        assert_eq!(parse_ttml_time("250ms").unwrap(), 250);
        assert_eq!(parse_ttml_time("00:00:02.000").unwrap(), 2_000);
        assert!(parse_ttml_time("12").is_err());
    }
}
