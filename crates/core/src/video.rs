//! Video identity and URL rules.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::error::CoreError;

pub const VIDEO_ID_LENGTH: usize = 12;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[A-Za-z0-9.-]+(:\d+)?(/[^\s]*)?$").expect("valid regex")
});

static VIDEO_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{12}$").expect("valid regex"));

/// A fresh random alphanumeric video id.
pub fn generate_video_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(VIDEO_ID_LENGTH)
        .map(char::from)
        .collect()
}

pub fn is_valid_video_id(id: &str) -> bool {
    VIDEO_ID_RE.is_match(id)
}

/// Trim and validate an `http(s)` video URL.
pub fn validate_video_url(url: &str) -> Result<String, CoreError> {
    let url = url.trim();
    if !URL_RE.is_match(url) {
        return Err(CoreError::Validation(format!("invalid-url: '{url}'")));
    }
    Ok(url.to_string())
}

/// Whether a newly added URL becomes the primary one.
///
/// The first URL of a video is always primary; later ones only on request,
/// in which case the previous primary is demoted by the caller.
pub fn new_url_is_primary(existing_urls: usize, requested_primary: bool) -> bool {
    existing_urls == 0 || requested_primary
}

/// The primary URL cannot be removed; promote another one first.
pub fn ensure_url_deletable(is_primary: bool) -> Result<(), CoreError> {
    if is_primary {
        return Err(CoreError::Validation(
            "The primary URL of a video cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_duration(duration_ms: Option<i64>) -> Result<(), CoreError> {
    match duration_ms {
        Some(d) if d < 0 => Err(CoreError::Validation(
            "Duration cannot be negative".to_string(),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_well_formed() {
        let id = generate_video_id();
        assert_eq!(id.len(), VIDEO_ID_LENGTH);
        assert!(is_valid_video_id(&id));
        assert_ne!(id, generate_video_id());
    }

    #[test]
    fn url_validation() {
        assert_eq!(
            validate_video_url(" https://example.com/v.mp4 ").unwrap(),
            "https://example.com/v.mp4"
        );
        assert!(validate_video_url("http://localhost:8080/a?b=c").is_ok());
        assert!(validate_video_url("ftp://example.com/v.mp4").is_err());
        assert!(validate_video_url("not a url").is_err());
    }

    #[test]
    fn primary_url_rules() {
        assert!(new_url_is_primary(0, false));
        assert!(!new_url_is_primary(2, false));
        assert!(new_url_is_primary(2, true));
        assert!(ensure_url_deletable(true).is_err());
        assert!(ensure_url_deletable(false).is_ok());
    }
}
