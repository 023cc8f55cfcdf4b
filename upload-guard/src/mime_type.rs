//! MIME type normalization
//!
//! Clients send all sorts of spellings for the same format (`audio/mp3`,
//! `image/jpg`, `Image/PNG; charset=binary`). Everything past the intake
//! boundary works with the canonical form produced here.

/// Non-canonical spellings and the canonical type they stand for
pub static MIME_ALIASES: &[(&str, &str)] = &[
    ("image/jpg", "image/jpeg"),
    ("image/pjpeg", "image/jpeg"),
    ("image/x-png", "image/png"),
    ("image/x-ms-bmp", "image/bmp"),
    ("image/vnd.microsoft.icon", "image/x-icon"),
    ("image/svg", "image/svg+xml"),
    ("audio/mp3", "audio/mpeg"),
    ("audio/x-mp3", "audio/mpeg"),
    ("audio/mpeg3", "audio/mpeg"),
    ("audio/x-mpeg", "audio/mpeg"),
    ("audio/x-wav", "audio/wav"),
    ("audio/wave", "audio/wav"),
    ("audio/vnd.wave", "audio/wav"),
    ("audio/x-flac", "audio/flac"),
    ("audio/x-m4a", "audio/mp4"),
    ("audio/m4a", "audio/mp4"),
    ("audio/x-aac", "audio/aac"),
    ("application/ogg", "audio/ogg"),
    ("video/x-m4v", "video/mp4"),
    ("video/avi", "video/x-msvideo"),
    ("application/x-pdf", "application/pdf"),
    ("application/x-zip-compressed", "application/zip"),
];

/// Normalizes a client-supplied MIME type to its canonical form
///
/// Parameters such as `; charset=utf-8` are dropped, the type is lowercased
/// and known aliases are resolved.
///
/// # Examples
///
/// ```rust
/// use upload_guard::mime_type::normalize_mime_type;
///
/// assert_eq!(normalize_mime_type("audio/mp3"), "audio/mpeg");
/// assert_eq!(normalize_mime_type("Image/PNG; charset=binary"), "image/png");
/// ```
#[must_use]
pub fn normalize_mime_type(content_type: &str) -> String {
    let essence = content_type.trim().parse::<mime::Mime>().map_or_else(
        |_| {
            content_type
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        },
        |parsed| parsed.essence_str().to_ascii_lowercase(),
    );

    MIME_ALIASES
        .iter()
        .find(|(alias, _)| *alias == essence)
        .map_or(essence, |(_, canonical)| (*canonical).to_string())
}

/// Returns true for types whose content is text or markup
///
/// These are the formats worth decoding and scanning for script injection.
#[must_use]
pub fn is_text_like(mime_type: &str) -> bool {
    mime_type.starts_with("text/")
        || matches!(
            mime_type,
            "image/svg+xml" | "application/xml" | "application/json" | "application/xhtml+xml"
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolution() {
        assert_eq!(normalize_mime_type("audio/mp3"), "audio/mpeg");
        assert_eq!(normalize_mime_type("image/jpg"), "image/jpeg");
        assert_eq!(normalize_mime_type("audio/x-wav"), "audio/wav");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize_mime_type("IMAGE/PNG"), "image/png");
        assert_eq!(normalize_mime_type("Audio/MP3"), "audio/mpeg");
    }

    #[test]
    fn test_parameters_stripped() {
        assert_eq!(normalize_mime_type("text/html; charset=utf-8"), "text/html");
        assert_eq!(normalize_mime_type("image/jpg;q=0.9"), "image/jpeg");
    }

    #[test]
    fn test_unparseable_falls_back() {
        assert_eq!(normalize_mime_type("  NotAMime ; x=1"), "notamime");
        assert_eq!(normalize_mime_type(""), "");
    }

    #[test]
    fn test_canonical_passthrough() {
        assert_eq!(normalize_mime_type("application/pdf"), "application/pdf");
    }

    #[test]
    fn test_aliases_point_at_canonical_types() {
        for (alias, canonical) in MIME_ALIASES {
            assert_ne!(alias, canonical);
            assert!(
                MIME_ALIASES.iter().all(|(a, _)| a != canonical),
                "{canonical} is itself an alias"
            );
        }
    }

    #[test]
    fn test_text_like() {
        assert!(is_text_like("text/plain"));
        assert!(is_text_like("image/svg+xml"));
        assert!(is_text_like("application/json"));
        assert!(!is_text_like("image/png"));
    }
}
