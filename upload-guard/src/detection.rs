//! File type detection from content
//!
//! Never trust the client-provided Content-Type. Detection looks only at the
//! bytes, scanning the [signature registry](crate::signatures) in order and
//! returning the first type whose signature fully matches.

use serde::Serialize;

use crate::signatures::SIGNATURES;

/// A file type identified from content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedType {
    /// Canonical MIME type
    pub mime_type: &'static str,
    /// Human-readable format name
    pub description: &'static str,
}

/// Detects the file type of `data` from its leading bytes
///
/// Returns `None` for empty input or when no registered signature matches.
///
/// # Examples
///
/// ```rust
/// use upload_guard::detect_file_type;
///
/// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// let detected = detect_file_type(&png).unwrap();
/// assert_eq!(detected.mime_type, "image/png");
///
/// assert!(detect_file_type(b"just some text").is_none());
/// ```
#[must_use]
pub fn detect_file_type(data: &[u8]) -> Option<DetectedType> {
    if data.is_empty() {
        return None;
    }

    SIGNATURES
        .iter()
        .find(|sig| sig.matches(data))
        .map(|sig| DetectedType {
            mime_type: sig.mime_type,
            description: sig.description,
        })
}

/// Names what `data` looks like, for diagnostics only
///
/// Tries the registry first and falls back to the much broader `infer`
/// database, so a rejected upload can say "this is actually a Windows
/// executable" even though executables are never registered as acceptable.
#[must_use]
pub fn identify(data: &[u8]) -> Option<String> {
    detect_file_type(data)
        .map(|detected| detected.mime_type.to_string())
        .or_else(|| infer::get(data).map(|kind| kind.mime_type().to_string()))
}
