//! Content validation against the declared MIME type
//!
//! The client-declared type is only a claim. [`validate_file_content`] accepts
//! it when the bytes carry a signature registered for that type, and reports
//! what the bytes actually look like when they do not.

use serde::Serialize;

use crate::detection::identify;
use crate::error::{ValidationError, ValidationOutcome};
use crate::mime_type::normalize_mime_type;
use crate::scanning::Threat;
use crate::signatures::lookup;

/// Details attached to an accepted (or threat-rejected) upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetadata {
    /// Filename safe to hand to the storage layer
    pub sanitized_filename: String,
    /// Canonical MIME type verified from content
    pub actual_type: String,
    /// Scan findings; absent when the scan was skipped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threats: Option<Vec<Threat>>,
}

/// Outcome of validating an upload
///
/// Serializes to camelCase JSON with absent fields omitted, ready to hand
/// back to the intake layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Whether the upload may be stored
    pub valid: bool,
    /// Canonical type verified from content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_type: Option<String>,
    /// What the bytes look like when they contradict the declared type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_type: Option<String>,
    /// Why the upload was rejected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ValidationError>,
    /// Non-blocking findings
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Present once the upload passed content validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ValidationMetadata>,
}

impl ValidationResult {
    /// An accepted result for a verified type
    #[must_use]
    pub fn accepted(actual_type: impl Into<String>) -> Self {
        Self {
            valid: true,
            actual_type: Some(actual_type.into()),
            detected_type: None,
            error: None,
            warnings: Vec::new(),
            metadata: None,
        }
    }

    /// A rejected result
    ///
    /// A content mismatch also fills in `detected_type`.
    #[must_use]
    pub fn rejected(error: ValidationError) -> Self {
        let detected_type = match &error {
            ValidationError::ContentTypeMismatch { detected, .. } => detected.clone(),
            _ => None,
        };
        Self {
            valid: false,
            actual_type: None,
            detected_type,
            error: Some(error),
            warnings: Vec::new(),
            metadata: None,
        }
    }

    /// Human-readable rejection reason, if any
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

impl From<ValidationOutcome<()>> for ValidationResult {
    fn from(outcome: ValidationOutcome<()>) -> Self {
        match outcome {
            Ok(()) => Self {
                valid: true,
                actual_type: None,
                detected_type: None,
                error: None,
                warnings: Vec::new(),
                metadata: None,
            },
            Err(err) => Self::rejected(err),
        }
    }
}

/// Verifies that `data` matches the declared MIME type
///
/// # Examples
///
/// ```rust
/// use upload_guard::validate_file_content;
///
/// let gif = b"GIF89a\x01\x00\x01\x00";
/// let result = validate_file_content(gif, "image/gif");
/// assert!(result.valid);
/// assert_eq!(result.actual_type.as_deref(), Some("image/gif"));
///
/// let result = validate_file_content(gif, "image/png");
/// assert!(!result.valid);
/// assert_eq!(result.detected_type.as_deref(), Some("image/gif"));
/// ```
#[must_use]
pub fn validate_file_content(data: &[u8], declared_type: &str) -> ValidationResult {
    match check_content(data, declared_type) {
        Ok(actual_type) => ValidationResult::accepted(actual_type),
        Err(err) => ValidationResult::rejected(err),
    }
}

/// Returns the canonical type `data` was verified as
pub(crate) fn check_content(data: &[u8], declared_type: &str) -> ValidationOutcome<&'static str> {
    if data.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let declared = normalize_mime_type(declared_type);
    let signature = lookup(&declared).ok_or_else(|| ValidationError::UnsupportedDeclaredType {
        declared: declared.clone(),
    })?;

    if signature.matches(data) {
        Ok(signature.mime_type)
    } else {
        Err(ValidationError::ContentTypeMismatch {
            declared,
            detected: identify(data),
        })
    }
}
