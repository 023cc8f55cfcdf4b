//! Error types for upload validation
//!
//! Two separate families live here:
//!
//! - [`ValidationError`] describes why an upload was rejected. These are expected
//!   outcomes and travel inside a [`ValidationResult`](crate::ValidationResult)
//!   rather than aborting the caller.
//! - [`ConfigError`] describes a defect in the configuration the engine was built
//!   from. These surface once, at startup, and never per upload.

use serde::{Serialize, Serializer};
use thiserror::Error;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

#[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
fn mib(bytes: &u64) -> f64 {
    *bytes as f64 / BYTES_PER_MIB
}

/// Reasons an uploaded file is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The uploaded byte sequence is empty
    #[error("Empty file buffer")]
    EmptyInput,

    /// The declared MIME type has no signature registered for it
    #[error("Unsupported file type: {declared}")]
    UnsupportedDeclaredType {
        /// Normalized declared type
        declared: String,
    },

    /// The content signature does not match the declared MIME type
    #[error("File content does not match declared type {declared} (detected: {})", .detected.as_deref().unwrap_or("unknown"))]
    ContentTypeMismatch {
        /// Normalized declared type
        declared: String,
        /// What the bytes look like, if anything could be identified
        detected: Option<String>,
    },

    /// The file is larger than the ceiling for its category
    #[error("File size {:.2} MiB ({actual} bytes) exceeds the {:.2} MiB limit ({limit} bytes) for {mime_type}", mib(.actual), mib(.limit))]
    SizeExceeded {
        /// Observed size in bytes
        actual: u64,
        /// Applicable ceiling in bytes
        limit: u64,
        /// MIME type the ceiling was chosen for
        mime_type: String,
    },

    /// The declared type is valid but not accepted on this upload surface
    #[error("File type {declared} is not allowed (allowed: {})", .allowed.join(", "))]
    TypeNotAllowed {
        /// Declared type as supplied by the client
        declared: String,
        /// Types accepted by the caller
        allowed: Vec<String>,
    },

    /// At least one high-severity threat was detected
    #[error("File contains high-severity security threats ({count} found)")]
    HighSeverityThreat {
        /// Number of high-severity threats
        count: usize,
    },
}

impl ValidationError {
    /// Stable machine-readable identifier for the error kind
    ///
    /// # Examples
    ///
    /// ```rust
    /// use upload_guard::ValidationError;
    ///
    /// assert_eq!(ValidationError::EmptyInput.code(), "empty_input");
    /// ```
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyInput => "empty_input",
            Self::UnsupportedDeclaredType { .. } => "unsupported_declared_type",
            Self::ContentTypeMismatch { .. } => "content_type_mismatch",
            Self::SizeExceeded { .. } => "size_exceeded",
            Self::TypeNotAllowed { .. } => "type_not_allowed",
            Self::HighSeverityThreat { .. } => "high_severity_threat",
        }
    }
}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result type for individual validation steps
pub type ValidationOutcome<T> = Result<T, ValidationError>;

/// Defects in the engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration sources could not be read or merged
    #[error("Failed to load configuration: {0}")]
    Load(Box<figment::Error>),

    /// A size rule pattern is malformed
    #[error("Invalid size rule pattern '{pattern}': {reason}")]
    InvalidSizeRule {
        /// Offending pattern
        pattern: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// A size ceiling of zero would reject every upload
    #[error("Size limit for '{pattern}' must be greater than zero")]
    ZeroLimit {
        /// Pattern the limit belongs to
        pattern: String,
    },

    /// An upload context has no allowed types
    #[error("Upload context '{0}' has no allowed MIME types")]
    EmptyContext(&'static str),

    /// The text scan window is unusable
    #[error("Text scan limit must be greater than zero")]
    InvalidScanLimit,
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Load(Box::new(err))
    }
}
