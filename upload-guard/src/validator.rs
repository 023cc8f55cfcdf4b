//! Validation pipeline orchestration
//!
//! [`FileValidator`] runs every check against one upload, in order:
//!
//! 1. allow-list
//! 2. size
//! 3. content signature
//! 4. filename sanitization
//! 5. threat scan
//!
//! The first failing step decides the rejection. Rejections are values in the
//! returned [`ValidationResult`], never panics or `Err`s.
//!
//! # Examples
//!
//! ```rust
//! use upload_guard::{FileValidator, ValidationOptions};
//!
//! let validator = FileValidator::new();
//! let options = ValidationOptions::builder()
//!     .allowed_types(["image/png", "image/jpeg"])
//!     .build();
//!
//! let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
//! let result = validator.validate(&png, "avatar.png", "image/png", &options);
//! assert!(result.valid);
//!
//! let metadata = result.metadata.unwrap();
//! assert!(metadata.sanitized_filename.starts_with("avatar_"));
//! ```

use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::config::{ContextSettings, UploadContext, UploadGuardConfig};
use crate::error::{ConfigError, ValidationError, ValidationOutcome};
use crate::mime_type::normalize_mime_type;
use crate::policy::{check_against, SizePolicy};
use crate::sanitize::{clean_filename, sanitize_filename};
use crate::scanning::{HeuristicScanner, Severity, ThreatReport, ThreatScanner};
use crate::validation::{check_content, ValidationMetadata, ValidationResult};

/// Warning added when the client's filename had to be altered
pub const FILENAME_SANITIZED_WARNING: &str = "filename was sanitized";

static DEFAULT_VALIDATOR: Lazy<FileValidator> = Lazy::new(FileValidator::new);

/// Per-call validation options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Types accepted on this upload surface; `None` accepts any supported type
    pub allowed_types: Option<Vec<String>>,
    /// Size ceiling overriding the category policy
    pub max_size: Option<u64>,
    /// Skip the threat scan entirely
    pub skip_threat_scan: bool,
}

impl ValidationOptions {
    /// Creates a new options builder
    #[must_use]
    pub fn builder() -> ValidationOptionsBuilder {
        ValidationOptionsBuilder::default()
    }

    /// Options restricted to the default allow-list for `context`
    #[must_use]
    pub fn for_context(context: &str) -> Self {
        Self::builder()
            .allowed_types(crate::config::get_allowed_mime_types(context))
            .build()
    }
}

/// Builder for [`ValidationOptions`]
#[derive(Debug, Default)]
pub struct ValidationOptionsBuilder {
    options: ValidationOptions,
}

impl ValidationOptionsBuilder {
    /// Sets the allow-list
    #[must_use]
    pub fn allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.allowed_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Adds one type to the allow-list
    #[must_use]
    pub fn allow(mut self, mime_type: impl Into<String>) -> Self {
        self.options
            .allowed_types
            .get_or_insert_with(Vec::new)
            .push(mime_type.into());
        self
    }

    /// Overrides the category size ceiling
    #[must_use]
    pub const fn max_size(mut self, bytes: u64) -> Self {
        self.options.max_size = Some(bytes);
        self
    }

    /// Skips the threat scan
    #[must_use]
    pub const fn skip_threat_scan(mut self, skip: bool) -> Self {
        self.options.skip_threat_scan = skip;
        self
    }

    /// Builds the options
    #[must_use]
    pub fn build(self) -> ValidationOptions {
        self.options
    }
}

/// Runs the full validation pipeline
///
/// Generic over the [`ThreatScanner`] so deployments can plug in a different
/// scanner without touching the rest of the pipeline.
#[derive(Debug, Clone)]
pub struct FileValidator<S = HeuristicScanner> {
    size_policy: SizePolicy,
    scanner: S,
    contexts: ContextSettings,
    scan_enabled: bool,
}

impl Default for FileValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl FileValidator {
    /// Creates a validator with the default policy and heuristic scanner
    #[must_use]
    pub fn new() -> Self {
        Self {
            size_policy: SizePolicy::default(),
            scanner: HeuristicScanner::new(),
            contexts: ContextSettings::default(),
            scan_enabled: true,
        }
    }

    /// Creates a validator from loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a size rule is malformed, any limit is zero, the
    /// scan window is zero or an upload context is empty.
    pub fn from_config(config: &UploadGuardConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let size_policy = SizePolicy::from_rules(
            config.limits.rules.iter().cloned(),
            config.limits.default_max_bytes,
        )?;

        debug!(
            default_max_bytes = config.limits.default_max_bytes,
            rules = config.limits.rules.len(),
            scan_enabled = config.scanning.enabled,
            "Validator configured"
        );

        Ok(Self {
            size_policy,
            scanner: HeuristicScanner::with_text_scan_limit(config.scanning.text_scan_limit),
            contexts: config.contexts.clone(),
            scan_enabled: config.scanning.enabled,
        })
    }
}

impl<S: ThreatScanner> FileValidator<S> {
    /// Replaces the threat scanner
    #[must_use]
    pub fn with_scanner<T: ThreatScanner>(self, scanner: T) -> FileValidator<T> {
        FileValidator {
            size_policy: self.size_policy,
            scanner,
            contexts: self.contexts,
            scan_enabled: self.scan_enabled,
        }
    }

    /// Replaces the size policy
    #[must_use]
    pub fn with_size_policy(mut self, policy: SizePolicy) -> Self {
        self.size_policy = policy;
        self
    }

    /// The active size policy
    #[must_use]
    pub const fn size_policy(&self) -> &SizePolicy {
        &self.size_policy
    }

    /// The active threat scanner
    #[must_use]
    pub const fn scanner(&self) -> &S {
        &self.scanner
    }

    /// Allowed types for a named upload context; unknown names mean `media`
    #[must_use]
    pub fn allowed_types(&self, context: &str) -> Vec<String> {
        self.contexts
            .allowed(UploadContext::from_name(context))
            .to_vec()
    }

    /// Checks a size against this validator's policy
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::SizeExceeded` if `size` is over the limit.
    pub fn check_size(&self, size: u64, mime_type: &str) -> ValidationOutcome<()> {
        self.size_policy.check(size, mime_type)
    }

    /// Scans a file with this validator's scanner
    #[must_use]
    pub fn scan(&self, data: &[u8], filename: &str, declared_type: Option<&str>) -> ThreatReport {
        self.scanner.scan(data, filename, declared_type)
    }

    /// Validates one upload
    ///
    /// `filename` and `declared_type` are the client's claims; neither is
    /// trusted. On success the result carries the sanitized filename to
    /// store the file under.
    #[must_use]
    pub fn validate(
        &self,
        data: &[u8],
        filename: &str,
        declared_type: &str,
        options: &ValidationOptions,
    ) -> ValidationResult {
        let declared = normalize_mime_type(declared_type);
        debug!(
            filename,
            declared_type = %declared,
            size = data.len(),
            "Validating upload"
        );

        if let Some(allowed) = &options.allowed_types {
            let permitted = allowed
                .iter()
                .any(|candidate| normalize_mime_type(candidate) == declared);
            if !permitted {
                return Self::reject(
                    filename,
                    ValidationError::TypeNotAllowed {
                        declared: declared_type.to_string(),
                        allowed: allowed.clone(),
                    },
                );
            }
        }

        let size = u64::try_from(data.len()).unwrap_or(u64::MAX);
        let size_check = options.max_size.map_or_else(
            || self.size_policy.check(size, &declared),
            |limit| check_against(size, limit, &declared),
        );
        if let Err(err) = size_check {
            return Self::reject(filename, err);
        }

        let actual_type = match check_content(data, &declared) {
            Ok(actual_type) => actual_type.to_string(),
            Err(err) => return Self::reject(filename, err),
        };
        debug!(filename, actual_type = %actual_type, "Content signature verified");

        let mut warnings = Vec::new();
        let sanitized_filename = sanitize_filename(filename);
        if clean_filename(filename) != filename {
            debug!(filename, sanitized = %sanitized_filename, "Filename sanitized");
            warnings.push(FILENAME_SANITIZED_WARNING.to_string());
        }

        if options.skip_threat_scan || !self.scan_enabled {
            return ValidationResult {
                warnings,
                metadata: Some(ValidationMetadata {
                    sanitized_filename,
                    actual_type: actual_type.clone(),
                    threats: None,
                }),
                ..ValidationResult::accepted(actual_type)
            };
        }

        let report = self.scanner.scan(data, filename, Some(&declared));
        let high = report.count_at(Severity::High);
        for threat in &report.threats {
            warn!(
                filename,
                scanner = self.scanner.name(),
                severity = %threat.severity,
                threat = %threat,
                "Threat detected in upload"
            );
        }

        let metadata = ValidationMetadata {
            sanitized_filename,
            actual_type: actual_type.clone(),
            threats: Some(report.threats),
        };

        if high > 0 {
            let error = ValidationError::HighSeverityThreat { count: high };
            warn!(filename, error = %error, code = error.code(), "Upload rejected");
            return ValidationResult {
                valid: false,
                actual_type: Some(actual_type),
                detected_type: None,
                error: Some(error),
                warnings,
                metadata: Some(metadata),
            };
        }

        if let Some(severity) = report.severity {
            let count = metadata.threats.as_ref().map_or(0, Vec::len);
            warnings.push(format!(
                "{count} potential security threat(s) detected ({severity} severity)"
            ));
        }

        debug!(filename, warnings = warnings.len(), "Upload accepted");
        ValidationResult {
            warnings,
            metadata: Some(metadata),
            ..ValidationResult::accepted(actual_type)
        }
    }

    fn reject(filename: &str, error: ValidationError) -> ValidationResult {
        warn!(filename, error = %error, code = error.code(), "Upload rejected");
        ValidationResult::rejected(error)
    }
}

/// Validates one upload with the default policy and scanner
///
/// # Examples
///
/// ```rust
/// use upload_guard::{validate_file, ValidationOptions};
///
/// let exe = b"MZ\x90\x00\x03\x00\x00\x00";
/// let result = validate_file(exe, "cat.jpg", "image/jpeg", &ValidationOptions::default());
/// assert!(!result.valid);
/// ```
#[must_use]
pub fn validate_file(
    data: &[u8],
    filename: &str,
    declared_type: &str,
    options: &ValidationOptions,
) -> ValidationResult {
    DEFAULT_VALIDATOR.validate(data, filename, declared_type, options)
}
