//! upload-guard: content-based security validation for file uploads
//!
//! Decides whether an uploaded byte sequence is safe to persist and serve,
//! without trusting the filename or content type the client claims.
//!
//! # Design Principles
//!
//! 1. **Content Over Claims**: Types are verified from magic numbers, never from headers
//! 2. **Most Specific Wins**: Size limits resolve by explicit specificity, not declaration order
//! 3. **Rejections Are Values**: Expected failures come back in a [`ValidationResult`]
//! 4. **Pure and Shareable**: Every table is a `static`; every type is `Send + Sync`
//!
//! # Quick Start
//!
//! ```rust
//! use upload_guard::prelude::*;
//!
//! let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
//! let options = ValidationOptions::for_context("avatar");
//!
//! let result = validate_file(&png, "../../me.png", "image/png", &options);
//! assert!(result.valid);
//! assert_eq!(result.warnings, ["filename was sanitized"]);
//!
//! let stored_as = result.metadata.unwrap().sanitized_filename;
//! assert!(stored_as.starts_with("me_") && stored_as.ends_with(".png"));
//! ```
//!
//! # Custom Configuration
//!
//! ```rust,no_run
//! use upload_guard::{config::UploadGuardConfig, FileValidator, ValidationOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = UploadGuardConfig::load()?;
//! let validator = FileValidator::from_config(&config)?;
//!
//! let options = ValidationOptions::builder()
//!     .allowed_types(validator.allowed_types("audio"))
//!     .build();
//! let result = validator.validate(b"fLaC\0\0\0\x22", "song.flac", "audio/flac", &options);
//! # Ok(())
//! # }
//! ```

// Lint configuration is handled at the workspace level in Cargo.toml

pub mod config;
pub mod detection;
pub mod error;
pub mod mime_type;
pub mod observability;
pub mod policy;
pub mod sanitize;
pub mod scanning;
pub mod signatures;
pub mod validation;
pub mod validator;

pub use config::{get_allowed_mime_types, UploadContext, UploadGuardConfig};
pub use detection::{detect_file_type, DetectedType};
pub use error::{ConfigError, ValidationError, ValidationOutcome};
pub use policy::{check_file_size, SizePolicy};
pub use sanitize::{sanitize_filename, sanitize_filename_with_token};
pub use scanning::{
    scan_file_for_threats, HeuristicScanner, Severity, Threat, ThreatKind, ThreatReport,
    ThreatScanner,
};
pub use validation::{validate_file_content, ValidationMetadata, ValidationResult};
pub use validator::{validate_file, FileValidator, ValidationOptions, ValidationOptionsBuilder};

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! # Examples
    //!
    //! ```rust
    //! use upload_guard::prelude::*;
    //! ```

    // Entry points
    pub use crate::{
        check_file_size, detect_file_type, get_allowed_mime_types, sanitize_filename,
        scan_file_for_threats, validate_file, validate_file_content,
    };

    // Pipeline
    pub use crate::validator::{FileValidator, ValidationOptions};
    pub use crate::validation::{ValidationMetadata, ValidationResult};

    // Scanning
    pub use crate::scanning::{HeuristicScanner, Severity, Threat, ThreatReport, ThreatScanner};

    // Error types
    pub use crate::error::{ConfigError, ValidationError};
}
