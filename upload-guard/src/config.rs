//! Configuration management for upload-guard
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `UPLOAD_GUARD_` prefix, `__` for nesting)
//! 2. `./upload-guard.toml` (development)
//! 3. `~/.config/upload-guard/config.toml` (user config, XDG)
//! 4. Hardcoded defaults (fallback)
//!
//! Environment variable format: `UPLOAD_GUARD_SECTION__FIELD_NAME`, for
//! example `UPLOAD_GUARD_SCANNING__TEXT_SCAN_LIMIT=4096`.
//!
//! # Example Configuration
//!
//! ```toml
//! # upload-guard.toml
//! [limits]
//! default_max_bytes = 5242880
//! rules = [
//!     { pattern = "image/*", max_bytes = 10485760 },
//!     { pattern = "image/gif", max_bytes = 2097152 },
//!     { pattern = "application/pdf", max_bytes = 26214400 },
//! ]
//!
//! [scanning]
//! enabled = true
//! text_scan_limit = 10000
//!
//! [contexts]
//! avatar = ["image/jpeg", "image/png", "image/webp"]
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::policy::{default_rules, SizeRule, DEFAULT_MAX_BYTES};
use crate::scanning::DEFAULT_TEXT_SCAN_LIMIT;

const ENV_PREFIX: &str = "UPLOAD_GUARD_";
const LOCAL_CONFIG: &str = "./upload-guard.toml";

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadGuardConfig {
    /// Size ceilings
    pub limits: LimitsSettings,
    /// Threat scanner settings
    pub scanning: ScanningSettings,
    /// Allowed types per upload context
    pub contexts: ContextSettings,
}

/// Size policy configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsSettings {
    /// Ceiling for types no rule matches
    pub default_max_bytes: u64,
    /// Category rules; the most specific match wins
    pub rules: Vec<SizeRule>,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            default_max_bytes: DEFAULT_MAX_BYTES,
            rules: default_rules(),
        }
    }
}

/// Threat scanner configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanningSettings {
    /// Run the threat scan during validation
    pub enabled: bool,
    /// Bytes of text-like content decoded per file
    pub text_scan_limit: usize,
}

impl Default for ScanningSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            text_scan_limit: DEFAULT_TEXT_SCAN_LIMIT,
        }
    }
}

/// Allowed MIME types per upload context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    /// General media uploads
    pub media: Vec<String>,
    /// Profile pictures
    pub avatar: Vec<String>,
    /// Audio-only uploads
    pub audio: Vec<String>,
}

fn owned(types: &[&str]) -> Vec<String> {
    types.iter().map(|t| (*t).to_string()).collect()
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            media: owned(&[
                "image/jpeg",
                "image/png",
                "image/gif",
                "image/webp",
                "video/mp4",
                "video/webm",
                "video/quicktime",
                "audio/mpeg",
                "audio/wav",
                "audio/ogg",
                "application/pdf",
            ]),
            avatar: owned(&["image/jpeg", "image/png", "image/gif", "image/webp"]),
            audio: owned(&[
                "audio/mpeg",
                "audio/wav",
                "audio/ogg",
                "audio/flac",
                "audio/mp4",
                "audio/aac",
            ]),
        }
    }
}

impl ContextSettings {
    /// Allowed types for `context`
    #[must_use]
    pub fn allowed(&self, context: UploadContext) -> &[String] {
        match context {
            UploadContext::Media => &self.media,
            UploadContext::Avatar => &self.avatar,
            UploadContext::Audio => &self.audio,
        }
    }
}

/// Upload surfaces with distinct allow-lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadContext {
    /// General media (the fallback)
    #[default]
    Media,
    /// Profile pictures
    Avatar,
    /// Audio-only
    Audio,
}

impl UploadContext {
    /// Every context
    pub const ALL: [Self; 3] = [Self::Media, Self::Avatar, Self::Audio];

    /// Resolves a context name; unknown names fall back to `Media`
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "avatar" => Self::Avatar,
            "audio" => Self::Audio,
            _ => Self::Media,
        }
    }

    /// Configuration key of the context
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Media => "media",
            Self::Avatar => "avatar",
            Self::Audio => "audio",
        }
    }
}

impl FromStr for UploadContext {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s))
    }
}

impl fmt::Display for UploadContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl UploadGuardConfig {
    /// Load configuration from the standard locations
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be parsed,
    /// or if a value has the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // User config: ~/.config/upload-guard/config.toml
        let user_config = Self::recommended_path();
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        // Local config: ./upload-guard.toml
        let local_config = PathBuf::from(LOCAL_CONFIG);
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// A missing file yields the defaults; environment variables still
    /// override everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the file contains invalid TOML or a value has the
    /// wrong type.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;
        Ok(config)
    }

    /// Get the recommended XDG config path
    ///
    /// # Example
    ///
    /// ```rust
    /// use upload_guard::config::UploadGuardConfig;
    ///
    /// let path = UploadGuardConfig::recommended_path();
    /// assert!(path.ends_with("config.toml"));
    /// ```
    #[must_use]
    pub fn recommended_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from(LOCAL_CONFIG),
            |config_dir| config_dir.join("upload-guard").join("config.toml"),
        )
    }

    /// Checks values serde cannot
    ///
    /// # Errors
    ///
    /// Returns an error if the scan window is zero or any upload context has
    /// an empty allow-list. Size rules are checked when the policy is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanning.text_scan_limit == 0 {
            return Err(ConfigError::InvalidScanLimit);
        }
        for context in UploadContext::ALL {
            if self.contexts.allowed(context).is_empty() {
                return Err(ConfigError::EmptyContext(context.as_str()));
            }
        }
        Ok(())
    }
}

/// Allowed MIME types for an upload context under the default configuration
///
/// Unknown contexts fall back to `media`.
///
/// # Examples
///
/// ```rust
/// use upload_guard::get_allowed_mime_types;
///
/// assert_eq!(get_allowed_mime_types("avatar").len(), 4);
/// assert_eq!(get_allowed_mime_types("no-such-context"), get_allowed_mime_types("media"));
/// ```
#[must_use]
pub fn get_allowed_mime_types(context: &str) -> Vec<String> {
    ContextSettings::default()
        .allowed(UploadContext::from_name(context))
        .to_vec()
}
