//! Size limits by content category
//!
//! Each MIME type gets a byte ceiling chosen from a rule table. Rules are
//! either exact (`application/pdf`) or prefix (`image/*`) patterns and the
//! most specific matching rule wins: an exact match always beats a prefix
//! match, and a longer prefix beats a shorter one. Declaration order only
//! breaks ties between identical patterns.
//!
//! # Examples
//!
//! ```rust
//! use upload_guard::policy::{SizePolicy, MIB};
//!
//! let policy = SizePolicy::builder()
//!     .limit("image/*", 2 * MIB)
//!     .limit("image/gif", MIB)
//!     .default_limit(512 * 1024)
//!     .build()?;
//!
//! assert_eq!(policy.limit_for("image/png"), 2 * MIB);
//! assert_eq!(policy.limit_for("image/gif"), MIB);
//! assert_eq!(policy.limit_for("text/plain"), 512 * 1024);
//! # Ok::<(), upload_guard::ConfigError>(())
//! ```

use std::cmp::Reverse;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ValidationError, ValidationOutcome};
use crate::mime_type::normalize_mime_type;

/// One mebibyte
pub const MIB: u64 = 1024 * 1024;

/// Ceiling for `image/*`
pub const IMAGE_MAX_BYTES: u64 = 10 * MIB;
/// Ceiling for `audio/*`
pub const AUDIO_MAX_BYTES: u64 = 50 * MIB;
/// Ceiling for `video/*`
pub const VIDEO_MAX_BYTES: u64 = 100 * MIB;
/// Ceiling for `application/pdf`
pub const PDF_MAX_BYTES: u64 = 25 * MIB;
/// Ceiling for anything no rule matches
pub const DEFAULT_MAX_BYTES: u64 = 5 * MIB;

static DEFAULT_POLICY: Lazy<SizePolicy> = Lazy::new(SizePolicy::default);

/// A size rule as written in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRule {
    /// `type/subtype` for an exact match or `type/*` for a whole category
    pub pattern: String,
    /// Maximum size in bytes
    pub max_bytes: u64,
}

impl SizeRule {
    /// Creates a new rule
    #[must_use]
    pub fn new(pattern: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            pattern: pattern.into(),
            max_bytes,
        }
    }
}

/// Returns the rule table applied when nothing else is configured
#[must_use]
pub fn default_rules() -> Vec<SizeRule> {
    vec![
        SizeRule::new("image/*", IMAGE_MAX_BYTES),
        SizeRule::new("audio/*", AUDIO_MAX_BYTES),
        SizeRule::new("video/*", VIDEO_MAX_BYTES),
        SizeRule::new("application/pdf", PDF_MAX_BYTES),
    ]
}

/// A parsed rule pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MimePattern {
    /// Matches one MIME type
    Exact(String),
    /// Matches every type starting with the prefix (which ends in `/`)
    Prefix(String),
}

impl MimePattern {
    /// Parses `type/subtype` or `type/*`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSizeRule` if the pattern has no `/`, has an
    /// empty part, or uses a wildcard anywhere other than the whole subtype.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |reason| ConfigError::InvalidSizeRule {
            pattern: pattern.to_string(),
            reason,
        };

        let normalized = pattern.trim().to_ascii_lowercase();
        let (top, sub) = normalized
            .split_once('/')
            .ok_or_else(|| invalid("expected type/subtype"))?;

        if top.is_empty() || sub.is_empty() {
            return Err(invalid("type and subtype must not be empty"));
        }
        if top.contains('*') {
            return Err(invalid("wildcard top-level types are not supported"));
        }

        match sub {
            "*" => Ok(Self::Prefix(format!("{top}/"))),
            _ if sub.contains('*') => Err(invalid("wildcards must cover the whole subtype")),
            _ => Ok(Self::Exact(normalized)),
        }
    }

    fn matches(&self, mime_type: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == mime_type,
            Self::Prefix(prefix) => mime_type.starts_with(prefix.as_str()),
        }
    }

    /// Higher sorts first
    fn specificity(&self) -> (bool, usize) {
        match self {
            Self::Exact(exact) => (true, exact.len()),
            Self::Prefix(prefix) => (false, prefix.len()),
        }
    }
}

/// Byte ceilings by MIME category
#[derive(Debug, Clone)]
pub struct SizePolicy {
    /// Sorted most specific first
    rules: Vec<(MimePattern, u64)>,
    default_max: u64,
}

impl Default for SizePolicy {
    /// Images 10 MiB, audio 50 MiB, video 100 MiB, PDF 25 MiB, otherwise 5 MiB
    fn default() -> Self {
        let rules = default_rules()
            .into_iter()
            .filter_map(|rule| {
                MimePattern::parse(&rule.pattern)
                    .ok()
                    .map(|pattern| (pattern, rule.max_bytes))
            })
            .collect();
        Self::from_parsed(rules, DEFAULT_MAX_BYTES)
    }
}

impl SizePolicy {
    /// Creates a new policy builder
    #[must_use]
    pub fn builder() -> SizePolicyBuilder {
        SizePolicyBuilder::new()
    }

    /// Builds a policy from configured rules
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is malformed or any limit is zero.
    pub fn from_rules<I>(rules: I, default_max: u64) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = SizeRule>,
    {
        if default_max == 0 {
            return Err(ConfigError::ZeroLimit {
                pattern: "default".to_string(),
            });
        }

        let parsed = rules
            .into_iter()
            .map(|rule| {
                if rule.max_bytes == 0 {
                    return Err(ConfigError::ZeroLimit {
                        pattern: rule.pattern,
                    });
                }
                MimePattern::parse(&rule.pattern).map(|pattern| (pattern, rule.max_bytes))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_parsed(parsed, default_max))
    }

    fn from_parsed(mut rules: Vec<(MimePattern, u64)>, default_max: u64) -> Self {
        // Stable sort keeps declaration order between identical patterns
        rules.sort_by_key(|(pattern, _)| Reverse(pattern.specificity()));
        Self { rules, default_max }
    }

    /// Returns the ceiling that applies to `mime_type`
    ///
    /// The type is normalized first, so aliases share their canonical limit.
    #[must_use]
    pub fn limit_for(&self, mime_type: &str) -> u64 {
        let normalized = normalize_mime_type(mime_type);
        self.rules
            .iter()
            .find(|(pattern, _)| pattern.matches(&normalized))
            .map_or(self.default_max, |(_, limit)| *limit)
    }

    /// Returns the ceiling used when no rule matches
    #[must_use]
    pub const fn default_limit(&self) -> u64 {
        self.default_max
    }

    /// Checks `size` against the ceiling for `mime_type`
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::SizeExceeded` if `size` is over the limit.
    /// A size exactly at the limit is accepted.
    pub fn check(&self, size: u64, mime_type: &str) -> ValidationOutcome<()> {
        check_against(size, self.limit_for(mime_type), mime_type)
    }
}

pub(crate) fn check_against(size: u64, limit: u64, mime_type: &str) -> ValidationOutcome<()> {
    if size > limit {
        return Err(ValidationError::SizeExceeded {
            actual: size,
            limit,
            mime_type: normalize_mime_type(mime_type),
        });
    }
    Ok(())
}

/// Checks a file size against the default category limits
///
/// # Errors
///
/// Returns `ValidationError::SizeExceeded` with both sizes in the message.
///
/// # Examples
///
/// ```rust
/// use upload_guard::check_file_size;
/// use upload_guard::policy::MIB;
///
/// assert!(check_file_size(10 * MIB, "image/png").is_ok());
/// assert!(check_file_size(10 * MIB + 1, "image/png").is_err());
/// assert!(check_file_size(20 * MIB, "application/pdf").is_ok());
/// ```
pub fn check_file_size(size: u64, mime_type: &str) -> ValidationOutcome<()> {
    DEFAULT_POLICY.check(size, mime_type)
}

/// Builder for size policies
#[derive(Debug)]
pub struct SizePolicyBuilder {
    rules: Vec<SizeRule>,
    default_max: u64,
}

impl Default for SizePolicyBuilder {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            default_max: DEFAULT_MAX_BYTES,
        }
    }
}

impl SizePolicyBuilder {
    /// Creates a builder with no rules and the default ceiling
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule
    #[must_use]
    pub fn limit(mut self, pattern: impl Into<String>, max_bytes: u64) -> Self {
        self.rules.push(SizeRule::new(pattern, max_bytes));
        self
    }

    /// Sets the ceiling for unmatched types
    #[must_use]
    pub const fn default_limit(mut self, max_bytes: u64) -> Self {
        self.default_max = max_bytes;
        self
    }

    /// Builds the policy
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is malformed or any limit is zero.
    pub fn build(self) -> Result<SizePolicy, ConfigError> {
        SizePolicy::from_rules(self.rules, self.default_max)
    }
}
