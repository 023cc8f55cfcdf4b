//! Filename sanitization
//!
//! Uploaded filenames are attacker-controlled. Before a name reaches the
//! storage layer it is reduced to its final path segment, restricted to
//! `[A-Za-z0-9._-]`, kept away from dotfile conventions and tagged with a
//! uniqueness token so identical names never collide.
//!
//! # Examples
//!
//! ```rust
//! use upload_guard::sanitize_filename_with_token;
//!
//! assert_eq!(sanitize_filename_with_token("../../etc/passwd", 42), "passwd_42");
//! assert_eq!(sanitize_filename_with_token(".htaccess", 42), "__42.htaccess");
//! assert_eq!(sanitize_filename_with_token("my photo.JPG", 42), "my_photo_42.JPG");
//! ```

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Longest name, in bytes, the sanitizer will produce before the token
pub const MAX_FILENAME_LENGTH: usize = 255;

const FALLBACK_NAME: &str = "file";

static LAST_TOKEN: AtomicI64 = AtomicI64::new(0);

/// Sanitizes a filename and appends a millisecond timestamp token
///
/// Tokens are strictly increasing within the process, so two uploads of the
/// same name sanitize to different results even within one millisecond.
/// The result never contains `/`, `\` or NUL.
#[must_use]
pub fn sanitize_filename(raw: &str) -> String {
    sanitize_filename_with_token(raw, next_token())
}

/// Sanitizes a filename using a caller-supplied uniqueness token
#[must_use]
pub fn sanitize_filename_with_token(raw: &str, token: i64) -> String {
    let cleaned = clean_filename(raw);
    match cleaned.rfind('.') {
        Some(dot) => {
            let (stem, extension) = cleaned.split_at(dot);
            format!("{stem}_{token}{extension}")
        }
        None => format!("{cleaned}_{token}"),
    }
}

/// Applies every sanitization step except the uniqueness token
///
/// Comparing this against the raw input tells whether the client's name had
/// to be altered.
#[must_use]
pub fn clean_filename(raw: &str) -> String {
    let segment = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let segment = match segment {
        "." | ".." => "",
        other => other,
    };

    let mut cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.starts_with('.') {
        cleaned.insert(0, '_');
    }
    if cleaned.is_empty() {
        cleaned.push_str(FALLBACK_NAME);
    }

    truncate_stem(cleaned)
}

/// Shortens the stem so the whole name fits, keeping the extension
fn truncate_stem(name: String) -> String {
    if name.len() <= MAX_FILENAME_LENGTH {
        return name;
    }

    // Only ASCII survives cleaning, so byte indices are char boundaries
    match name.rfind('.') {
        Some(dot) if name.len() - dot < MAX_FILENAME_LENGTH => {
            let extension = &name[dot..];
            let keep = MAX_FILENAME_LENGTH - extension.len();
            format!("{}{extension}", &name[..keep])
        }
        _ => name[..MAX_FILENAME_LENGTH].to_string(),
    }
}

fn next_token() -> i64 {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_TOKEN
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or(now);
    now.max(previous + 1)
}
