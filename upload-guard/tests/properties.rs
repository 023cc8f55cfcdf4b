//! Property tests for the sanitizer and the size policy

use proptest::prelude::*;
use upload_guard::policy::MIB;
use upload_guard::sanitize::{clean_filename, MAX_FILENAME_LENGTH};
use upload_guard::{check_file_size, sanitize_filename_with_token};

fn mime_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "image/png",
        "image/svg+xml",
        "audio/mp3",
        "video/mp4",
        "application/pdf",
        "application/zip",
        "text/plain",
    ])
}

fn hostile_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        any::<String>(),
        "[./\\\\a-z\\x00 ]{0,40}",
        "(\\.\\./){0,5}[a-zA-Z0-9 ._-]{0,300}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_sanitized_names_are_safe(raw in hostile_name_strategy(), token in 0i64..i64::MAX) {
        let name = sanitize_filename_with_token(&raw, token);

        prop_assert!(!name.is_empty());
        prop_assert!(!name.contains('/'));
        prop_assert!(!name.contains('\\'));
        prop_assert!(!name.contains('\0'));
        prop_assert!(!name.starts_with('.'));
        prop_assert!(name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
        let tag = format!("_{token}");
        prop_assert!(name.contains(&tag));
    }

    #[test]
    fn prop_clean_is_idempotent(raw in hostile_name_strategy()) {
        let once = clean_filename(&raw);
        prop_assert!(once.len() <= MAX_FILENAME_LENGTH);
        prop_assert_eq!(clean_filename(&once), once);
    }

    #[test]
    fn prop_size_boundary_is_monotonic(
        mime in mime_strategy(),
        smaller in 0u64..200 * MIB,
        extra in 0u64..200 * MIB,
    ) {
        let larger = smaller + extra;
        if check_file_size(larger, mime).is_ok() {
            prop_assert!(check_file_size(smaller, mime).is_ok());
        }
        if check_file_size(smaller, mime).is_err() {
            prop_assert!(check_file_size(larger, mime).is_err());
        }
    }
}
