//! Integration tests for the validation pipeline
//!
//! Drives the public entry points end to end with realistic file headers.

use serde_json::json;
use upload_guard::prelude::*;
use upload_guard::policy::MIB;

const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];
const MZ: &[u8] = b"MZ\x90\x00\x03\x00\x00\x00\x04\x00\x00\x00\xFF\xFF";
const SVG_WITH_SCRIPT: &[u8] =
    br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(document.cookie)</script></svg>"#;

/// Helper to run the default pipeline with default options
fn validate(data: &[u8], filename: &str, declared: &str) -> ValidationResult {
    validate_file(data, filename, declared, &ValidationOptions::default())
}

#[test]
fn test_png_pipeline_succeeds() {
    let result = validate(PNG, "holiday.png", "image/png");

    assert!(result.valid);
    assert!(result.error.is_none());
    assert!(result.warnings.is_empty());

    let metadata = result.metadata.expect("accepted uploads carry metadata");
    assert_eq!(metadata.actual_type, "image/png");
    assert!(metadata.sanitized_filename.starts_with("holiday_"));
    assert!(metadata.sanitized_filename.ends_with(".png"));
    assert_eq!(metadata.threats, Some(vec![]));
}

#[test]
fn test_empty_input_always_fails() {
    for declared in ["image/png", "application/pdf", "audio/mpeg", "text/plain"] {
        let result = validate(&[], "empty", declared);
        assert!(!result.valid, "{declared}");
    }
    assert!(!validate_file_content(&[], "image/png").valid);
}

#[test]
fn test_executable_disguised_as_image() {
    let result = validate(MZ, "kitten.jpg", "image/jpeg");
    assert!(!result.valid);
    // Content check fails before the scanner ever runs
    assert!(matches!(
        result.error,
        Some(ValidationError::ContentTypeMismatch { .. })
    ));

    let report = scan_file_for_threats(MZ, "kitten.jpg", Some("image/jpeg"));
    assert_eq!(report.severity, Some(Severity::High));
}

#[test]
fn test_svg_with_script_rejected() {
    let result = validate(SVG_WITH_SCRIPT, "logo.svg", "image/svg+xml");

    assert!(!result.valid);
    assert!(matches!(
        result.error,
        Some(ValidationError::HighSeverityThreat { count }) if count >= 1
    ));
    let threats = result.metadata.unwrap().threats.unwrap();
    assert!(threats.iter().any(|t| t.severity == Severity::High));
}

#[test]
fn test_svg_foreign_object_warns() {
    let svg = br#"<svg><foreignObject width="100" height="50"><p>Hello</p></foreignObject></svg>"#;
    let result = validate(svg, "card.svg", "image/svg+xml");

    assert!(result.valid, "{:?}", result.error);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains("medium"));
}

#[test]
fn test_skip_threat_scan_leaves_no_threats() {
    let options = ValidationOptions::builder().skip_threat_scan(true).build();
    let result = validate_file(SVG_WITH_SCRIPT, "logo.svg", "image/svg+xml", &options);

    assert!(result.valid);
    assert!(result.metadata.unwrap().threats.is_none());
}

#[test]
fn test_allow_list_and_size_override() {
    let options = ValidationOptions::builder()
        .allowed_types(get_allowed_mime_types("avatar"))
        .build();
    let result = validate_file(b"%PDF-1.7", "cv.pdf", "application/pdf", &options);
    assert_eq!(result.error.as_ref().map(ValidationError::code), Some("type_not_allowed"));

    let options = ValidationOptions::builder().max_size(8).build();
    let result = validate_file(PNG, "a.png", "image/png", &options);
    assert_eq!(result.error.as_ref().map(ValidationError::code), Some("size_exceeded"));
}

#[test]
fn test_size_messages_use_mib() {
    let err = check_file_size(11 * MIB, "image/png").unwrap_err();
    assert_eq!(
        err.to_string(),
        "File size 11.00 MiB (11534336 bytes) exceeds the 10.00 MiB limit (10485760 bytes) for image/png"
    );
    assert!(check_file_size(6 * MIB, "text/plain").is_err());
    assert!(check_file_size(99 * MIB, "video/webm").is_ok());
}

#[test]
fn test_result_json_shape() {
    let rejected = validate(PNG, "a.png", "image/jpeg");
    let value = serde_json::to_value(&rejected).unwrap();
    assert_eq!(
        value,
        json!({
            "valid": false,
            "detectedType": "image/png",
            "error": "File content does not match declared type image/jpeg (detected: image/png)",
        })
    );

    let accepted = serde_json::to_value(validate(PNG, "a.png", "image/png")).unwrap();
    assert_eq!(accepted["valid"], true);
    assert_eq!(accepted["actualType"], "image/png");
    assert_eq!(accepted["metadata"]["actualType"], "image/png");
    assert!(accepted["metadata"]["sanitizedFilename"].is_string());
    assert_eq!(accepted["metadata"]["threats"], json!([]));
}

#[test]
fn test_repeated_calls_agree() {
    let first = validate(SVG_WITH_SCRIPT, "logo.svg", "image/svg+xml");
    let second = validate(SVG_WITH_SCRIPT, "logo.svg", "image/svg+xml");
    assert_eq!(first.valid, second.valid);
    assert_eq!(first.error, second.error);
    assert_eq!(
        first.metadata.unwrap().threats,
        second.metadata.unwrap().threats
    );

    assert_eq!(detect_file_type(PNG), detect_file_type(PNG));
}

#[test]
fn test_custom_scanner_plugs_in() {
    struct Paranoid;

    impl ThreatScanner for Paranoid {
        fn scan(&self, _data: &[u8], filename: &str, _declared: Option<&str>) -> ThreatReport {
            let threats = if filename.contains("evil") {
                vec![Threat {
                    kind: upload_guard::ThreatKind::EmbeddedExtension,
                    severity: Severity::High,
                    description: "Suspicious name".to_string(),
                }]
            } else {
                Vec::new()
            };
            ThreatReport::from_threats(threats)
        }

        fn name(&self) -> &'static str {
            "Paranoid"
        }
    }

    let validator = FileValidator::new().with_scanner(Paranoid);
    let options = ValidationOptions::default();
    assert!(validator.validate(PNG, "fine.png", "image/png", &options).valid);
    assert!(!validator.validate(PNG, "evil.png", "image/png", &options).valid);
}

#[test]
#[ignore = "polyglot JPEG/ZIP files are not detected yet"]
fn test_polyglot_jpeg_zip_rejected() {
    // A JPEG header followed by an appended ZIP central directory
    let mut polyglot = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    polyglot.extend_from_slice(&[0u8; 32]);
    polyglot.extend_from_slice(b"PK\x05\x06\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0\0");

    let result = validate(&polyglot, "photo.jpg", "image/jpeg");
    assert!(!result.valid);
}
