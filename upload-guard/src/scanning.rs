//! Heuristic threat scanning for uploaded files
//!
//! This is a fast first line of defense, not an antivirus. It looks for:
//!
//! - native executables hiding behind an innocent name or content type
//! - NUL bytes in the filename (truncation attacks)
//! - script injection in text, markup and vector image formats
//! - `foreignObject` in SVG, which can smuggle HTML past naive sanitizers
//!
//! Every check runs independently and every hit is reported. The overall
//! severity of a report is the highest severity among its threats.
//!
//! # Examples
//!
//! ```rust
//! use upload_guard::scanning::{HeuristicScanner, Severity, ThreatScanner};
//!
//! let scanner = HeuristicScanner::new();
//!
//! let report = scanner.scan(b"MZ\x90\x00", "invoice.pdf", Some("application/pdf"));
//! assert!(!report.safe);
//! assert_eq!(report.severity, Some(Severity::High));
//!
//! let report = scanner.scan(b"plain old text", "notes.txt", Some("text/plain"));
//! assert!(report.safe);
//! ```

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mime_type::{is_text_like, normalize_mime_type};

/// Bytes of a text-like file decoded and scanned by default
pub const DEFAULT_TEXT_SCAN_LIMIT: usize = 10_000;

const TEXT_EXTENSIONS: &[&str] = &["html", "htm", "svg", "xml", "json"];

const EXECUTABLE_SIGNATURES: &[(&str, &[u8])] = &[
    ("Windows/DOS executable (MZ header)", b"MZ"),
    ("ELF executable", b"\x7fELF"),
    ("Mach-O executable (32-bit)", &[0xFE, 0xED, 0xFA, 0xCE]),
    ("Mach-O executable (64-bit)", &[0xFE, 0xED, 0xFA, 0xCF]),
    ("Mach-O executable (32-bit, byte-swapped)", &[0xCE, 0xFA, 0xED, 0xFE]),
    ("Mach-O executable (64-bit, byte-swapped)", &[0xCF, 0xFA, 0xED, 0xFE]),
    ("Mach-O universal binary", &[0xCA, 0xFE, 0xBA, 0xBE]),
];

/// How dangerous a detected threat is
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational; worth a human look
    Low,
    /// Suspicious but not blocking on its own
    Medium,
    /// Blocks the upload
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Which check produced a threat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatKind {
    /// Leading bytes are a native executable header
    Executable,
    /// Filename contains a NUL byte
    NullByteFilename,
    /// Script tags, script URIs, event handlers, eval or DOM writes
    ScriptInjection,
    /// Mentions a file with an executable extension
    EmbeddedExtension,
    /// SVG `foreignObject` element
    SvgForeignObject,
    /// `#!` interpreter line at the start of the file
    InterpreterDirective,
}

/// A single finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Threat {
    /// Check that fired
    pub kind: ThreatKind,
    /// How dangerous the finding is
    pub severity: Severity,
    /// Human-readable description
    pub description: String,
}

impl Threat {
    fn new(kind: ThreatKind, severity: Severity, description: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            description: description.into(),
        }
    }
}

impl fmt::Display for Threat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Outcome of a threat scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreatReport {
    /// True iff no threats were found
    pub safe: bool,
    /// Every finding, in check order
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub threats: Vec<Threat>,
    /// Highest severity among the findings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl ThreatReport {
    /// A report with no findings
    #[must_use]
    pub const fn clean() -> Self {
        Self {
            safe: true,
            threats: Vec::new(),
            severity: None,
        }
    }

    /// Builds a report, aggregating severity
    #[must_use]
    pub fn from_threats(threats: Vec<Threat>) -> Self {
        let severity = threats.iter().map(|threat| threat.severity).max();
        Self {
            safe: threats.is_empty(),
            threats,
            severity,
        }
    }

    /// Number of findings at `severity`
    #[must_use]
    pub fn count_at(&self, severity: Severity) -> usize {
        self.threats
            .iter()
            .filter(|threat| threat.severity == severity)
            .count()
    }
}

/// Trait for threat scanning implementations
///
/// Scanners are pure: the same input always yields the same report.
pub trait ThreatScanner: Send + Sync {
    /// Scans file content and its name
    ///
    /// `declared_type` is the client-supplied MIME type, if any; it decides
    /// which content checks apply, never whether the file is safe.
    fn scan(&self, data: &[u8], filename: &str, declared_type: Option<&str>) -> ThreatReport;

    /// Returns the name of the scanner implementation
    fn name(&self) -> &'static str;
}

struct ContentPattern {
    kind: ThreatKind,
    severity: Severity,
    description: &'static str,
    regex: Regex,
}

fn pattern(
    kind: ThreatKind,
    severity: Severity,
    description: &'static str,
    source: &str,
) -> ContentPattern {
    ContentPattern {
        kind,
        severity,
        description,
        regex: Regex::new(source).expect("built-in threat pattern must compile"),
    }
}

static CONTENT_PATTERNS: Lazy<Vec<ContentPattern>> = Lazy::new(|| {
    use Severity::{High, Low};
    use ThreatKind::{EmbeddedExtension, ScriptInjection};

    vec![
        pattern(ScriptInjection, High, "Inline script tag", r"(?i)<\s*script\b"),
        pattern(ScriptInjection, High, "JavaScript URI", r"(?i)javascript\s*:"),
        pattern(ScriptInjection, High, "VBScript URI", r"(?i)vbscript\s*:"),
        pattern(
            ScriptInjection,
            High,
            "Inline event handler",
            r#"(?i)<[^>]*\son[a-z]+\s*="#,
        ),
        pattern(ScriptInjection, High, "Dynamic code evaluation", r"(?i)\beval\s*\("),
        pattern(
            ScriptInjection,
            High,
            "DOM write call",
            r"(?i)document\s*\.\s*write(?:ln)?\s*\(|\.\s*(?:inner|outer)html\s*=",
        ),
        pattern(ScriptInjection, High, "Embedded iframe", r"(?i)<\s*iframe\b"),
        pattern(
            EmbeddedExtension,
            Low,
            "Reference to executable file extension",
            r"(?i)\.(?:exe|dll|bat|cmd|scr|vbs|js)\b",
        ),
    ]
});

static SVG_FOREIGN_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(?:svg:)?foreignObject\b").expect("built-in SVG pattern must compile")
});

/// Default scanner built from fast byte and pattern heuristics
#[derive(Debug, Clone)]
pub struct HeuristicScanner {
    text_scan_limit: usize,
}

impl Default for HeuristicScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl HeuristicScanner {
    /// Creates a scanner with the default text window
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text_scan_limit: DEFAULT_TEXT_SCAN_LIMIT,
        }
    }

    /// Creates a scanner that decodes at most `limit` bytes of text
    #[must_use]
    pub const fn with_text_scan_limit(limit: usize) -> Self {
        Self {
            text_scan_limit: limit,
        }
    }

    /// Bytes of text-like content decoded per file
    #[must_use]
    pub const fn text_scan_limit(&self) -> usize {
        self.text_scan_limit
    }

    fn check_leading_bytes(data: &[u8], threats: &mut Vec<Threat>) {
        for (name, magic) in EXECUTABLE_SIGNATURES {
            if data.starts_with(magic) {
                threats.push(Threat::new(
                    ThreatKind::Executable,
                    Severity::High,
                    format!("Embedded executable: {name}"),
                ));
            }
        }

        if data.starts_with(b"#!") {
            threats.push(Threat::new(
                ThreatKind::InterpreterDirective,
                Severity::Medium,
                "Script interpreter directive (#!)",
            ));
        }
    }

    fn check_filename(filename: &str, threats: &mut Vec<Threat>) {
        if filename.contains('\0') {
            threats.push(Threat::new(
                ThreatKind::NullByteFilename,
                Severity::Medium,
                "Null byte in filename",
            ));
        }
    }

    fn check_text(&self, data: &[u8], is_svg: bool, threats: &mut Vec<Threat>) {
        let window = &data[..data.len().min(self.text_scan_limit)];
        let text = String::from_utf8_lossy(window);

        for pattern in CONTENT_PATTERNS.iter() {
            if pattern.regex.is_match(&text) {
                threats.push(Threat::new(
                    pattern.kind,
                    pattern.severity,
                    format!("Suspicious content: {}", pattern.description),
                ));
            }
        }

        if is_svg && SVG_FOREIGN_OBJECT.is_match(&text) {
            threats.push(Threat::new(
                ThreatKind::SvgForeignObject,
                Severity::Medium,
                "SVG contains foreignObject element",
            ));
        }
    }
}

impl ThreatScanner for HeuristicScanner {
    fn scan(&self, data: &[u8], filename: &str, declared_type: Option<&str>) -> ThreatReport {
        let mut threats = Vec::new();
        let declared = declared_type.map(normalize_mime_type);
        let extension = extension_of(filename);

        Self::check_leading_bytes(data, &mut threats);
        Self::check_filename(filename, &mut threats);

        let text_like = declared.as_deref().is_some_and(is_text_like)
            || extension
                .as_deref()
                .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext));
        if text_like {
            let is_svg = declared.as_deref() == Some("image/svg+xml")
                || extension.as_deref() == Some("svg");
            self.check_text(data, is_svg, &mut threats);
        }

        let report = ThreatReport::from_threats(threats);
        debug!(
            scanner = self.name(),
            threats = report.threats.len(),
            severity = ?report.severity,
            "Threat scan complete"
        );
        report
    }

    fn name(&self) -> &'static str {
        "Heuristic Scanner"
    }
}

/// Lowercased extension of the final path segment
fn extension_of(filename: &str) -> Option<String> {
    let segment = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Scans a file with the default heuristic scanner
///
/// # Examples
///
/// ```rust
/// use upload_guard::scan_file_for_threats;
///
/// let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#;
/// let report = scan_file_for_threats(svg, "logo.svg", Some("image/svg+xml"));
/// assert!(!report.safe);
/// ```
#[must_use]
pub fn scan_file_for_threats(
    data: &[u8],
    filename: &str,
    declared_type: Option<&str>,
) -> ThreatReport {
    HeuristicScanner::new().scan(data, filename, declared_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(report: &ThreatReport) -> Vec<ThreatKind> {
        report.threats.iter().map(|threat| threat.kind).collect()
    }

    #[test]
    fn test_patterns_compile() {
        assert_eq!(CONTENT_PATTERNS.len(), 8);
        assert!(SVG_FOREIGN_OBJECT.is_match("<foreignObject>"));
    }

    #[test]
    fn test_mz_header_is_high() {
        let report = scan_file_for_threats(b"MZ\x90\x00\x03", "photo.jpg", Some("image/jpeg"));
        assert!(!report.safe);
        assert_eq!(report.severity, Some(Severity::High));
        assert_eq!(kinds(&report), vec![ThreatKind::Executable]);
    }

    #[test]
    fn test_elf_and_macho_headers() {
        for header in [
            b"\x7fELF\x02\x01".as_slice(),
            &[0xFE, 0xED, 0xFA, 0xCF, 0x07],
            &[0xCF, 0xFA, 0xED, 0xFE, 0x07],
            &[0xCA, 0xFE, 0xBA, 0xBE, 0x00],
        ] {
            let report = scan_file_for_threats(header, "data.bin", None);
            assert_eq!(report.severity, Some(Severity::High), "{header:?}");
        }
    }

    #[test]
    fn test_clean_binary() {
        let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        let report = scan_file_for_threats(&png, "image.png", Some("image/png"));
        assert_eq!(report, ThreatReport::clean());
    }

    #[test]
    fn test_binary_types_not_text_scanned() {
        // Script markup inside a PNG is not decoded as text
        let report = scan_file_for_threats(b"\x89PNG<script>", "image.png", Some("image/png"));
        assert!(report.safe);
    }

    #[test]
    fn test_null_byte_filename() {
        let report = scan_file_for_threats(b"hello", "shell.php\0.jpg", Some("image/jpeg"));
        assert_eq!(kinds(&report), vec![ThreatKind::NullByteFilename]);
        assert_eq!(report.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_html_script_detected_by_extension() {
        let report = scan_file_for_threats(b"<html><script>x()</script></html>", "page.html", None);
        assert_eq!(report.severity, Some(Severity::High));
        assert!(kinds(&report).contains(&ThreatKind::ScriptInjection));
    }

    #[test]
    fn test_text_patterns() {
        let cases: &[&[u8]] = &[
            b"<a href=\"javascript:alert(1)\">x</a>",
            b"<img src=x onerror=alert(1)>",
            b"var x = eval ('2+2');",
            b"document.write('<b>')",
            b"el.innerHTML = payload",
            b"<IFRAME src=//evil>",
            b"<a href='VBScript:msgbox'>",
        ];
        for content in cases {
            let report = scan_file_for_threats(content, "notes.txt", Some("text/plain"));
            assert_eq!(
                report.severity,
                Some(Severity::High),
                "{}",
                String::from_utf8_lossy(content)
            );
        }
    }

    #[test]
    fn test_plain_prose_not_flagged() {
        let report = scan_file_for_threats(
            b"Meeting notes: only one = enough. Evaluate options.",
            "notes.txt",
            Some("text/plain"),
        );
        assert!(report.safe, "{:?}", report.threats);
    }

    #[test]
    fn test_embedded_extension_is_low() {
        let report = scan_file_for_threats(
            b"Run setup.exe from the install media",
            "readme.txt",
            Some("text/plain"),
        );
        assert_eq!(kinds(&report), vec![ThreatKind::EmbeddedExtension]);
        assert_eq!(report.severity, Some(Severity::Low));
    }

    #[test]
    fn test_json_extension_not_matched_as_js() {
        let report = scan_file_for_threats(b"see config.json", "readme.txt", Some("text/plain"));
        assert!(report.safe);
    }

    #[test]
    fn test_svg_script_distinct_from_foreign_object() {
        let script = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(1)</script></svg>"#;
        let report = scan_file_for_threats(script, "logo.svg", Some("image/svg+xml"));
        assert_eq!(report.severity, Some(Severity::High));
        assert!(kinds(&report).contains(&ThreatKind::ScriptInjection));
        assert!(!kinds(&report).contains(&ThreatKind::SvgForeignObject));

        let foreign = br#"<svg><foreignObject width="10"><div>hi</div></foreignObject></svg>"#;
        let report = scan_file_for_threats(foreign, "logo.svg", Some("image/svg+xml"));
        assert_eq!(kinds(&report), vec![ThreatKind::SvgForeignObject]);
        assert_eq!(report.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_foreign_object_only_checked_for_svg() {
        let report = scan_file_for_threats(b"<foreignObject/>", "data.xml", Some("application/xml"));
        assert!(report.safe);
    }

    #[test]
    fn test_checks_are_additive() {
        let content = br#"<svg><foreignObject><iframe src="x"></iframe></foreignObject></svg>"#;
        let report = scan_file_for_threats(content, "a\0.svg", Some("image/svg+xml"));
        let found = kinds(&report);
        assert!(found.contains(&ThreatKind::NullByteFilename));
        assert!(found.contains(&ThreatKind::ScriptInjection));
        assert!(found.contains(&ThreatKind::SvgForeignObject));
        assert_eq!(report.severity, Some(Severity::High));
    }

    #[test]
    fn test_scan_window_is_bounded() {
        let mut content = vec![b'a'; 64];
        content.extend_from_slice(b"<script>");
        let narrow = HeuristicScanner::with_text_scan_limit(32);
        assert!(narrow.scan(&content, "x.html", None).safe);

        let wide = HeuristicScanner::with_text_scan_limit(1024);
        assert!(!wide.scan(&content, "x.html", None).safe);
    }

    #[test]
    fn test_invalid_utf8_still_scanned() {
        let content = b"\xff\xfe<script>alert(1)</script>";
        let report = scan_file_for_threats(content, "x.htm", None);
        assert_eq!(report.severity, Some(Severity::High));
    }

    #[test]
    fn test_interpreter_directive() {
        let report = scan_file_for_threats(b"#!/bin/sh\nrm -rf /", "run.txt", Some("text/plain"));
        assert_eq!(kinds(&report), vec![ThreatKind::InterpreterDirective]);
        assert_eq!(report.severity, Some(Severity::Medium));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert_eq!(Severity::High.to_string(), "high");
    }

    #[test]
    fn test_report_serialization() {
        let clean = serde_json::to_value(ThreatReport::clean()).unwrap();
        assert_eq!(clean, serde_json::json!({ "safe": true }));

        let report = scan_file_for_threats(b"MZ", "a.exe", None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["severity"], "high");
        assert_eq!(value["threats"][0]["kind"], "executable");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("dir.d/Page.HTML").as_deref(), Some("html"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
