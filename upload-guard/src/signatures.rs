//! File signature (magic number) registry
//!
//! A static table mapping each canonical MIME type to the byte patterns that
//! identify it. Entries are evaluated in declaration order and the table is
//! curated so that no two types can claim the same input: RIFF containers are
//! told apart by the tag at offset 8 and ISO-BMFF (`ftyp`) containers by their
//! brand.
//!
//! Text formats (SVG) are matched after skipping a UTF-8 byte order mark and
//! leading whitespace.

/// A byte pattern expected at a fixed offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry {
    /// Offset of the pattern from the start of the file
    pub offset: usize,
    /// Expected bytes
    pub bytes: &'static [u8],
}

impl SignatureEntry {
    /// Returns true if `data` carries this pattern at its offset
    ///
    /// Inputs too short to hold the whole pattern never match.
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        self.offset
            .checked_add(self.bytes.len())
            .and_then(|end| data.get(self.offset..end))
            .is_some_and(|window| window == self.bytes)
    }
}

/// All entries of a group must match for the group to match
pub type SignatureGroup = &'static [SignatureEntry];

/// A registered file type and its alternative signature groups
#[derive(Debug, Clone, Copy)]
pub struct FileSignature {
    /// Canonical MIME type
    pub mime_type: &'static str,
    /// Human-readable format name
    pub description: &'static str,
    /// Alternative signature groups; any one of them identifies the type
    pub variants: &'static [SignatureGroup],
    /// Text format: offsets count from after a UTF-8 BOM and leading whitespace
    pub text: bool,
}

impl FileSignature {
    /// Returns true if any variant fully matches `data`
    #[must_use]
    pub fn matches(&self, data: &[u8]) -> bool {
        let data = if self.text {
            skip_text_preamble(data)
        } else {
            data
        };
        self.variants
            .iter()
            .any(|group| group.iter().all(|entry| entry.matches(data)))
    }
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Strips a UTF-8 byte order mark and ASCII whitespace from the front
fn skip_text_preamble(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(UTF8_BOM).unwrap_or(data);
    let start = data
        .iter()
        .position(|byte| !byte.is_ascii_whitespace())
        .unwrap_or(data.len());
    &data[start..]
}

macro_rules! at {
    ($offset:expr, $bytes:expr) => {
        SignatureEntry {
            offset: $offset,
            bytes: $bytes,
        }
    };
}

macro_rules! sig {
    (text $mime:expr, $description:expr, [$($group:expr),+ $(,)?] $(,)?) => {
        FileSignature {
            mime_type: $mime,
            description: $description,
            variants: &[$($group),+],
            text: true,
        }
    };
    ($mime:expr, $description:expr, [$($group:expr),+ $(,)?] $(,)?) => {
        FileSignature {
            mime_type: $mime,
            description: $description,
            variants: &[$($group),+],
            text: false,
        }
    };
}

/// The signature registry, in detection order
pub static SIGNATURES: &[FileSignature] = &[
    // Images
    sig!("image/jpeg", "JPEG image", [&[at!(0, &[0xFF, 0xD8, 0xFF])]]),
    sig!(
        "image/png",
        "PNG image",
        [&[at!(0, &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])]],
    ),
    sig!(
        "image/gif",
        "GIF image",
        [&[at!(0, b"GIF87a")], &[at!(0, b"GIF89a")]],
    ),
    sig!(
        "image/webp",
        "WebP image",
        [&[at!(0, b"RIFF"), at!(8, b"WEBP")]],
    ),
    sig!("image/bmp", "BMP image", [&[at!(0, b"BM")]]),
    sig!(
        "image/tiff",
        "TIFF image",
        [
            &[at!(0, &[0x49, 0x49, 0x2A, 0x00])],
            &[at!(0, &[0x4D, 0x4D, 0x00, 0x2A])],
        ],
    ),
    sig!("image/avif", "AVIF image", [&[at!(4, b"ftypavif")]]),
    sig!(
        text "image/svg+xml",
        "SVG image",
        [
            &[at!(0, b"<?xml")],
            &[at!(0, b"<svg")],
            &[at!(0, b"<!DOCTYPE svg")],
        ],
    ),
    // Audio
    sig!(
        "audio/mpeg",
        "MP3 audio",
        [
            &[at!(0, b"ID3")],
            &[at!(0, &[0xFF, 0xFB])],
            &[at!(0, &[0xFF, 0xF3])],
            &[at!(0, &[0xFF, 0xF2])],
        ],
    ),
    sig!(
        "audio/wav",
        "WAV audio",
        [&[at!(0, b"RIFF"), at!(8, b"WAVE")]],
    ),
    sig!("audio/ogg", "Ogg audio", [&[at!(0, b"OggS")]]),
    sig!("audio/flac", "FLAC audio", [&[at!(0, b"fLaC")]]),
    sig!("audio/mp4", "M4A audio", [&[at!(4, b"ftypM4A")]]),
    sig!(
        "audio/aac",
        "AAC audio",
        [&[at!(0, &[0xFF, 0xF1])], &[at!(0, &[0xFF, 0xF9])]],
    ),
    // Video
    sig!(
        "video/mp4",
        "MP4 video",
        [
            &[at!(4, b"ftypisom")],
            &[at!(4, b"ftypmp41")],
            &[at!(4, b"ftypmp42")],
            &[at!(4, b"ftypavc1")],
            &[at!(4, b"ftypMSNV")],
            &[at!(4, b"ftypdash")],
        ],
    ),
    sig!("video/quicktime", "QuickTime video", [&[at!(4, b"ftypqt")]]),
    sig!("video/webm", "WebM video", [&[at!(0, &[0x1A, 0x45, 0xDF, 0xA3])]]),
    sig!(
        "video/x-msvideo",
        "AVI video",
        [&[at!(0, b"RIFF"), at!(8, b"AVI ")]],
    ),
    // Documents
    sig!("application/pdf", "PDF document", [&[at!(0, b"%PDF-")]]),
    sig!(
        "application/zip",
        "ZIP archive",
        [
            &[at!(0, b"PK\x03\x04")],
            &[at!(0, b"PK\x05\x06")],
            &[at!(0, b"PK\x07\x08")],
        ],
    ),
    // Four bytes that can also open an ISO-BMFF box header, so it goes last
    sig!("image/x-icon", "ICO icon", [&[at!(0, &[0x00, 0x00, 0x01, 0x00])]]),
];

/// Looks up the registry entry for a canonical MIME type
///
/// The lookup is exact; callers normalize aliases first (see
/// [`normalize_mime_type`](crate::mime_type::normalize_mime_type)).
///
/// # Examples
///
/// ```rust
/// use upload_guard::signatures::lookup;
///
/// assert!(lookup("image/gif").is_some());
/// assert!(lookup("text/plain").is_none());
/// ```
#[must_use]
pub fn lookup(mime_type: &str) -> Option<&'static FileSignature> {
    SIGNATURES.iter().find(|sig| sig.mime_type == mime_type)
}

/// Iterates over every registered canonical MIME type
pub fn supported_types() -> impl Iterator<Item = &'static str> {
    SIGNATURES.iter().map(|sig| sig.mime_type)
}
