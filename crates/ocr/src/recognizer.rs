use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Source decode error: {0}")]
    Decode(String),
    #[error("OCR engine error: {0}")]
    Engine(String),
}

/// One recognition pass over a source image.
///
/// Implementations receive the raw source bytes and return the recognized text,
/// one OCR line per text line. Engines, image variants and remote services all
/// live behind this trait; the pipeline only needs the text they produce.
pub trait OcrBackend: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    fn recognize(&self, source: &[u8]) -> Result<String, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string regardless of the source.
pub struct MockRecognizer {
    pub name: String,
    pub text: String,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self::named("mock", text)
    }

    pub fn named(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into() }
    }
}

impl OcrBackend for MockRecognizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, _source: &[u8]) -> Result<String, OcrError> {
        Ok(self.text.clone())
    }
}

// ── Sidecar text ──────────────────────────────────────────────────────────────

/// Treats the source as text that was already recognized elsewhere, e.g. an
/// OCR dump saved next to the scanned image.
#[derive(Debug, Default)]
pub struct TextPassthrough;

impl OcrBackend for TextPassthrough {
    fn name(&self) -> &str {
        "text"
    }

    fn recognize(&self, source: &[u8]) -> Result<String, OcrError> {
        let text = std::str::from_utf8(source).map_err(|e| OcrError::Decode(e.to_string()))?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
    }
}

/// Split recognized text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
