//! Output formats understood by the encoders.

use serde::{Deserialize, Serialize};

/// Encoding produced by a re-encode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Baseline JPEG (lossy, quality honoured).
    #[default]
    Jpeg,
    /// WebP (lossy when the codec supports it).
    #[serde(alias = "WEBP", alias = "WebP")]
    Webp,
    /// PNG (lossless; size is structural).
    Png,
}

impl OutputFormat {
    /// MIME type as used by `canvas.toBlob`.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Webp => "image/webp",
            OutputFormat::Png => "image/png",
        }
    }

    /// File extension for downloads.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Webp => "webp",
            OutputFormat::Png => "png",
        }
    }

    /// Whether a quality factor can trade fidelity for size in this format.
    pub fn is_lossy(self) -> bool {
        !matches!(self, OutputFormat::Png)
    }

    /// Parse a MIME type or short name, falling back to JPEG.
    ///
    /// Form selects in the browser default to JPEG when nothing usable is
    /// selected, so unknown values map there too.
    pub fn from_mime_or_default(value: &str) -> Self {
        Self::parse(value).unwrap_or_default()
    }

    /// Parse a MIME type (`image/webp`) or short name (`webp`, `jpg`).
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        let name = value.strip_prefix("image/").unwrap_or(&value);
        match name {
            "jpeg" | "jpg" => Some(OutputFormat::Jpeg),
            "webp" => Some(OutputFormat::Webp),
            "png" => Some(OutputFormat::Png),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Webp => "WEBP",
            OutputFormat::Png => "PNG",
        })
    }
}
