//! Image format detection for pages and covers.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image formats the library recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    /// JPEG format.
    Jpeg,
    /// PNG format.
    Png,
    /// WebP format (served, but not eligible for folder import).
    Webp,
}

impl ImageFormat {
    /// Get the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
            ImageFormat::Webp => "image/webp",
        }
    }

    /// Try to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            "webp" => Some(ImageFormat::Webp),
            _ => None,
        }
    }

    /// Check if files of this format are picked up by the folder scanner.
    pub fn importable(&self) -> bool {
        matches!(self, ImageFormat::Jpeg | ImageFormat::Png)
    }
}

/// Guess the MIME type of an image file from its extension.
///
/// Unrecognized or missing extensions fall back to `image/jpeg`; this never
/// fails.
pub fn guess_mime_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(ImageFormat::from_extension)
        .map(|f| f.mime_type())
        .unwrap_or("image/jpeg")
}
