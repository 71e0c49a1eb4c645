//! # Scanner Module
//!
//! Walks the source tree and feeds every image to the worker pool.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - WebP (.webp)
//! - HEIC (.heic, .heif) - iPhone photos
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! ## Example
//! ```rust,ignore
//! use photo_bucket::core::scanner::{ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let index = GroupingIndex::new();
//! let result = scanner.collect(&source, &index, &pool, &null_sender());
//! let frozen = index.freeze();
//! ```

mod sniffer;
mod walker;

pub use sniffer::{is_image_mime, ContentSniffer, MagicSniffer};
pub use walker::{ScanConfig, WalkDirScanner, WalkResult, WalkStats};

use serde::{Deserialize, Serialize};

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Heic,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "heic" | "heif" => ImageFormat::Heic,
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Detect format from the first bytes of a file
    pub fn from_magic(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ImageFormat::Jpeg
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            ImageFormat::Png
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            ImageFormat::Gif
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            ImageFormat::Tiff
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            ImageFormat::WebP
        } else if bytes.len() >= 12
            && &bytes[4..8] == b"ftyp"
            && matches!(&bytes[8..12], b"heic" | b"heix" | b"hevc" | b"heif" | b"mif1" | b"msf1")
        {
            ImageFormat::Heic
        } else if bytes.starts_with(b"BM") && bytes.len() >= 14 {
            ImageFormat::Bmp
        } else {
            ImageFormat::Unknown
        }
    }

    /// MIME type for a known format
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ImageFormat::Jpeg => Some("image/jpeg"),
            ImageFormat::Png => Some("image/png"),
            ImageFormat::WebP => Some("image/webp"),
            ImageFormat::Heic => Some("image/heic"),
            ImageFormat::Gif => Some("image/gif"),
            ImageFormat::Bmp => Some("image/bmp"),
            ImageFormat::Tiff => Some("image/tiff"),
            ImageFormat::Unknown => None,
        }
    }

    /// Check if this format is supported
    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }
}
