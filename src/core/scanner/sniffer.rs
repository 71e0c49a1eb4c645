//! Content-type probing for candidate files.

use super::ImageFormat;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Number of header bytes read when sniffing
const HEADER_LEN: u64 = 16;

/// Classifies a file by content type.
///
/// Returns the MIME type when one can be determined, `Ok(None)` when the
/// type is unknown, and `Err` when the file could not be read.
pub trait ContentSniffer: Send + Sync {
    fn probe(&self, path: &Path) -> io::Result<Option<String>>;
}

/// True for `image/*` MIME types
pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

/// Sniffs the magic bytes at the start of the file, falling back to the
/// file extension when they are not recognized.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicSniffer;

impl ContentSniffer for MagicSniffer {
    fn probe(&self, path: &Path) -> io::Result<Option<String>> {
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        File::open(path)?.take(HEADER_LEN).read_to_end(&mut header)?;

        let mut format = ImageFormat::from_magic(&header);
        if !format.is_supported() {
            format = path
                .extension()
                .and_then(|e| e.to_str())
                .map(ImageFormat::from_extension)
                .unwrap_or(ImageFormat::Unknown);
        }

        Ok(format.mime_type().map(str::to_string))
    }
}
