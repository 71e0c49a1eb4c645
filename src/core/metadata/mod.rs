//! # Metadata Module
//!
//! Reads the camera model and capture time of a photo.
//!
//! ## Extracted Fields
//! - Camera model (IFD0 `Model`)
//! - Capture time (IFD0 `DateTime`, falling back to `DateTimeOriginal`)
//!
//! The tag reading itself sits behind [`MetadataSource`] so the pipeline
//! can run against stubbed metadata. [`MetadataExtractor`] normalizes what
//! the source returns: blank models become absent, and a capture time that
//! is present but not in EXIF format is an error for that file.

use crate::error::ProcessError;
use chrono::NaiveDateTime;
use exif::{In, Reader, Tag, Value};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::debug;

/// EXIF date format: "YYYY:MM:DD HH:MM:SS"
pub const EXIF_DATE_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Raw tag strings as reported by a metadata source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTags {
    /// Camera model tag, untrimmed
    pub model: Option<String>,
    /// Capture date-time tag, untrimmed
    pub date_time: Option<String>,
}

/// Normalized capture metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureInfo {
    /// Camera model (e.g., "X100V")
    pub camera_model: Option<String>,
    /// Capture date/time, in camera local time
    pub captured_at: Option<NaiveDateTime>,
}

/// Source of raw metadata tags.
///
/// Implementations must be callable from many worker threads at once.
/// Returning `RawTags::default()` means "no usable metadata"; an `Err`
/// is reserved for files that could not be read at all.
pub trait MetadataSource: Send + Sync {
    fn read(&self, path: &Path) -> Result<RawTags, ProcessError>;
}

/// Reads EXIF tags with kamadak-exif
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifSource;

impl MetadataSource for ExifSource {
    fn read(&self, path: &Path) -> Result<RawTags, ProcessError> {
        let file = File::open(path).map_err(|e| ProcessError::Metadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut bufreader = BufReader::new(&file);
        let exif_reader = match Reader::new().read_from_container(&mut bufreader) {
            Ok(r) => r,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no EXIF data");
                return Ok(RawTags::default());
            }
        };

        let ascii = |tag: Tag| {
            exif_reader
                .get_field(tag, In::PRIMARY)
                .and_then(|field| get_string_value(&field.value))
        };

        Ok(RawTags {
            model: ascii(Tag::Model),
            date_time: ascii(Tag::DateTime).or_else(|| ascii(Tag::DateTimeOriginal)),
        })
    }
}

/// Helper to extract string from EXIF ASCII value
fn get_string_value(value: &Value) -> Option<String> {
    if let Value::Ascii(ref vec) = value {
        if let Some(bytes) = vec.first() {
            return Some(String::from_utf8_lossy(bytes).into_owned());
        }
    }
    None
}

/// Turns raw tags from a [`MetadataSource`] into a [`CaptureInfo`]
pub struct MetadataExtractor {
    source: Box<dyn MetadataSource>,
}

impl MetadataExtractor {
    pub fn new(source: Box<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Extract capture metadata from a file.
    ///
    /// Missing tags yield absent fields. A date tag that does not parse
    /// as `YYYY:MM:DD HH:MM:SS` fails with `InvalidCaptureDate`.
    pub fn extract(&self, path: &Path) -> Result<CaptureInfo, ProcessError> {
        let raw = self.source.read(path)?;

        let camera_model = raw.model.as_deref().and_then(clean_tag);

        let captured_at = match raw.date_time.as_deref().and_then(clean_tag) {
            Some(value) => Some(parse_capture_date(&value).ok_or_else(|| {
                ProcessError::InvalidCaptureDate {
                    path: path.to_path_buf(),
                    value,
                }
            })?),
            None => None,
        };

        Ok(CaptureInfo {
            camera_model,
            captured_at,
        })
    }
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new(Box::new(ExifSource))
    }
}

/// Parse an EXIF date-time string
pub fn parse_capture_date(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, EXIF_DATE_FORMAT).ok()
}

fn clean_tag(value: &str) -> Option<String> {
    let trimmed = value.trim_end_matches('\0').trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
