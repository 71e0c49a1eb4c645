//! # Index Module
//!
//! The deduplication and grouping index shared by every worker task
//! during collection.
//!
//! [`GroupingIndex`] is write-only: tasks register fingerprints and
//! append records, nothing reads it back. Once every task has finished
//! it is consumed by [`GroupingIndex::freeze`], which hands out a
//! read-only [`FrozenIndex`] for reporting and copying.

use crate::core::hasher::Fingerprint;
use crate::core::metadata::CaptureInfo;
use crate::error::ProcessError;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One retained (non-duplicate) photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path of the source file
    pub path: PathBuf,
    /// Camera model, if the photo carried one
    pub camera_model: Option<String>,
    /// Capture date/time
    pub captured_at: Option<chrono::NaiveDateTime>,
    /// File size in bytes at scan time
    pub size_bytes: u64,
    /// Content fingerprint
    pub fingerprint: Fingerprint,
}

impl FileRecord {
    /// Base name of the source file, used as the destination name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Destination bucket: camera model, then capture date as `YYYYMMDD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    model: String,
    date: String,
}

impl GroupKey {
    /// Build a key from a model and an 8-digit date
    pub fn new(model: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            date: date.into(),
        }
    }

    /// Derive the key for a photo.
    ///
    /// A missing model becomes an empty segment. A missing capture date
    /// has no bucket and fails with `MissingCaptureDate`.
    pub fn for_capture(info: &CaptureInfo, path: &Path) -> Result<Self, ProcessError> {
        let captured_at = info
            .captured_at
            .ok_or_else(|| ProcessError::MissingCaptureDate {
                path: path.to_path_buf(),
            })?;

        Ok(Self {
            model: info.camera_model.clone().unwrap_or_default(),
            date: captured_at.format("%Y%m%d").to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Folder path relative to the destination root.
    ///
    /// Path separators and dot-only names in the model are replaced so a
    /// model string can never escape its own folder. An empty model puts
    /// the date folder directly under the root.
    pub fn relative_path(&self) -> PathBuf {
        let mut path = PathBuf::new();
        if !self.model.is_empty() {
            path.push(sanitize_segment(&self.model));
        }
        path.push(&self.date);
        path
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.model, self.date)
    }
}

fn sanitize_segment(segment: &str) -> String {
    if segment.chars().all(|c| c == '.') {
        return "_".repeat(segment.len());
    }
    segment
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

/// Concurrent write side of the index
#[derive(Debug, Default)]
pub struct GroupingIndex {
    seen: DashSet<Fingerprint>,
    groups: DashMap<GroupKey, Vec<FileRecord>>,
}

impl GroupingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically mark a fingerprint as seen.
    ///
    /// Returns true only for the first caller with this fingerprint.
    pub fn register_if_new(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.insert(fingerprint.clone())
    }

    /// Append a record to its group
    pub fn append(&self, key: GroupKey, record: FileRecord) {
        self.groups
            .entry(key)
            .or_insert_with(Vec::new)
            .push(record);
    }

    /// Register a record under its key if its fingerprint is new.
    ///
    /// Returns false when another record with the same content got
    /// there first; the record is dropped.
    pub fn register(&self, key: GroupKey, record: FileRecord) -> bool {
        if !self.register_if_new(&record.fingerprint) {
            return false;
        }
        self.append(key, record);
        true
    }

    /// End the write phase and hand out the read-only view
    pub fn freeze(self) -> FrozenIndex {
        FrozenIndex {
            groups: self.groups.into_iter().collect(),
        }
    }
}

/// Read-only index, ordered by group key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrozenIndex {
    groups: BTreeMap<GroupKey, Vec<FileRecord>>,
}

impl FrozenIndex {
    /// Groups in key order
    pub fn groups(&self) -> impl Iterator<Item = (&GroupKey, &[FileRecord])> {
        self.groups.iter().map(|(k, v)| (k, v.as_slice()))
    }

    pub fn get(&self, key: &GroupKey) -> Option<&[FileRecord]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// All records, group by group
    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.groups.values().flatten()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
