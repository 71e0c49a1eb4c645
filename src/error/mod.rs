//! # Error Module
//!
//! Error types for the photo bucket pipeline.
//!
//! ## Design Principles
//! - **Never panic** on user data - return errors instead
//! - **Include context** - paths, file names, what went wrong
//! - **Per-file errors stay per-file** - they are recorded and the run continues

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum PhotoBucketError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Processing error: {0}")]
    Process(#[from] ProcessError),

    #[error("Copy error: {0}")]
    Copy(#[from] CopyError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that occur while walking the source tree
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Source directory not found: {path}")]
    SourceNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that occur while processing a single candidate file
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to probe content type of {path}: {source}")]
    Probe {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read metadata of {path}: {reason}")]
    Metadata { path: PathBuf, reason: String },

    #[error("Unparsable capture date {value:?} in {path}")]
    InvalidCaptureDate { path: PathBuf, value: String },

    #[error("No capture date in {path}")]
    MissingCaptureDate { path: PathBuf },

    #[error("Failed to fingerprint {path}: {source}")]
    Fingerprint {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ProcessError {
    /// The file this error is about
    pub fn path(&self) -> &std::path::Path {
        match self {
            ProcessError::Probe { path, .. }
            | ProcessError::Metadata { path, .. }
            | ProcessError::InvalidCaptureDate { path, .. }
            | ProcessError::MissingCaptureDate { path }
            | ProcessError::Fingerprint { path, .. } => path,
        }
    }
}

/// Errors that occur during the copy phase
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Failed to create folder {dir}: {source}")]
    CreateDirectory {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {file_name} into {dir}: {source}")]
    CopyFile {
        dir: PathBuf,
        file_name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, PhotoBucketError>;
