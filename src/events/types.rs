//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the photo bucket pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Collection phase events (walk, fingerprint, register)
    Scan(ScanEvent),
    /// Copy phase events
    Copy(CopyEvent),
    /// Pipeline-level events
    Pipeline(PipelineEvent),
}

/// Events during the collection phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    /// Walking has started
    Started { source: PathBuf },
    /// The source root does not exist; nothing will be collected
    SourceMissing { path: PathBuf },
    /// An image was handed to the worker pool
    FileDispatched { path: PathBuf },
    /// A file was registered into its group
    FileRegistered { path: PathBuf, group: String },
    /// A file had the same content as one already registered
    DuplicateSkipped { path: PathBuf },
    /// An error occurred but the walk continues
    Error { path: PathBuf, message: String },
    /// Every dispatched task has finished
    Completed { registered: usize, duplicates: usize },
}

/// Events during the copy phase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CopyEvent {
    /// Copying has started
    Started { total_files: usize, total_groups: usize },
    /// A file landed in its destination folder
    FileCopied { source: PathBuf, destination: PathBuf },
    /// A copy failed; siblings are unaffected
    Error { dir: PathBuf, file_name: String, message: String },
    /// Every copy task for a group has finished
    GroupCompleted { group: String, copied: usize, failed: usize },
    /// Every copy task has finished
    Completed { files_copied: usize, failures: usize },
}

/// Pipeline-level events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    /// A stage has started
    StageStarted { stage: PipelineStage },
    /// A stage has finished
    StageFinished { stage: PipelineStage, elapsed_ms: u64 },
    /// The collection report is ready (emitted between the two stages)
    ReportReady { total_files: usize, total_bytes: u64 },
    /// Pipeline completed
    Completed { duration_ms: u64 },
}

/// Stages of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Collect,
    Copy,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Collect => write!(f, "1. collect file info"),
            PipelineStage::Copy => write!(f, "2. move files"),
        }
    }
}
