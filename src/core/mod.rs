//! # Core Module
//!
//! The sorting engine, independent of any UI.
//!
//! ## Modules
//! - `scanner` - Walks the source tree and dispatches images to the pool
//! - `hasher` - Computes content fingerprints
//! - `metadata` - Reads camera model and capture time
//! - `index` - Deduplicates and groups photos
//! - `organize` - Copies groups into the destination tree
//! - `reporter` - Summarizes what was collected
//! - `pipeline` - Orchestrates the full workflow

pub mod hasher;
pub mod index;
pub mod metadata;
pub mod organize;
pub mod pipeline;
pub mod reporter;
pub mod scanner;

// Re-export commonly used types
pub use hasher::Fingerprint;
pub use index::{FileRecord, FrozenIndex, GroupKey, GroupingIndex};
pub use metadata::CaptureInfo;
pub use reporter::ReportSummary;
