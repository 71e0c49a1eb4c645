//! # Photo Bucket
//!
//! Sorts a tree of photos into `<destination>/<camera model>/<YYYYMMDD>/`,
//! copying each distinct photo once.
//!
//! ## How It Works
//! 1. **Collect** - walk the source tree; every image is read for its
//!    camera model and capture time, fingerprinted, and registered on a
//!    worker pool. Byte-identical copies are registered once.
//! 2. **Copy** - after every collection task has finished, each group is
//!    copied into its folder, one task per file. A failed copy never
//!    affects the others.
//!
//! ## Architecture
//! - `core` - The sorting engine (GUI-agnostic)
//! - `events` - Event-driven progress reporting
//! - `error` - Error types

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PhotoBucketError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point. `RUST_LOG`
/// overrides `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber may already be installed (e.g. by a test harness)
    let _ = tracing::subscriber::set_global_default(subscriber);
}
