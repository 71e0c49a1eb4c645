//! # Pipeline Module
//!
//! Orchestrates the full sort.
//!
//! ## Pipeline Stages
//! 1. **Collect** - Walk the source, read metadata, fingerprint, group
//! 2. **Report** - Count and weigh the retained photos
//! 3. **Copy** - Copy each group into `<destination>/<model>/<YYYYMMDD>/`
//!
//! ## Parallelism
//! One rayon pool serves both stages. Collection joins every task and
//! freezes the index before the first copy task is spawned.

mod executor;

pub use executor::{CollectResult, Pipeline, PipelineBuilder, PipelineConfig, PipelineResult};
