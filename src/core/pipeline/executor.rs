//! Pipeline execution implementation.

use crate::core::index::{FrozenIndex, GroupingIndex};
use crate::core::metadata::MetadataSource;
use crate::core::organize::{CopyResult, OrganizeExecutor};
use crate::core::reporter::ReportSummary;
use crate::core::scanner::{ContentSniffer, ScanConfig, WalkDirScanner, WalkStats};
use crate::error::PhotoBucketError;
use crate::events::{null_sender, Event, EventSender, PipelineEvent, PipelineStage};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// Result of the collection stage
#[derive(Debug)]
pub struct CollectResult {
    /// The read-only index, frozen after every task finished
    pub index: FrozenIndex,
    pub stats: WalkStats,
    /// Non-fatal errors (probe, metadata, fingerprint)
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

/// Result of pipeline execution
#[derive(Debug)]
pub struct PipelineResult {
    /// The index the copy stage consumed
    pub index: FrozenIndex,
    /// Totals over the retained photos
    pub report: ReportSummary,
    /// Collection counters
    pub stats: WalkStats,
    /// Copy stage outcome
    pub copy: CopyResult,
    /// Non-fatal errors from both stages
    pub errors: Vec<String>,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Configuration for the pipeline
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    /// Root of the tree to sort
    pub source: PathBuf,
    /// Root of the camera/date tree
    pub destination: PathBuf,
    /// Worker threads (None = available parallelism)
    pub threads: Option<usize>,
    /// Scanner configuration
    pub scan_config: ScanConfig,
}

/// Builder for pipeline configuration
#[derive(Default)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    sniffer: Option<Box<dyn ContentSniffer>>,
    metadata_source: Option<Box<dyn MetadataSource>>,
}

impl PipelineBuilder {
    /// Create a new pipeline builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the source directory
    pub fn source(mut self, source: impl Into<PathBuf>) -> Self {
        self.config.source = source.into();
        self
    }

    /// Set the destination directory
    pub fn destination(mut self, destination: impl Into<PathBuf>) -> Self {
        self.config.destination = destination.into();
        self
    }

    /// Set the worker thread count
    pub fn threads(mut self, threads: usize) -> Self {
        self.config.threads = Some(threads);
        self
    }

    /// Descend at most `depth` levels below the source
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.scan_config.max_depth = Some(depth);
        self
    }

    /// Skip hidden files and directories
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.config.scan_config.skip_hidden = skip;
        self
    }

    /// Follow symbolic links while walking
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.scan_config.follow_symlinks = follow;
        self
    }

    /// Replace the content-type sniffer
    pub fn sniffer(mut self, sniffer: Box<dyn ContentSniffer>) -> Self {
        self.sniffer = Some(sniffer);
        self
    }

    /// Replace the metadata source
    pub fn metadata_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.metadata_source = Some(source);
        self
    }

    /// Build the pipeline and its worker pool
    pub fn build(self) -> Result<Pipeline, PhotoBucketError> {
        let threads = match self.config.threads {
            Some(0) => {
                return Err(PhotoBucketError::Config(
                    "thread count must be at least 1".to_string(),
                ))
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("photo-bucket-{}", i))
            .build()
            .map_err(|e| PhotoBucketError::Config(e.to_string()))?;

        let mut scanner = WalkDirScanner::new(self.config.scan_config.clone());
        if let Some(sniffer) = self.sniffer {
            scanner = scanner.with_sniffer(sniffer);
        }
        if let Some(source) = self.metadata_source {
            scanner = scanner.with_metadata_source(source);
        }

        Ok(Pipeline {
            config: self.config,
            scanner,
            pool,
        })
    }
}

/// The sort pipeline: collect, report, copy
pub struct Pipeline {
    config: PipelineConfig,
    scanner: WalkDirScanner,
    pool: ThreadPool,
}

impl Pipeline {
    /// Create a new pipeline builder
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Worker threads in the pool
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Walk the source, fingerprint and register every image, and freeze
    /// the index once every task has finished.
    pub fn collect(&self, events: &EventSender) -> CollectResult {
        let start = Instant::now();
        let index = GroupingIndex::new();

        let walk = self
            .scanner
            .collect(&self.config.source, &index, &self.pool, events);

        CollectResult {
            index: index.freeze(),
            stats: walk.stats,
            errors: walk.errors,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    /// Copy a frozen index into the destination tree
    pub fn copy(&self, index: &FrozenIndex, events: &EventSender) -> CopyResult {
        OrganizeExecutor::execute(index, &self.config.destination, &self.pool, events)
    }

    /// Run the pipeline without events
    pub fn run(&self) -> Result<PipelineResult, PhotoBucketError> {
        self.run_with_events(&null_sender())
    }

    /// Run both stages with event reporting.
    ///
    /// The copy stage starts only after collection has fully returned.
    pub fn run_with_events(&self, events: &EventSender) -> Result<PipelineResult, PhotoBucketError> {
        let start_time = Instant::now();

        let collected = Self::stage(PipelineStage::Collect, events, || self.collect(events));

        let report = ReportSummary::from_index(&collected.index);
        info!(
            files = report.total_files,
            bytes = report.total_bytes,
            groups = report.group_count(),
            "collection report"
        );
        events.send(Event::Pipeline(PipelineEvent::ReportReady {
            total_files: report.total_files,
            total_bytes: report.total_bytes,
        }));

        let copy = Self::stage(PipelineStage::Copy, events, || {
            self.copy(&collected.index, events)
        });

        let mut errors = collected.errors;
        errors.extend(copy.errors.iter().cloned());

        let duration_ms = start_time.elapsed().as_millis() as u64;
        events.send(Event::Pipeline(PipelineEvent::Completed { duration_ms }));

        Ok(PipelineResult {
            index: collected.index,
            report,
            stats: collected.stats,
            copy,
            errors,
            duration_ms,
        })
    }

    fn stage<T>(stage: PipelineStage, events: &EventSender, run: impl FnOnce() -> T) -> T {
        events.send(Event::Pipeline(PipelineEvent::StageStarted { stage }));
        let start = Instant::now();
        let out = run();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(stage = %stage, elapsed_ms, "stage finished");
        events.send(Event::Pipeline(PipelineEvent::StageFinished { stage, elapsed_ms }));
        out
    }

    /// Source directory
    pub fn source(&self) -> &Path {
        &self.config.source
    }

    /// Destination directory
    pub fn destination(&self) -> &Path {
        &self.config.destination
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::RawTags;
    use crate::error::ProcessError;
    use crate::events::{CopyEvent, EventChannel, ScanEvent};
    use std::fs;
    use tempfile::TempDir;

    /// Every file is an X100 photo from 2 January 2020
    struct SameDaySource;

    impl MetadataSource for SameDaySource {
        fn read(&self, _path: &Path) -> Result<RawTags, ProcessError> {
            Ok(RawTags {
                model: Some("X100".to_string()),
                date_time: Some("2020:01:02 10:00:00".to_string()),
            })
        }
    }

    #[test]
    fn pipeline_builder_creates_pipeline() {
        let pipeline = Pipeline::builder()
            .source("/photos")
            .destination("/sorted")
            .threads(3)
            .max_depth(2)
            .build()
            .unwrap();

        assert_eq!(pipeline.threads(), 3);
        assert_eq!(pipeline.config.scan_config.max_depth, Some(2));
        assert_eq!(pipeline.source(), Path::new("/photos"));
        assert_eq!(pipeline.destination(), Path::new("/sorted"));
    }

    #[test]
    fn zero_threads_is_a_config_error() {
        let result = Pipeline::builder().threads(0).build();
        assert!(matches!(result, Err(PhotoBucketError::Config(_))));
    }

    #[test]
    fn pipeline_handles_empty_directory() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();

        let pipeline = Pipeline::builder()
            .source(source.path())
            .destination(destination.path())
            .build()
            .unwrap();

        let result = pipeline.run().unwrap();

        assert_eq!(result.report.total_files, 0);
        assert_eq!(result.copy.files_copied, 0);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn no_copy_event_precedes_collection_end() {
        let source = TempDir::new().unwrap();
        let destination = TempDir::new().unwrap();
        for i in 0..40 {
            let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
            bytes.extend_from_slice(format!("photo {}", i).as_bytes());
            fs::write(source.path().join(format!("{}.jpg", i)), bytes).unwrap();
        }

        let pipeline = Pipeline::builder()
            .source(source.path())
            .destination(destination.path())
            .threads(4)
            .metadata_source(Box::new(SameDaySource))
            .build()
            .unwrap();

        let (sender, receiver) = EventChannel::new();
        let result = pipeline.run_with_events(&sender).unwrap();
        drop(sender);
        let events: Vec<Event> = receiver.iter().collect();

        let last_scan = events
            .iter()
            .rposition(|e| matches!(e, Event::Scan(_)))
            .unwrap();
        let first_copy = events
            .iter()
            .position(|e| matches!(e, Event::Copy(_)))
            .unwrap();
        assert!(last_scan < first_copy);
        assert!(matches!(
            events[last_scan],
            Event::Scan(ScanEvent::Completed { registered: 40, .. })
        ));
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::Copy(CopyEvent::GroupCompleted { copied: 40, .. }))));
        assert_eq!(result.copy.files_copied, 40);
    }
}
