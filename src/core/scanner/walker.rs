//! Directory walking and per-file dispatch.
//!
//! The tree is walked with walkdir on the calling thread. Every image is
//! handed to the worker pool as one task (metadata, fingerprint,
//! registration). `collect` returns only after every task has finished.

use super::sniffer::{is_image_mime, ContentSniffer, MagicSniffer};
use crate::core::hasher::fingerprint_file;
use crate::core::index::{FileRecord, GroupKey, GroupingIndex};
use crate::core::metadata::{MetadataExtractor, MetadataSource};
use crate::error::{ProcessError, ScanError};
use crate::events::{Event, EventSender, ScanEvent};
use crossbeam_channel::Sender;
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Configuration for the directory scanner
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    /// Whether to follow symbolic links
    pub follow_symlinks: bool,
    /// Whether to skip hidden files and directories
    pub skip_hidden: bool,
    /// Maximum directory depth (None = unlimited)
    pub max_depth: Option<usize>,
}

/// Counters for one collection run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    /// Regular files visited
    pub files_seen: usize,
    /// Files skipped because they are not images
    pub non_images: usize,
    /// Images handed to the worker pool
    pub dispatched: usize,
    /// Images registered into the index
    pub registered: usize,
    /// Images dropped because their content was already registered
    pub duplicates: usize,
    /// Files that failed probing or processing
    pub failures: usize,
}

/// Result of a collection run
#[derive(Debug)]
pub struct WalkResult {
    pub stats: WalkStats,
    /// Non-fatal errors, one line per failed file or directory
    pub errors: Vec<String>,
}

#[derive(Default)]
struct Counters {
    files_seen: AtomicUsize,
    non_images: AtomicUsize,
    dispatched: AtomicUsize,
    registered: AtomicUsize,
    duplicates: AtomicUsize,
    failures: AtomicUsize,
}

impl Counters {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> WalkStats {
        WalkStats {
            files_seen: self.files_seen.load(Ordering::SeqCst),
            non_images: self.non_images.load(Ordering::SeqCst),
            dispatched: self.dispatched.load(Ordering::SeqCst),
            registered: self.registered.load(Ordering::SeqCst),
            duplicates: self.duplicates.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
        }
    }
}

/// Scanner implementation using the walkdir crate
pub struct WalkDirScanner {
    config: ScanConfig,
    sniffer: Box<dyn ContentSniffer>,
    extractor: MetadataExtractor,
}

impl WalkDirScanner {
    /// Create a new scanner with the default sniffer and EXIF source
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            sniffer: Box::new(MagicSniffer),
            extractor: MetadataExtractor::default(),
        }
    }

    /// Replace the content-type sniffer
    pub fn with_sniffer(mut self, sniffer: Box<dyn ContentSniffer>) -> Self {
        self.sniffer = sniffer;
        self
    }

    /// Replace the metadata source
    pub fn with_metadata_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.extractor = MetadataExtractor::new(source);
        self
    }

    /// Walk `root`, dispatch every image onto `pool`, and wait for all of
    /// them to finish.
    ///
    /// A missing root is recorded as an error and yields an empty result.
    pub fn collect(
        &self,
        root: &Path,
        index: &GroupingIndex,
        pool: &ThreadPool,
        events: &EventSender,
    ) -> WalkResult {
        events.send(Event::Scan(ScanEvent::Started {
            source: root.to_path_buf(),
        }));

        let counters = Counters::default();
        let (error_tx, error_rx) = crossbeam_channel::unbounded::<String>();

        if root.exists() {
            // Records carry absolute paths
            let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
            self.dispatch_tree(&root, index, pool, &counters, &error_tx, events);
        } else {
            let error = ScanError::SourceNotFound {
                path: root.to_path_buf(),
            };
            warn!("{}", error);
            events.send(Event::Scan(ScanEvent::SourceMissing {
                path: root.to_path_buf(),
            }));
            let _ = error_tx.send(error.to_string());
        }

        drop(error_tx);
        let errors: Vec<String> = error_rx.try_iter().collect();
        let stats = counters.snapshot();

        info!(
            seen = stats.files_seen,
            registered = stats.registered,
            duplicates = stats.duplicates,
            failures = stats.failures,
            "collection finished"
        );
        events.send(Event::Scan(ScanEvent::Completed {
            registered: stats.registered,
            duplicates: stats.duplicates,
        }));

        WalkResult { stats, errors }
    }

    fn dispatch_tree(
        &self,
        root: &Path,
        index: &GroupingIndex,
        pool: &ThreadPool,
        counters: &Counters,
        error_tx: &Sender<String>,
        events: &EventSender,
    ) {
        let mut walker = WalkDir::new(root).follow_links(self.config.follow_symlinks);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        let skip_hidden = self.config.skip_hidden;
        let entries = walker
            .into_iter()
            .filter_entry(move |e| e.depth() == 0 || !(skip_hidden && is_hidden(e)));

        // The scope does not return until every spawned task has finished.
        pool.in_place_scope(|scope| {
            for entry_result in entries {
                let entry = match entry_result {
                    Ok(entry) => entry,
                    Err(e) => {
                        let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                        let error = if e.io_error().map(|e| e.kind())
                            == Some(std::io::ErrorKind::PermissionDenied)
                        {
                            ScanError::PermissionDenied { path: path.clone() }
                        } else {
                            ScanError::ReadDirectory {
                                path: path.clone(),
                                source: std::io::Error::new(
                                    std::io::ErrorKind::Other,
                                    e.to_string(),
                                ),
                            }
                        };
                        warn!("{}", error);
                        Self::report_scan_error(&path, error, error_tx, events);
                        continue;
                    }
                };

                if !entry.file_type().is_file() {
                    continue;
                }
                Counters::bump(&counters.files_seen);

                let path = entry.path();
                match self.sniffer.probe(path) {
                    Ok(Some(mime)) if is_image_mime(&mime) => {}
                    Ok(_) => {
                        Counters::bump(&counters.non_images);
                        continue;
                    }
                    Err(source) => {
                        Counters::bump(&counters.failures);
                        let error = ProcessError::Probe {
                            path: path.to_path_buf(),
                            source,
                        };
                        warn!("{}", error);
                        Self::report_process_error(error, error_tx, events);
                        continue;
                    }
                }

                let size_bytes = match entry.metadata() {
                    Ok(metadata) => metadata.len(),
                    Err(e) => {
                        Counters::bump(&counters.failures);
                        let error = ScanError::ReadDirectory {
                            path: path.to_path_buf(),
                            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                        };
                        warn!("{}", error);
                        Self::report_scan_error(path, error, error_tx, events);
                        continue;
                    }
                };

                Counters::bump(&counters.dispatched);
                events.send(Event::Scan(ScanEvent::FileDispatched {
                    path: path.to_path_buf(),
                }));

                let path = path.to_path_buf();
                let error_tx = error_tx.clone();
                scope.spawn(move |_| {
                    self.run_task(path, size_bytes, index, counters, &error_tx, events)
                });
            }
        });
    }

    /// One unit of per-file work. Never propagates an error.
    fn run_task(
        &self,
        path: PathBuf,
        size_bytes: u64,
        index: &GroupingIndex,
        counters: &Counters,
        error_tx: &Sender<String>,
        events: &EventSender,
    ) {
        match self.process_file(&path, size_bytes, index) {
            Ok(Some(key)) => {
                Counters::bump(&counters.registered);
                debug!(path = %path.display(), group = %key, "registered");
                events.send(Event::Scan(ScanEvent::FileRegistered {
                    path,
                    group: key.to_string(),
                }));
            }
            Ok(None) => {
                Counters::bump(&counters.duplicates);
                debug!(path = %path.display(), "duplicate content, skipped");
                events.send(Event::Scan(ScanEvent::DuplicateSkipped { path }));
            }
            Err(error) => {
                Counters::bump(&counters.failures);
                warn!("{}", error);
                Self::report_process_error(error, error_tx, events);
            }
        }
    }

    /// Extract metadata, derive the key, fingerprint, register.
    ///
    /// Returns the key when the file was registered and `None` when its
    /// content was already in the index. The key is derived before the
    /// fingerprint is registered, so a file without a bucket never claims
    /// a fingerprint.
    fn process_file(
        &self,
        path: &Path,
        size_bytes: u64,
        index: &GroupingIndex,
    ) -> Result<Option<GroupKey>, ProcessError> {
        let info = self.extractor.extract(path)?;
        let key = GroupKey::for_capture(&info, path)?;
        let fingerprint = fingerprint_file(path)?;

        let record = FileRecord {
            path: path.to_path_buf(),
            camera_model: info.camera_model,
            captured_at: info.captured_at,
            size_bytes,
            fingerprint,
        };

        Ok(index.register(key.clone(), record).then_some(key))
    }

    fn report_scan_error(
        path: &Path,
        error: ScanError,
        error_tx: &Sender<String>,
        events: &EventSender,
    ) {
        let message = error.to_string();
        events.send(Event::Scan(ScanEvent::Error {
            path: path.to_path_buf(),
            message: message.clone(),
        }));
        let _ = error_tx.send(message);
    }

    fn report_process_error(error: ProcessError, error_tx: &Sender<String>, events: &EventSender) {
        let message = error.to_string();
        events.send(Event::Scan(ScanEvent::Error {
            path: error.path().to_path_buf(),
            message: message.clone(),
        }));
        let _ = error_tx.send(message);
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::RawTags;
    use crate::events::{null_sender, EventChannel};
    use rayon::ThreadPoolBuilder;
    use std::collections::HashMap;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Metadata keyed by file name; counts every lookup
    #[derive(Default)]
    struct StubSource {
        tags: HashMap<String, RawTags>,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn with(mut self, name: &str, model: Option<&str>, date: Option<&str>) -> Self {
            self.tags.insert(
                name.to_string(),
                RawTags {
                    model: model.map(str::to_string),
                    date_time: date.map(str::to_string),
                },
            );
            self
        }
    }

    impl MetadataSource for std::sync::Arc<StubSource> {
        fn read(&self, path: &Path) -> Result<RawTags, ProcessError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().unwrap().push(name.clone());
            Ok(self.tags.get(&name).cloned().unwrap_or_default())
        }
    }

    fn pool() -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(4).build().unwrap()
    }

    fn write(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const JPEG: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];

    fn jpeg(tail: &[u8]) -> Vec<u8> {
        let mut bytes = JPEG.to_vec();
        bytes.extend_from_slice(tail);
        bytes
    }

    #[test]
    fn identical_files_register_once() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "a.jpg", &jpeg(b"same"));
        write(temp_dir.path(), "b.jpg", &jpeg(b"same"));

        let source = std::sync::Arc::new(
            StubSource::default()
                .with("a.jpg", Some("X100"), Some("2020:01:02 10:00:00"))
                .with("b.jpg", Some("X100"), Some("2020:01:02 10:00:00")),
        );
        let scanner = WalkDirScanner::new(ScanConfig::default())
            .with_metadata_source(Box::new(source));
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.registered, 1);
        assert_eq!(result.stats.duplicates, 1);
        let frozen = index.freeze();
        let group = frozen.get(&GroupKey::new("X100", "20200102")).unwrap();
        assert_eq!(group.len(), 1);
        assert!(group[0].path.is_absolute());
    }

    #[test]
    fn non_images_never_reach_metadata_extraction() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write(&nested, "notes.txt", b"not a photo");
        write(temp_dir.path(), "a.jpg", &jpeg(b"a"));

        let source = std::sync::Arc::new(
            StubSource::default().with("a.jpg", Some("X100"), Some("2020:01:02 10:00:00")),
        );
        let scanner = WalkDirScanner::new(ScanConfig::default())
            .with_metadata_source(Box::new(source.clone()));
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.files_seen, 2);
        assert_eq!(result.stats.non_images, 1);
        assert_eq!(*source.calls.lock().unwrap(), vec!["a.jpg".to_string()]);
        assert_eq!(index.freeze().len(), 1);
    }

    #[test]
    fn missing_date_is_reported_and_skipped() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "c.jpg", &jpeg(b"c"));

        let source =
            std::sync::Arc::new(StubSource::default().with("c.jpg", Some("X100"), None));
        let scanner = WalkDirScanner::new(ScanConfig::default())
            .with_metadata_source(Box::new(source));
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.failures, 1);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("c.jpg"));
        assert!(index.freeze().is_empty());
    }

    #[test]
    fn failed_file_does_not_claim_its_fingerprint() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "bad.jpg", &jpeg(b"same"));
        write(temp_dir.path(), "good.jpg", &jpeg(b"same"));

        let source = std::sync::Arc::new(
            StubSource::default()
                .with("bad.jpg", Some("X100"), Some("yesterday"))
                .with("good.jpg", Some("X100"), Some("2020:01:02 10:00:00")),
        );
        let scanner = WalkDirScanner::new(ScanConfig::default())
            .with_metadata_source(Box::new(source));
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.registered, 1);
        assert_eq!(result.stats.failures, 1);
        let frozen = index.freeze();
        assert_eq!(frozen.records().next().unwrap().file_name(), "good.jpg");
    }

    #[test]
    fn hidden_entries_skipped_when_configured() {
        let temp_dir = TempDir::new().unwrap();
        let hidden_dir = temp_dir.path().join(".thumbnails");
        fs::create_dir(&hidden_dir).unwrap();
        write(&hidden_dir, "t.jpg", &jpeg(b"t"));
        write(temp_dir.path(), ".h.jpg", &jpeg(b"h"));
        write(temp_dir.path(), "v.jpg", &jpeg(b"v"));

        let config = ScanConfig {
            skip_hidden: true,
            ..Default::default()
        };
        let scanner = WalkDirScanner::new(config);
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.files_seen, 1);
    }

    #[test]
    fn missing_root_is_an_error_not_a_panic() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let index = GroupingIndex::new();

        let result = scanner.collect(
            Path::new("/nonexistent/path/12345"),
            &index,
            &pool(),
            &null_sender(),
        );

        assert_eq!(result.stats, WalkStats::default());
        assert_eq!(result.errors.len(), 1);
        assert!(index.freeze().is_empty());
    }

    /// Fails for one file name, sniffs everything else by magic bytes
    struct FailingSniffer {
        fails_on: &'static str,
    }

    impl ContentSniffer for FailingSniffer {
        fn probe(&self, path: &Path) -> std::io::Result<Option<String>> {
            if path.file_name().unwrap() == self.fails_on {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "locked",
                ));
            }
            MagicSniffer.probe(path)
        }
    }

    #[test]
    fn sniff_failure_skips_only_that_file() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "locked.jpg", &jpeg(b"locked"));
        write(temp_dir.path(), "a.jpg", &jpeg(b"a"));
        write(temp_dir.path(), "b.jpg", &jpeg(b"b"));

        let source = std::sync::Arc::new(
            StubSource::default()
                .with("locked.jpg", Some("X100"), Some("2020:01:02 10:00:00"))
                .with("a.jpg", Some("X100"), Some("2020:01:02 10:00:00"))
                .with("b.jpg", Some("X100"), Some("2020:01:03 10:00:00")),
        );
        let scanner = WalkDirScanner::new(ScanConfig::default())
            .with_sniffer(Box::new(FailingSniffer {
                fails_on: "locked.jpg",
            }))
            .with_metadata_source(Box::new(source.clone()));
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.failures, 1);
        assert_eq!(result.stats.registered, 2);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("locked.jpg"));
        assert!(!source.calls.lock().unwrap().contains(&"locked.jpg".to_string()));
        assert_eq!(index.freeze().len(), 2);
    }

    #[test]
    fn missing_root_is_announced_once() {
        let scanner = WalkDirScanner::new(ScanConfig::default());
        let index = GroupingIndex::new();
        let (sender, receiver) = EventChannel::new();

        let result = scanner.collect(Path::new("/nonexistent/path/12345"), &index, &pool(), &sender);
        drop(sender);

        let events: Vec<Event> = receiver.iter().collect();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, Event::Scan(ScanEvent::SourceMissing { .. })))
                .count(),
            1
        );
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::Scan(ScanEvent::Error { .. }))));
        assert_eq!(result.stats.failures, 0);
        assert!(result.errors[0].contains("not found"));
    }

    #[test]
    fn max_depth_limits_the_walk() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("2020").join("january");
        fs::create_dir_all(&nested).unwrap();
        write(temp_dir.path(), "top.jpg", &jpeg(b"top"));
        write(&nested, "deep.jpg", &jpeg(b"deep"));

        let config = ScanConfig {
            max_depth: Some(1),
            ..Default::default()
        };
        let scanner = WalkDirScanner::new(config);
        let index = GroupingIndex::new();

        let result = scanner.collect(temp_dir.path(), &index, &pool(), &null_sender());

        assert_eq!(result.stats.files_seen, 1);
    }
}
