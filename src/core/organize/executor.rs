//! Copy executor for a frozen index.
//!
//! All copy tasks of the phase run in one scope on the worker pool, so
//! `execute` returns only after every task has finished. Each group also
//! tracks its own outstanding tasks and reports when it is done.

use super::types::*;
use crate::core::index::{FileRecord, FrozenIndex};
use crate::error::CopyError;
use crate::events::{CopyEvent, Event, EventSender};
use crossbeam_channel::Sender;
use rayon::ThreadPool;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;
use tempfile::NamedTempFile;
use tracing::{debug, error, info};

/// Outstanding copy work of one group
struct GroupTracker {
    group: String,
    dir: PathBuf,
    remaining: AtomicUsize,
    copied: AtomicUsize,
    failed: AtomicUsize,
}

impl GroupTracker {
    /// Mark one task finished; true for the task that finished last
    fn finish_one(&self, ok: bool) -> bool {
        if ok {
            self.copied.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    fn outcome(&self) -> GroupOutcome {
        GroupOutcome {
            group: self.group.clone(),
            copied: self.copied.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }
}

/// Phase-wide counters and sinks shared by copy tasks
struct CopyState {
    copied: AtomicUsize,
    failures: AtomicUsize,
    bytes: AtomicU64,
    error_tx: Sender<String>,
    group_tx: Sender<GroupOutcome>,
}

/// Executes the copy phase
pub struct OrganizeExecutor;

impl OrganizeExecutor {
    /// Copy every record of `index` into its group folder under
    /// `destination`.
    ///
    /// Existing files with the same name are replaced whole; the last
    /// rename wins. A failed copy is logged and recorded and never stops
    /// sibling copies.
    pub fn execute(
        index: &FrozenIndex,
        destination: &Path,
        pool: &ThreadPool,
        events: &EventSender,
    ) -> CopyResult {
        let start = Instant::now();
        let (error_tx, error_rx) = crossbeam_channel::unbounded();
        let (group_tx, group_rx) = crossbeam_channel::unbounded();
        let state = CopyState {
            copied: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            bytes: AtomicU64::new(0),
            error_tx,
            group_tx,
        };

        events.send(Event::Copy(CopyEvent::Started {
            total_files: index.len(),
            total_groups: index.group_count(),
        }));

        let trackers: Vec<(GroupTracker, &[FileRecord])> = index
            .groups()
            .map(|(key, records)| {
                let tracker = GroupTracker {
                    group: key.to_string(),
                    dir: destination.join(key.relative_path()),
                    remaining: AtomicUsize::new(records.len()),
                    copied: AtomicUsize::new(0),
                    failed: AtomicUsize::new(0),
                };
                (tracker, records)
            })
            .collect();

        let mut folders_created = 0usize;

        pool.in_place_scope(|scope| {
            for (tracker, records) in &trackers {
                if let Err(source) = fs::create_dir_all(&tracker.dir) {
                    let err = CopyError::CreateDirectory {
                        dir: tracker.dir.clone(),
                        source,
                    };
                    error!("{}", err);
                    let message = err.to_string();
                    for record in records.iter() {
                        Self::record_failure(&state, tracker, record, message.clone(), events);
                    }
                    continue;
                }
                folders_created += 1;

                for record in records.iter() {
                    let state = &state;
                    scope.spawn(move |_| Self::copy_one(state, tracker, record, events));
                }
            }
        });

        let CopyState {
            copied,
            failures,
            bytes,
            error_tx,
            group_tx,
        } = state;
        drop(error_tx);
        drop(group_tx);

        let result = CopyResult {
            files_copied: copied.into_inner(),
            failures: failures.into_inner(),
            bytes_copied: bytes.into_inner(),
            folders_created,
            groups: group_rx.try_iter().collect(),
            duration_ms: start.elapsed().as_millis() as u64,
            errors: error_rx.try_iter().collect(),
        };

        info!(
            copied = result.files_copied,
            failures = result.failures,
            groups = result.groups.len(),
            "copy finished"
        );
        events.send(Event::Copy(CopyEvent::Completed {
            files_copied: result.files_copied,
            failures: result.failures,
        }));

        result
    }

    fn copy_one(
        state: &CopyState,
        tracker: &GroupTracker,
        record: &FileRecord,
        events: &EventSender,
    ) {
        let file_name = record.file_name();
        let target = tracker.dir.join(&file_name);

        match Self::replace_file(&record.path, &tracker.dir, &target) {
            Ok(bytes) => {
                state.copied.fetch_add(1, Ordering::Relaxed);
                state.bytes.fetch_add(bytes, Ordering::Relaxed);
                debug!(source = %record.path.display(), target = %target.display(), "copied");
                events.send(Event::Copy(CopyEvent::FileCopied {
                    source: record.path.clone(),
                    destination: target,
                }));
                if tracker.finish_one(true) {
                    Self::complete_group(state, tracker, events);
                }
            }
            Err(source) => {
                let err = CopyError::CopyFile {
                    dir: tracker.dir.clone(),
                    file_name,
                    source,
                };
                error!(
                    folder = %tracker.dir.display(),
                    file = %record.path.display(),
                    "file copy error: {}",
                    err
                );
                Self::record_failure(state, tracker, record, err.to_string(), events);
            }
        }
    }

    /// Copy `source` into a private temp file inside `dir`, then rename it
    /// over `target`.
    ///
    /// Readers of `target` see either the old file or one complete source,
    /// even when two same-named sources race for the same target.
    fn replace_file(source: &Path, dir: &Path, target: &Path) -> io::Result<u64> {
        let mut input = File::open(source)?;
        let permissions = input.metadata()?.permissions();

        let mut staged = NamedTempFile::new_in(dir)?;
        let bytes = io::copy(&mut input, staged.as_file_mut())?;
        staged.as_file().set_permissions(permissions)?;
        staged.persist(target).map_err(|e| e.error)?;
        Ok(bytes)
    }

    fn record_failure(
        state: &CopyState,
        tracker: &GroupTracker,
        record: &FileRecord,
        message: String,
        events: &EventSender,
    ) {
        state.failures.fetch_add(1, Ordering::Relaxed);
        events.send(Event::Copy(CopyEvent::Error {
            dir: tracker.dir.clone(),
            file_name: record.file_name(),
            message: message.clone(),
        }));
        let _ = state.error_tx.send(message);
        if tracker.finish_one(false) {
            Self::complete_group(state, tracker, events);
        }
    }

    fn complete_group(state: &CopyState, tracker: &GroupTracker, events: &EventSender) {
        let outcome = tracker.outcome();
        debug!(group = %outcome.group, copied = outcome.copied, failed = outcome.failed, "group done");
        events.send(Event::Copy(CopyEvent::GroupCompleted {
            group: outcome.group.clone(),
            copied: outcome.copied,
            failed: outcome.failed,
        }));
        let _ = state.group_tx.send(outcome);
    }
}
