//! # CLI Module
//!
//! Command-line interface for the photo bucket sorter.
//!
//! ## Usage
//! ```bash
//! # Sort a tree into <dest>/<model>/<YYYYMMDD>/
//! photo-bucket ~/Pictures/inbox ~/Pictures/sorted
//!
//! # Fewer worker threads, JSON summary
//! photo-bucket ~/Pictures/inbox ~/Pictures/sorted --threads 2 --output json
//!
//! # Also write a CSV manifest of the copied photos
//! photo-bucket ~/Pictures/inbox ~/Pictures/sorted --manifest sorted.csv
//! ```

use clap::{Parser, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use photo_bucket::core::pipeline::{Pipeline, PipelineResult};
use photo_bucket::core::reporter::{export_csv, ReportSummary};
use photo_bucket::error::{PhotoBucketError, Result};
use photo_bucket::events::{CopyEvent, Event, EventChannel, PipelineEvent, PipelineStage, ScanEvent};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Photo Bucket - sort photos by camera and capture date
#[derive(Parser, Debug)]
#[command(name = "photo-bucket")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory tree to sort
    source: PathBuf,

    /// Root of the sorted tree
    destination: PathBuf,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Output format
    #[arg(short, long, default_value = "pretty")]
    output: OutputFormat,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Follow symbolic links
    #[arg(long)]
    follow_symlinks: bool,

    /// Descend at most this many folder levels below the source
    #[arg(long)]
    max_depth: Option<usize>,

    /// Write a CSV manifest of the retained photos
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    photo_bucket::init_tracing(if cli.verbose { "photo_bucket=debug" } else { "off" });

    let term = Term::stdout();

    let mut builder = Pipeline::builder()
        .source(&cli.source)
        .destination(&cli.destination)
        .skip_hidden(cli.skip_hidden)
        .follow_symlinks(cli.follow_symlinks);
    if let Some(threads) = cli.threads {
        builder = builder.threads(threads);
    }
    if let Some(depth) = cli.max_depth {
        builder = builder.max_depth(depth);
    }
    let pipeline = builder.build()?;

    let (sender, receiver) = EventChannel::new();
    let pretty = matches!(cli.output, OutputFormat::Pretty);

    let progress = if pretty {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let event_term = term.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Only the missing-source warning is shown without a spinner
            for event in receiver.iter() {
                if let Event::Scan(ScanEvent::SourceMissing { path }) = event {
                    warn_missing_source(&path);
                }
            }
            return;
        };
        let print = |line: String| pb.suspend(|| event_term.write_line(&line).ok());

        let mut dispatched = 0usize;
        let mut copied = 0usize;
        let mut total_to_copy = 0usize;

        for event in receiver.iter() {
            match event {
                Event::Pipeline(PipelineEvent::StageStarted { stage }) => {
                    print(format!("start -> {}", stage));
                }
                Event::Pipeline(PipelineEvent::StageFinished { stage, elapsed_ms }) => {
                    print(format!("end -> {}, elapsed time {}(ms)", stage, elapsed_ms));
                    if stage == PipelineStage::Copy {
                        pb.finish_and_clear();
                    }
                }
                Event::Pipeline(PipelineEvent::ReportReady {
                    total_files,
                    total_bytes,
                }) => {
                    let summary = ReportSummary {
                        total_files,
                        total_bytes,
                        ..Default::default()
                    };
                    print(summary.to_string());
                }
                Event::Scan(ScanEvent::FileDispatched { .. }) => {
                    dispatched += 1;
                    pb.set_message(format!("{} images found", dispatched));
                }
                Event::Scan(ScanEvent::SourceMissing { path }) => {
                    pb.suspend(|| warn_missing_source(&path));
                }
                Event::Scan(ScanEvent::Error { message, .. }) => {
                    print(format!("{} {}", style("[error]").red(), message));
                }
                Event::Copy(CopyEvent::Started { total_files, .. }) => {
                    total_to_copy = total_files;
                }
                Event::Copy(CopyEvent::FileCopied { .. }) => {
                    copied += 1;
                    pb.set_message(format!("copied {}/{}", copied, total_to_copy));
                }
                Event::Copy(CopyEvent::Error { dir, file_name, .. }) => {
                    print(format!(
                        "{} folder: {}, file name: {}",
                        style("[copy error]").red(),
                        dir.display(),
                        file_name
                    ));
                }
                _ => {}
            }
        }
    });

    let result = pipeline.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = result?;

    if let Some(ref manifest) = cli.manifest {
        write_manifest(&result, manifest)?;
    }

    match cli.output {
        OutputFormat::Pretty => print_pretty_results(&term, &result, cli.verbose),
        OutputFormat::Json => print_json_results(&result)?,
    }

    Ok(())
}

fn write_manifest(result: &PipelineResult, path: &Path) -> Result<()> {
    let to_error = |source| PhotoBucketError::Output {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = BufWriter::new(File::create(path).map_err(to_error)?);
    export_csv(&result.index, &mut writer).map_err(to_error)?;
    writer.flush().map_err(to_error)
}

fn print_pretty_results(term: &Term, result: &PipelineResult, verbose: bool) {
    term.write_line("").ok();
    term.write_line(&format!(
        "{} complete",
        style("✓").green().bold()
    ))
    .ok();

    term.write_line(&format!(
        "  {} photos copied into {} folders in {:.1}s",
        style(result.copy.files_copied).cyan(),
        style(result.report.group_count()).cyan(),
        result.duration_ms as f64 / 1000.0
    ))
    .ok();

    if result.stats.duplicates > 0 {
        term.write_line(&format!(
            "  {} duplicates skipped",
            style(result.stats.duplicates).yellow()
        ))
        .ok();
    }

    let (unsorted, other) = failure_counts(result);
    if unsorted > 0 {
        term.write_line(&format!(
            "  {} files could not be sorted",
            style(unsorted).red()
        ))
        .ok();
    }
    if other > 0 {
        term.write_line(&format!(
            "  {} problems reading the source tree",
            style(other).red()
        ))
        .ok();
    }

    if verbose {
        term.write_line("").ok();
        for group in &result.report.by_group {
            term.write_line(&format!(
                "  {} {} photos, {}",
                style(&group.group).bold(),
                group.count,
                format_bytes(group.size_bytes)
            ))
            .ok();
        }
    }
}

fn warn_missing_source(path: &Path) {
    Term::stderr()
        .write_line(&format!(
            "{} source {} does not exist, check the image path",
            style("warning:").yellow().bold(),
            path.display()
        ))
        .ok();
}

/// Files that failed to sort, and errors not tied to a single file
/// (missing source, unreadable folders)
fn failure_counts(result: &PipelineResult) -> (usize, usize) {
    let unsorted = result.stats.failures + result.copy.failures;
    (unsorted, result.errors.len().saturating_sub(unsorted))
}

fn print_json_results(result: &PipelineResult) -> Result<()> {
    let output = serde_json::json!({
        "total_images": result.report.total_files,
        "total_bytes": result.report.total_bytes,
        "groups": result.report.by_group,
        "stats": result.stats,
        "copy": {
            "files_copied": result.copy.files_copied,
            "failures": result.copy.failures,
            "bytes_copied": result.copy.bytes_copied,
            "folders_created": result.copy.folders_created,
            "duration_ms": result.copy.duration_ms,
        },
        "errors": result.errors,
        "duration_ms": result.duration_ms,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
