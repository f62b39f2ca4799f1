//! Demo programs.
//!
//! - `pipe-closure`: downstream stages closing their input stop upstream work
//! - `file-stats`: extension counts, largest files, total size of a tree
//! - `log-processor`: errors and warnings from `logs/*.log` into a CSV

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sluice_kernel::builtins::{
    awk, cat, echo, find, grep, head, ls, seq, sort, tail, tee, uniq, yes, AwkProgram,
};
use sluice_kernel::{
    for_each, pipeline, Outbound, Pipeline, PipelineError, PipelineRunner, Record, Scope, Source,
    Stage, StageError, StageResult,
};

// ============================================================================
// pipe-closure
// ============================================================================

/// One titled pipeline of the pipe-closure demo.
#[derive(Debug)]
pub struct Example {
    pub title: &'static str,
    pub note: &'static str,
    pub pipeline: Pipeline,
}

pub fn pipe_closure_examples() -> Vec<Example> {
    vec![
        Example {
            title: "head closes pipe after 3 lines",
            note: "Generating 10 lines, but head will only read 3...",
            pipeline: pipeline![seq(1, 10), head(3)],
        },
        Example {
            title: "tail closes pipe after reading for 5 lines",
            note: "Generating 100 lines, but tail will only keep the last 5...",
            pipeline: pipeline![seq(1, 100), tail(5)],
        },
        Example {
            title: "Pipeline with head in middle",
            note: "Generate 20 lines -> head keeps 5 -> grep filters for '3'...",
            pipeline: pipeline![seq(1, 20), head(5), grep("3")],
        },
        Example {
            title: "Yes command with head (infinite stream)",
            note: "yes generates infinite output, but head stops it after 3 lines...",
            pipeline: pipeline![yes("hello"), head(3)],
        },
        Example {
            title: "Multiple heads in sequence",
            note: "Generate 100 -> head 50 -> head 10 -> head 3...",
            pipeline: pipeline![seq(1, 100), head(50), head(10), head(3)],
        },
        Example {
            title: "Large data generator with early termination",
            note: "Simulating expensive data generation that stops early...",
            pipeline: pipeline![seq(1, 10_000), head(5)],
        },
    ]
}

pub async fn pipe_closure(runner: &PipelineRunner, scope: &Scope) -> Result<(), PipelineError> {
    for (n, example) in pipe_closure_examples().into_iter().enumerate() {
        println!("=== Example {}: {} ===", n + 1, example.title);
        println!("{}", example.note);
        runner.run_scoped(example.pipeline, scope).await?;
        println!();
    }
    println!("Done! Notice how pipe closure prevents unnecessary work.");
    Ok(())
}

// ============================================================================
// file-stats
// ============================================================================

/// `find DIR -type f -name '*.*' | <ext> | sort | uniq -c | sort -nr`
pub fn extension_counts(dir: &Path) -> Pipeline {
    pipeline![
        find(dir).files_only().name("*.*"),
        for_each(extension),
        sort(),
        uniq().count(),
        sort().numeric().reverse(),
    ]
}

/// `find DIR -type f | <size\tpath> | sort -nr | head -n N`
pub fn largest_files(dir: &Path, count: usize) -> Pipeline {
    pipeline![
        find(dir).files_only(),
        for_each(size_and_path),
        sort().numeric().reverse(),
        head(count),
    ]
}

/// `find DIR -type f | <size> | awk '{sum += $1} END {...}'`
pub fn total_size(dir: &Path) -> Pipeline {
    pipeline![
        find(dir).files_only(),
        for_each(size_only),
        awk(TotalSize::default()),
    ]
}

/// Text after the last dot of the file name, so `.bashrc` is `bashrc`.
/// Names without a dot are skipped.
fn extension(path: Record) -> Option<Stage> {
    let name = Path::new(path.line()).file_name()?.to_string_lossy().into_owned();
    let (_, ext) = name.rsplit_once('.')?;
    Some(echo(ext).into())
}

fn size_and_path(path: Record) -> Option<Stage> {
    Some(FileSize::new(path, true).into())
}

fn size_only(path: Record) -> Option<Stage> {
    Some(FileSize::new(path, false).into())
}

/// Emits one file's size, optionally followed by a tab and its path.
/// Files that vanish or can't be stat'ed emit nothing.
#[derive(Debug)]
struct FileSize {
    path: String,
    with_path: bool,
}

impl FileSize {
    fn new(path: Record, with_path: bool) -> Self {
        Self {
            path: path.into_line(),
            with_path,
        }
    }
}

#[async_trait]
impl Source for FileSize {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        let size = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::debug!(path = %self.path, error = %e, "skipping file");
                return Ok(());
            }
        };
        let line = if self.with_path {
            format!("{size}\t{}", self.path)
        } else {
            size.to_string()
        };
        let _ = out.emit_line(line).await;
        Ok(())
    }
}

impl From<FileSize> for Stage {
    fn from(body: FileSize) -> Self {
        Stage::source("stat", body)
    }
}

#[derive(Debug, Default)]
struct TotalSize {
    sum: u64,
}

impl AwkProgram for TotalSize {
    fn action(&mut self, record: &Record) -> Option<String> {
        self.sum += record
            .field(0)
            .and_then(|size| size.parse::<u64>().ok())
            .unwrap_or(0);
        None
    }

    fn end(&mut self) -> Result<Option<String>, StageError> {
        Ok(Some(format!("Total: {} bytes", self.sum)))
    }
}

pub async fn file_stats(
    runner: &PipelineRunner,
    scope: &Scope,
    dir: &Path,
) -> Result<(), PipelineError> {
    eprintln!("Analyzing files in: {}", dir.display());

    eprintln!("\n=== File Count by Type ===");
    runner.run_scoped(extension_counts(dir), scope).await?;

    eprintln!("\n=== Largest Files ===");
    runner.run_scoped(largest_files(dir, 10), scope).await?;

    eprintln!("\n=== Total Size ===");
    runner.run_scoped(total_size(dir), scope).await
}

// ============================================================================
// log-processor
// ============================================================================

/// For each `DIR/logs/*.log`: keep error and warning lines and append
/// `timestamp,level` rows to `DIR/results.csv`.
pub fn log_pipeline(dir: &Path) -> Pipeline {
    let logs = dir.join("logs");
    let results = dir.join("results.csv");
    let pattern = logs.join("*.log").to_string_lossy().to_string();

    pipeline![
        ls(pattern),
        for_each(move |name| process_log_file(&logs, &results, name)),
    ]
}

fn process_log_file(logs: &Path, results: &Path, name: Record) -> Option<Stage> {
    let path = logs.join(name.line());
    eprintln!("Processing {}", path.display());

    let results: PathBuf = results.to_path_buf();
    let pipeline = pipeline![
        cat(path),
        grep("error|warning").ignore_case(),
        for_each(move |line| process_log_line(&results, line)).separator(" "),
    ];
    Some(pipeline.into())
}

fn process_log_line(results: &Path, line: Record) -> Option<Stage> {
    let [timestamp, level, ..] = line.fields()? else {
        tracing::debug!(line = line.line(), "skipping short log line");
        return None;
    };
    let row = format!("{timestamp},{level}");
    Some(pipeline![echo(row), tee(results).append()].into())
}

pub async fn log_processor(
    runner: &PipelineRunner,
    scope: &Scope,
    dir: &Path,
) -> Result<(), PipelineError> {
    runner.run_scoped(log_pipeline(dir), scope).await
}
