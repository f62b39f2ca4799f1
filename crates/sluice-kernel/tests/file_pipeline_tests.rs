//! File-backed pipelines: directory walks, per-file nested runs, tee output.

use std::path::Path;

use sluice_kernel::builtins::{awk, cat, echo, find, grep, head, ls, sort, tee, uniq, AwkProgram};
use sluice_kernel::{for_each, pipeline, PipelineError, Record, Stage, StageError};

fn lines(records: Vec<Record>) -> Vec<String> {
    records.into_iter().map(Record::into_line).collect()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

fn extension(r: Record) -> Option<Stage> {
    let ext = Path::new(r.line()).extension()?.to_string_lossy().to_string();
    Some(echo(ext).into())
}

#[derive(Default)]
struct TotalSize(u64);

impl AwkProgram for TotalSize {
    fn action(&mut self, record: &Record) -> Option<String> {
        self.0 += record.field(0).and_then(|f| f.parse::<u64>().ok()).unwrap_or(0);
        None
    }

    fn end(&mut self) -> Result<Option<String>, StageError> {
        Ok(Some(format!("Total: {} bytes", self.0)))
    }
}

#[tokio::test]
async fn test_extension_counts() {
    let dir = tempfile::tempdir().unwrap();
    for rel in ["a.rs", "b.rs", "src/c.rs", "notes.md", "x.toml", "src/y.md", "Makefile"] {
        write(dir.path(), rel, "");
    }

    let p = pipeline![
        find(dir.path()).files_only().name("*.*"),
        for_each(extension),
        sort(),
        uniq().count(),
        sort().numeric().reverse(),
    ];
    let out = lines(p.collect().await.unwrap());
    assert_eq!(out, vec!["      3 rs", "      2 md", "      1 toml"]);
}

#[tokio::test]
async fn test_largest_files_and_total() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "small.txt", "ab");
    write(dir.path(), "big.txt", &"x".repeat(100));
    write(dir.path(), "sub/mid.txt", &"y".repeat(10));

    let size_line = |r: Record| -> Option<Stage> {
        let size = std::fs::metadata(r.line()).ok()?.len();
        let name = Path::new(r.line()).file_name()?.to_string_lossy().to_string();
        Some(echo(format!("{size}\t{name}")).into())
    };
    let p = pipeline![
        find(dir.path()).files_only(),
        for_each(size_line),
        sort().numeric().reverse(),
        head(2),
    ];
    let out = lines(p.collect().await.unwrap());
    assert_eq!(out, vec!["100\tbig.txt", "10\tmid.txt"]);

    let size_only = |r: Record| -> Option<Stage> {
        let size = std::fs::metadata(r.line()).ok()?.len();
        Some(echo(size.to_string()).into())
    };
    let p = pipeline![
        find(dir.path()).files_only(),
        for_each(size_only),
        awk(TotalSize::default()),
    ];
    assert_eq!(lines(p.collect().await.unwrap()), vec!["Total: 112 bytes"]);
}

#[tokio::test]
async fn test_log_lines_to_csv() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "logs/app.log",
        "2024-01-01T10:00 INFO started\n\
         2024-01-01T10:01 ERROR disk full\n\
         2024-01-01T10:02 warning slow io\n",
    );
    write(
        dir.path(),
        "logs/db.log",
        "2024-01-02T09:00 Error timeout\n2024-01-02T09:05 DEBUG ok\n",
    );
    write(dir.path(), "logs/readme.txt", "ERROR not a log\n");

    let logs = dir.path().join("logs");
    let csv = dir.path().join("results.csv");

    let per_file = {
        let logs = logs.clone();
        let csv = csv.clone();
        move |r: Record| -> Option<Stage> {
            let file = logs.join(r.line());
            let csv = csv.clone();
            let per_line = move |line: Record| -> Option<Stage> {
                let fields = line.fields()?;
                if fields.len() < 2 {
                    return None;
                }
                let row = format!("{},{}", fields[0], fields[1]);
                Some(pipeline![echo(row), tee(&csv).append()].into())
            };
            Some(
                pipeline![
                    cat(file),
                    grep("error|warning").ignore_case(),
                    for_each(per_line).separator(" "),
                ]
                .into(),
            )
        }
    };

    let pattern = logs.join("*.log");
    let out = lines(
        pipeline![ls(pattern.to_string_lossy()), for_each(per_file)]
            .collect()
            .await
            .unwrap(),
    );

    let expected = vec![
        "2024-01-01T10:01,ERROR",
        "2024-01-01T10:02,warning",
        "2024-01-02T09:00,Error",
    ];
    assert_eq!(out, expected);

    let written = std::fs::read_to_string(&csv).unwrap();
    assert_eq!(written.lines().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn test_missing_log_fails_whole_run() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "logs/a.log", "ERROR x\n");
    write(dir.path(), "names.txt", "a.log\nmissing.log\n");
    let logs = dir.path().join("logs");

    let p = pipeline![
        cat(dir.path().join("names.txt")),
        for_each(move |r: Record| -> Option<Stage> { Some(cat(logs.join(r.line())).into()) }),
    ];
    let err = p.collect().await.unwrap_err();
    match err {
        PipelineError::Stage { stage, source: StageError::Nested(msg) } => {
            assert_eq!(stage, "for_each");
            assert!(msg.contains("missing.log"), "{msg}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
