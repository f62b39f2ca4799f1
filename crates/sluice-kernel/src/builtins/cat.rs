//! cat: stream the lines of a file.

use std::path::PathBuf;

use async_trait::async_trait;
use sluice_types::{StageError, StageResult};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::stage::{Outbound, Source, Stage};

/// Reads a file line by line. An unreadable file fails the stage.
#[derive(Debug, Clone)]
pub struct Cat {
    path: PathBuf,
}

pub fn cat(path: impl Into<PathBuf>) -> Cat {
    Cat { path: path.into() }
}

#[async_trait]
impl Source for Cat {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        let display = self.path.display().to_string();
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(|e| StageError::io(&display, &e))?;

        let mut lines = BufReader::new(file).lines();
        while !out.is_cancelled() {
            let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| StageError::io(&display, &e))?
            else {
                break;
            };
            if out.emit_line(line).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl From<Cat> for Stage {
    fn from(body: Cat) -> Self {
        Stage::source("cat", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{head, testing::run_lines};
    use crate::error::PipelineError;
    use crate::pipeline;

    #[tokio::test]
    async fn test_cat_reads_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one\ntwo\nthree\n").unwrap();

        assert_eq!(run_lines(pipeline![cat(&path)]).await, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn test_cat_without_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "one\ntwo").unwrap();

        assert_eq!(run_lines(pipeline![cat(&path), head(5)]).await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_cat_missing_file_fails() {
        let err = pipeline![cat("/nonexistent/sluice/file.txt")]
            .collect()
            .await
            .unwrap_err();
        match err {
            PipelineError::Stage { stage, source: StageError::Io { path, .. } } => {
                assert_eq!(stage, "cat");
                assert_eq!(path, "/nonexistent/sluice/file.txt");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
