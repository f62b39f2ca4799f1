//! tee: copy records to a file while passing them through.

use std::path::PathBuf;

use async_trait::async_trait;
use sluice_types::{StageError, StageResult};
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::stage::{Inbound, Outbound, Stage, Transform};

#[derive(Debug, Clone)]
pub struct Tee {
    path: PathBuf,
    append: bool,
}

pub fn tee(path: impl Into<PathBuf>) -> Tee {
    Tee {
        path: path.into(),
        append: false,
    }
}

impl Tee {
    /// Append instead of truncating (`-a`).
    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }
}

#[async_trait]
impl Transform for Tee {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let display = self.path.display().to_string();
        let io_err = |e: std::io::Error| StageError::io(&display, &e);

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.append)
            .truncate(!self.append)
            .open(&self.path)
            .await
            .map_err(io_err)?;
        let mut file = BufWriter::new(file);

        while let Some(record) = input.next().await {
            file.write_all(record.line().as_bytes()).await.map_err(io_err)?;
            file.write_all(b"\n").await.map_err(io_err)?;
            if out.emit(record).await.is_closed() {
                break;
            }
        }
        file.flush().await.map_err(io_err)?;
        Ok(())
    }
}

impl From<Tee> for Stage {
    fn from(body: Tee) -> Self {
        Stage::transform("tee", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{echo, seq, testing::run_lines};
    use crate::pipeline;

    #[tokio::test]
    async fn test_tee_writes_and_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        let out = run_lines(pipeline![seq(1, 3), tee(&path)]).await;
        assert_eq!(out, vec!["1", "2", "3"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_tee_truncates_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old\n").unwrap();

        run_lines(pipeline![echo("new"), tee(&path)]).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[tokio::test]
    async fn test_tee_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        run_lines(pipeline![echo("a,1"), tee(&path).append()]).await;
        run_lines(pipeline![echo("b,2"), tee(&path).append()]).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,1\nb,2\n");
    }

    #[tokio::test]
    async fn test_tee_unwritable_path_fails() {
        let result = pipeline![echo("x"), tee("/nonexistent/sluice/out.txt")].collect().await;
        assert!(result.is_err());
    }
}
