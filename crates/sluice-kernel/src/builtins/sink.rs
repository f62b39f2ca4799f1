//! Terminal stages.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sluice_types::{Record, StageError, StageResult};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::stage::{Inbound, Sink, Stage};

/// Shared buffer filled by a [`Collect`] sink.
pub type Collected = Arc<Mutex<Vec<Record>>>;

/// Stores every record in a shared vector.
#[derive(Debug, Clone)]
pub struct Collect {
    records: Collected,
}

impl Collect {
    pub fn new(records: Collected) -> Self {
        Self { records }
    }
}

/// A collecting sink and the handle to read its records after the run.
pub fn collect_into() -> (Collected, Collect) {
    let records = Collected::default();
    (records.clone(), Collect::new(records))
}

#[async_trait]
impl Sink for Collect {
    async fn consume(&mut self, input: &mut Inbound) -> StageResult {
        while let Some(record) = input.next().await {
            self.records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(record);
        }
        Ok(())
    }
}

impl From<Collect> for Stage {
    fn from(body: Collect) -> Self {
        Stage::sink("collect", body)
    }
}

/// Reads and drops everything (`> /dev/null`).
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

pub fn discard() -> Discard {
    Discard
}

#[async_trait]
impl Sink for Discard {
    async fn consume(&mut self, input: &mut Inbound) -> StageResult {
        while input.next().await.is_some() {}
        Ok(())
    }
}

impl From<Discard> for Stage {
    fn from(body: Discard) -> Self {
        Stage::sink("discard", body)
    }
}

/// Writes one line per record to standard output.
///
/// A closed stdout (`sluice ... | head`) is an early-stop, not a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stdout;

pub fn stdout() -> Stdout {
    Stdout
}

#[async_trait]
impl Sink for Stdout {
    async fn consume(&mut self, input: &mut Inbound) -> StageResult {
        let mut writer = BufWriter::new(tokio::io::stdout());
        let result = async {
            while let Some(record) = input.next().await {
                writer.write_all(record.line().as_bytes()).await?;
                writer.write_all(b"\n").await?;
            }
            writer.flush().await
        }
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::trace!("stdout closed");
                input.stop();
                Ok(())
            }
            Err(e) => Err(StageError::io("stdout", &e)),
        }
    }
}

impl From<Stdout> for Stage {
    fn from(body: Stdout) -> Self {
        Stage::sink("stdout", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::seq;
    use crate::pipeline;

    #[tokio::test]
    async fn test_collect_into() {
        let (records, sink) = collect_into();
        pipeline![seq(1, 3), sink].run().await.unwrap();
        let lines: Vec<String> = records.lock().unwrap().iter().map(|r| r.line().to_string()).collect();
        assert_eq!(lines, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_discard_drains() {
        pipeline![seq(1, 1000), discard()].run().await.unwrap();
    }

    #[tokio::test]
    async fn test_stdout_sink() {
        pipeline![seq(1, 2), stdout()].run().await.unwrap();
    }
}
