//! awk: per-record action plus an end block, as a Rust trait.

use async_trait::async_trait;
use sluice_types::{Record, StageError, StageResult};

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// A program in the shape of `awk 'BEGIN {...} {...} END {...}'`.
///
/// Records arrive split into fields (whitespace by default), so
/// `record.field(0)` is awk's `$1`.
pub trait AwkProgram: Send {
    /// Runs before the first record.
    fn begin(&mut self) -> Option<String> {
        None
    }

    /// Runs for every record; `Some` emits a line.
    fn action(&mut self, record: &Record) -> Option<String>;

    /// Runs after the last record. An error fails the stage.
    fn end(&mut self) -> Result<Option<String>, StageError> {
        Ok(None)
    }
}

pub struct Awk<P> {
    program: P,
    separator: String,
}

pub fn awk<P: AwkProgram>(program: P) -> Awk<P> {
    Awk {
        program,
        separator: " ".to_string(),
    }
}

impl<P> Awk<P> {
    /// Field separator (`-F`).
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

#[async_trait]
impl<P: AwkProgram> Transform for Awk<P> {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        if let Some(line) = self.program.begin()
            && out.emit_line(line).await.is_closed()
        {
            return Ok(());
        }

        while let Some(record) = input.next().await {
            let record = record.split(&self.separator);
            if let Some(line) = self.program.action(&record)
                && out.emit_line(line).await.is_closed()
            {
                return Ok(());
            }
        }

        if input.is_cancelled() {
            return Ok(());
        }
        if let Some(line) = self.program.end()? {
            let _ = out.emit_line(line).await;
        }
        Ok(())
    }
}

impl<P: AwkProgram + 'static> From<Awk<P>> for Stage {
    fn from(body: Awk<P>) -> Self {
        Stage::transform("awk", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{echo, seq, testing::run_lines};
    use crate::error::PipelineError;
    use crate::pipeline;

    #[derive(Default)]
    struct Sum(i64);

    impl AwkProgram for Sum {
        fn action(&mut self, record: &Record) -> Option<String> {
            self.0 += record.field(0).and_then(|f| f.parse::<i64>().ok()).unwrap_or(0);
            None
        }

        fn end(&mut self) -> Result<Option<String>, StageError> {
            Ok(Some(format!("Total: {} bytes", self.0)))
        }
    }

    struct SecondField;

    impl AwkProgram for SecondField {
        fn begin(&mut self) -> Option<String> {
            Some("header".to_string())
        }

        fn action(&mut self, record: &Record) -> Option<String> {
            record.field(1).map(str::to_string)
        }
    }

    struct Strict;

    impl AwkProgram for Strict {
        fn action(&mut self, _record: &Record) -> Option<String> {
            None
        }

        fn end(&mut self) -> Result<Option<String>, StageError> {
            Err(StageError::MalformedRecord("no data".to_string()))
        }
    }

    #[tokio::test]
    async fn test_awk_sum_in_end() {
        let out = run_lines(pipeline![seq(1, 4), awk(Sum::default())]).await;
        assert_eq!(out, vec!["Total: 10 bytes"]);
    }

    #[tokio::test]
    async fn test_awk_fields_and_begin() {
        let out = run_lines(pipeline![echo("a  b c"), awk(SecondField)]).await;
        assert_eq!(out, vec!["header", "b"]);
    }

    #[tokio::test]
    async fn test_awk_custom_separator() {
        let out = run_lines(pipeline![echo("x,y,z"), awk(SecondField).separator(",")]).await;
        assert_eq!(out, vec!["header", "y"]);
    }

    #[tokio::test]
    async fn test_awk_end_error_fails_stage() {
        let err = pipeline![seq(1, 2), awk(Strict)].collect().await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Stage { source: StageError::MalformedRecord(_), .. }
        ));
    }
}
