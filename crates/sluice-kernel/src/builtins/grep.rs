//! grep: keep records matching a regular expression.

use async_trait::async_trait;
use regex::RegexBuilder;
use sluice_types::{StageError, StageResult};

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// Regex line filter. The pattern is compiled when the stage starts; an
/// invalid pattern fails the stage.
#[derive(Debug, Clone)]
pub struct Grep {
    pattern: String,
    ignore_case: bool,
    invert: bool,
}

pub fn grep(pattern: impl Into<String>) -> Grep {
    Grep {
        pattern: pattern.into(),
        ignore_case: false,
        invert: false,
    }
}

impl Grep {
    /// Case-insensitive matching (`-i`).
    pub fn ignore_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Keep the records that do not match (`-v`).
    pub fn invert(mut self) -> Self {
        self.invert = true;
        self
    }
}

#[async_trait]
impl Transform for Grep {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let regex = RegexBuilder::new(&self.pattern)
            .case_insensitive(self.ignore_case)
            .build()
            .map_err(|e| StageError::failure(format!("invalid pattern '{}': {}", self.pattern, e)))?;

        while let Some(record) = input.next().await {
            if regex.is_match(record.line()) == self.invert {
                continue;
            }
            if out.emit(record).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl From<Grep> for Stage {
    fn from(body: Grep) -> Self {
        Stage::transform("grep", body)
    }
}
