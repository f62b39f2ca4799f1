//! head: pass the first N records, then stop reading.

use async_trait::async_trait;
use sluice_types::StageResult;

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// Quota limiter.
///
/// Once `count` records have gone downstream (or downstream closed), it
/// stops its inbound so upstream producers quit instead of generating
/// records nobody reads.
#[derive(Debug, Clone, Copy)]
pub struct Head {
    count: usize,
}

pub fn head(count: usize) -> Head {
    Head { count }
}

#[async_trait]
impl Transform for Head {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let mut passed = 0;
        while passed < self.count {
            let Some(record) = input.next().await else {
                break;
            };
            if out.emit(record).await.is_closed() {
                break;
            }
            passed += 1;
        }
        tracing::trace!(passed, quota = self.count, "head done");
        input.stop();
        Ok(())
    }
}

impl From<Head> for Stage {
    fn from(body: Head) -> Self {
        Stage::transform("head", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{seq, testing::run_lines, yes};
    use crate::pipeline;

    #[tokio::test]
    async fn test_head_takes_first() {
        assert_eq!(run_lines(pipeline![seq(1, 10), head(3)]).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_head_short_input() {
        assert_eq!(run_lines(pipeline![seq(1, 2), head(5)]).await, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_head_zero_stops_immediately() {
        assert!(run_lines(pipeline![yes("y"), head(0)]).await.is_empty());
    }

    #[tokio::test]
    async fn test_heads_in_sequence() {
        let out = run_lines(pipeline![seq(1, 100), head(50), head(10), head(3)]).await;
        assert_eq!(out, vec!["1", "2", "3"]);
    }
}
