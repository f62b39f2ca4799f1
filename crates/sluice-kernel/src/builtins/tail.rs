//! tail: keep the last N records.

use std::collections::VecDeque;

use async_trait::async_trait;
use sluice_types::StageResult;

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// Retain-last-N ring buffer.
///
/// Has to drain its whole input before it knows what the last N are, so
/// it never stops upstream early. Emits in arrival order once input closes.
#[derive(Debug, Clone, Copy)]
pub struct Tail {
    count: usize,
}

pub fn tail(count: usize) -> Tail {
    Tail { count }
}

#[async_trait]
impl Transform for Tail {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let mut ring = VecDeque::with_capacity(self.count);
        let mut seen = 0u64;
        while let Some(record) = input.next().await {
            seen += 1;
            if self.count == 0 {
                continue;
            }
            if ring.len() == self.count {
                ring.pop_front();
            }
            ring.push_back(record);
        }

        if input.is_cancelled() {
            tracing::trace!(seen, "tail cancelled before end of input");
            return Ok(());
        }

        for record in ring {
            if out.emit(record).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl From<Tail> for Stage {
    fn from(body: Tail) -> Self {
        Stage::transform("tail", body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::{head, seq, testing::run_lines};
    use crate::pipeline;

    #[tokio::test]
    async fn test_tail_keeps_last() {
        let out = run_lines(pipeline![seq(1, 100), tail(5)]).await;
        assert_eq!(out, vec!["96", "97", "98", "99", "100"]);
    }

    #[tokio::test]
    async fn test_tail_larger_than_input() {
        assert_eq!(run_lines(pipeline![seq(1, 3), tail(10)]).await, vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_tail_zero() {
        assert!(run_lines(pipeline![seq(1, 3), tail(0)]).await.is_empty());
    }

    #[tokio::test]
    async fn test_tail_then_head() {
        let out = run_lines(pipeline![seq(1, 50), tail(10), head(2)]).await;
        assert_eq!(out, vec!["41", "42"]);
    }
}
