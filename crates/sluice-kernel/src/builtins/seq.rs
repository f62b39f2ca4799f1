//! seq: count from one integer to another, inclusive.

use async_trait::async_trait;
use sluice_types::StageResult;

use crate::stage::{Outbound, Source, Stage};

/// Emits `first..=last`, counting down when `last < first`.
#[derive(Debug, Clone, Copy)]
pub struct Seq {
    first: i64,
    last: i64,
}

pub fn seq(first: i64, last: i64) -> Seq {
    Seq { first, last }
}

#[async_trait]
impl Source for Seq {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        let step = if self.last >= self.first { 1 } else { -1 };
        let mut n = self.first;
        loop {
            if out.is_cancelled() || out.emit_line(n.to_string()).await.is_closed() {
                tracing::trace!(next = n, "seq stopped early");
                break;
            }
            if n == self.last {
                break;
            }
            n += step;
        }
        Ok(())
    }
}

impl From<Seq> for Stage {
    fn from(body: Seq) -> Self {
        Stage::source("seq", body)
    }
}
