//! sort: order all records.

use std::cmp::Ordering;

use async_trait::async_trait;
use sluice_types::{Record, StageResult};

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// Aggregating sort. Reads everything, then emits in order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sort {
    numeric: bool,
    reverse: bool,
}

pub fn sort() -> Sort {
    Sort::default()
}

impl Sort {
    /// Compare by leading number (`-n`). Lines without one sort as 0.
    pub fn numeric(mut self) -> Self {
        self.numeric = true;
        self
    }

    /// Descending order (`-r`).
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ord = if self.numeric {
            leading_number(a.line())
                .total_cmp(&leading_number(b.line()))
                .then_with(|| a.line().cmp(b.line()))
        } else {
            a.line().cmp(b.line())
        };
        if self.reverse { ord.reverse() } else { ord }
    }
}

/// First whitespace-separated token as a number, or 0.
fn leading_number(line: &str) -> f64 {
    line.split_whitespace()
        .next()
        .and_then(|token| token.parse().ok())
        .unwrap_or(0.0)
}

#[async_trait]
impl Transform for Sort {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let mut records = Vec::new();
        while let Some(record) = input.next().await {
            records.push(record);
        }
        if input.is_cancelled() {
            return Ok(());
        }

        records.sort_by(|a, b| self.compare(a, b));
        for record in records {
            if out.emit(record).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl From<Sort> for Stage {
    fn from(body: Sort) -> Self {
        Stage::transform("sort", body)
    }
}
