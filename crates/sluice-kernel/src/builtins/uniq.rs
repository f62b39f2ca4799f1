//! uniq: collapse adjacent duplicate records.

use async_trait::async_trait;
use sluice_types::{Record, StageResult};

use crate::stage::{Inbound, Outbound, Stage, Transform};

/// Streams: a group is emitted as soon as a different record arrives.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniq {
    count: bool,
}

pub fn uniq() -> Uniq {
    Uniq::default()
}

impl Uniq {
    /// Prefix each line with its repeat count (`-c`).
    pub fn count(mut self) -> Self {
        self.count = true;
        self
    }

    fn render(&self, record: Record, n: usize) -> Record {
        if self.count {
            Record::new(format!("{:>7} {}", n, record.line()))
        } else {
            record
        }
    }
}

#[async_trait]
impl Transform for Uniq {
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        let mut current: Option<(Record, usize)> = None;
        while let Some(record) = input.next().await {
            if let Some((seen, n)) = &mut current
                && seen.line() == record.line()
            {
                *n += 1;
                continue;
            }
            if let Some((seen, n)) = current.replace((record, 1))
                && out.emit(self.render(seen, n)).await.is_closed()
            {
                return Ok(());
            }
        }

        if let Some((seen, n)) = current
            && !input.is_cancelled()
        {
            let _ = out.emit(self.render(seen, n)).await;
        }
        Ok(())
    }
}

impl From<Uniq> for Stage {
    fn from(body: Uniq) -> Self {
        Stage::transform("uniq", body)
    }
}
