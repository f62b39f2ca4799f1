//! yes: repeat a line forever.

use async_trait::async_trait;
use sluice_types::StageResult;

use crate::stage::{Outbound, Source, Stage};

/// An infinite source. Only stops when its output is closed or its scope
/// is cancelled.
#[derive(Debug, Clone)]
pub struct Yes {
    text: String,
}

pub fn yes(text: impl Into<String>) -> Yes {
    Yes { text: text.into() }
}

#[async_trait]
impl Source for Yes {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        while !out.is_cancelled() {
            if out.emit_line(self.text.clone()).await.is_closed() {
                break;
            }
        }
        tracing::trace!(sent = out.sent(), "yes stopped");
        Ok(())
    }
}

impl From<Yes> for Stage {
    fn from(body: Yes) -> Self {
        Stage::source("yes", body)
    }
}
