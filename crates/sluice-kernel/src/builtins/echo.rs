//! echo: emit a single line.

use async_trait::async_trait;
use sluice_types::StageResult;

use crate::stage::{Outbound, Source, Stage};

#[derive(Debug, Clone)]
pub struct Echo {
    text: String,
}

pub fn echo(text: impl Into<String>) -> Echo {
    Echo { text: text.into() }
}

#[async_trait]
impl Source for Echo {
    async fn produce(&mut self, out: &mut Outbound) -> StageResult {
        let _ = out.emit_line(std::mem::take(&mut self.text)).await;
        Ok(())
    }
}

impl From<Echo> for Stage {
    fn from(body: Echo) -> Self {
        Stage::source("echo", body)
    }
}
