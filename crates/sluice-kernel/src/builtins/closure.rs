//! map / filter: inline record transforms from closures.

use async_trait::async_trait;
use sluice_types::{Record, StageResult};

use crate::stage::{Inbound, Outbound, Stage, Transform};

pub struct Map<F> {
    f: F,
}

/// Rewrite every record.
pub fn map<F>(f: F) -> Map<F>
where
    F: FnMut(Record) -> Record + Send + 'static,
{
    Map { f }
}

#[async_trait]
impl<F> Transform for Map<F>
where
    F: FnMut(Record) -> Record + Send,
{
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        while let Some(record) = input.next().await {
            if out.emit((self.f)(record)).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl<F> From<Map<F>> for Stage
where
    F: FnMut(Record) -> Record + Send + 'static,
{
    fn from(body: Map<F>) -> Self {
        Stage::transform("map", body)
    }
}

pub struct Filter<F> {
    keep: F,
}

/// Keep records for which `keep` returns true.
pub fn filter<F>(keep: F) -> Filter<F>
where
    F: FnMut(&Record) -> bool + Send + 'static,
{
    Filter { keep }
}

#[async_trait]
impl<F> Transform for Filter<F>
where
    F: FnMut(&Record) -> bool + Send,
{
    async fn transform(&mut self, input: &mut Inbound, out: &mut Outbound) -> StageResult {
        while let Some(record) = input.next().await {
            if !(self.keep)(&record) {
                continue;
            }
            if out.emit(record).await.is_closed() {
                break;
            }
        }
        Ok(())
    }
}

impl<F> From<Filter<F>> for Stage
where
    F: FnMut(&Record) -> bool + Send + 'static,
{
    fn from(body: Filter<F>) -> Self {
        Stage::transform("filter", body)
    }
}
