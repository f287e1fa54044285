//! Populator: pushes a reconciled set into the collaborator sinks.
//!
//! Baselines go first so a distortion model that validates linkage eagerly
//! sees every referenced baseline before its block arrives. Upserts are
//! idempotent, so a cycle interrupted mid-population is safe to retry.

use serde::Serialize;

use crate::model::{Baseline, TextBlock};
use crate::sink::{BaselineSink, DistortionModelSink};

/// Counts of records handed to the sinks.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PopulateSummary {
    pub baselines_upserted: usize,
    pub blocks_upserted: usize,
}

/// Upsert reconciled baselines into the baseline collection.
pub fn populate_baselines<S: BaselineSink + ?Sized>(sink: &mut S, baselines: Vec<Baseline>) -> usize {
    let count = baselines.len();
    for baseline in baselines {
        sink.upsert_baseline(baseline);
    }
    count
}

/// Upsert reconciled text blocks into the distortion model.
pub fn populate_blocks<S: DistortionModelSink + ?Sized>(sink: &mut S, blocks: Vec<TextBlock>) -> usize {
    let count = blocks.len();
    for block in blocks {
        sink.upsert_block(block);
    }
    count
}

/// Populate both collaborator abstractions, baselines before blocks.
pub fn populate<M>(model: &mut M, baselines: Vec<Baseline>, blocks: Vec<TextBlock>) -> PopulateSummary
where
    M: BaselineSink + DistortionModelSink,
{
    let baselines_upserted = populate_baselines(model, baselines);
    let blocks_upserted = populate_blocks(model, blocks);
    tracing::debug!(baselines_upserted, blocks_upserted, "populated model");
    PopulateSummary {
        baselines_upserted,
        blocks_upserted,
    }
}
