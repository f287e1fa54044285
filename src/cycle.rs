//! One load → reconcile → populate cycle against a live model.
//!
//! The cycle assumes exclusive access to the model for its whole duration;
//! callers running multiple cycles must serialize them. Nothing touches the
//! model until loading and reconciliation have both succeeded.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::error::BridgeError;
use crate::loader;
use crate::populate;
use crate::reconcile::{self, BrokenLinkage};
use crate::sink::{BaselineSink, DistortionModelSink};

/// Timing of a single cycle step.
#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub name: String,
    pub time_ms: u64,
}

/// Summary of one completed cycle.
#[derive(Debug, Serialize)]
pub struct CycleReport {
    pub baselines_loaded: usize,
    pub blocks_loaded: usize,
    pub baselines_populated: usize,
    pub blocks_populated: usize,
    /// Blocks that did not get updated from this detection run.
    pub excluded: Vec<BrokenLinkage>,
    /// Soft invariant violations from the loader.
    pub warnings: Vec<String>,
    pub total_time_ms: u64,
    pub steps: Vec<StepTiming>,
}

/// Run one full cycle: load the two result sources, reconcile against the
/// model's current state, populate the model with the result.
pub fn run_cycle<M>(
    model: &mut M,
    baseline_path: &Path,
    textblock_path: &Path,
) -> Result<CycleReport, BridgeError>
where
    M: BaselineSink + DistortionModelSink,
{
    let start = Instant::now();
    let mut steps = Vec::new();

    let step_start = Instant::now();
    let loaded = loader::load_results(baseline_path, textblock_path)?;
    push_timing(&mut steps, "load", step_start);

    let baselines_loaded = loaded.baselines.len();
    let blocks_loaded = loaded.blocks.len();
    tracing::info!(
        baselines = baselines_loaded,
        blocks = blocks_loaded,
        "loaded detection batches"
    );
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let step_start = Instant::now();
    let old_baselines = model.baselines();
    let old_blocks = model.blocks();
    let outcome = reconcile::merge_batches(
        old_baselines,
        old_blocks,
        loaded.baselines,
        loaded.blocks,
    );
    push_timing(&mut steps, "reconcile", step_start);

    let step_start = Instant::now();
    let excluded = outcome.excluded;
    let summary = populate::populate(model, outcome.baselines, outcome.blocks);
    push_timing(&mut steps, "populate", step_start);

    tracing::info!(
        baselines = summary.baselines_upserted,
        blocks = summary.blocks_upserted,
        excluded = excluded.len(),
        "cycle complete"
    );

    Ok(CycleReport {
        baselines_loaded,
        blocks_loaded,
        baselines_populated: summary.baselines_upserted,
        blocks_populated: summary.blocks_upserted,
        excluded,
        warnings: loaded.warnings,
        total_time_ms: start.elapsed().as_millis() as u64,
        steps,
    })
}

fn push_timing(steps: &mut Vec<StepTiming>, name: &str, started: Instant) {
    steps.push(StepTiming {
        name: name.to_string(),
        time_ms: started.elapsed().as_millis() as u64,
    });
}
