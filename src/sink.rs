//! Collaborator seams for the rectification engine.
//!
//! The populator only needs id-keyed upsert and lookup from its targets, so
//! the engine's baseline collection and distortion model are expressed as two
//! narrow traits. `InMemoryModel` implements both and doubles as the live
//! model for the CLI and for tests.

use serde::{Deserialize, Serialize};

use crate::model::{Baseline, TextBlock};

/// A collection of baselines supporting upsert and lookup by id.
pub trait BaselineSink {
    /// Insert the baseline, or replace the existing baseline with the same id.
    fn upsert_baseline(&mut self, baseline: Baseline);

    /// Look up a baseline by id.
    fn baseline(&self, id: i64) -> Option<&Baseline>;

    /// Snapshot of the current baselines in insertion order. The returned
    /// sequence is not updated by later upserts.
    fn baselines(&self) -> Vec<Baseline>;
}

/// A distortion model supporting text block upsert and lookup by block id.
///
/// Linkage between a block and its baselines is validated (or tolerated) by
/// the implementation's own contract; the populator only guarantees that
/// baselines are pushed before the blocks that reference them.
pub trait DistortionModelSink {
    /// Insert the block, or replace the existing block with the same id.
    fn upsert_block(&mut self, block: TextBlock);

    /// Look up a text block by id.
    fn block(&self, id: i64) -> Option<&TextBlock>;

    /// Snapshot of the current text blocks in insertion order.
    fn blocks(&self) -> Vec<TextBlock>;
}

/// Insertion-ordered in-memory model implementing both sink traits.
///
/// Serializes to `{"baselines": [..], "text_blocks": [..]}` so the CLI can
/// persist the reconciled state between detection runs.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct InMemoryModel {
    #[serde(default)]
    baselines: Vec<Baseline>,
    #[serde(default)]
    text_blocks: Vec<TextBlock>,
}

impl InMemoryModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baseline_count(&self) -> usize {
        self.baselines.len()
    }

    pub fn block_count(&self) -> usize {
        self.text_blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.baselines.is_empty() && self.text_blocks.is_empty()
    }
}

impl BaselineSink for InMemoryModel {
    fn upsert_baseline(&mut self, baseline: Baseline) {
        match self.baselines.iter_mut().find(|b| b.id == baseline.id) {
            Some(existing) => *existing = baseline,
            None => self.baselines.push(baseline),
        }
    }

    fn baseline(&self, id: i64) -> Option<&Baseline> {
        self.baselines.iter().find(|b| b.id == id)
    }

    fn baselines(&self) -> Vec<Baseline> {
        self.baselines.clone()
    }
}

impl DistortionModelSink for InMemoryModel {
    fn upsert_block(&mut self, block: TextBlock) {
        match self
            .text_blocks
            .iter_mut()
            .find(|b| b.block_id == block.block_id)
        {
            Some(existing) => *existing = block,
            None => self.text_blocks.push(block),
        }
    }

    fn block(&self, id: i64) -> Option<&TextBlock> {
        self.text_blocks.iter().find(|b| b.block_id == id)
    }

    fn blocks(&self) -> Vec<TextBlock> {
        self.text_blocks.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::model::DistortionType;

    fn baseline(id: i64, y: f64) -> Baseline {
        let points = vec![Point::new(0.0, y), Point::new(100.0, y)];
        Baseline {
            id,
            bounds: Rect::from_points(&points).unwrap(),
            points,
            curvature_estimate: 0.0,
            confidence: 1.0,
            user_modified: false,
            advisory: None,
        }
    }

    #[test]
    fn test_upsert_inserts_then_replaces() {
        let mut model = InMemoryModel::new();
        model.upsert_baseline(baseline(1, 10.0));
        model.upsert_baseline(baseline(2, 20.0));
        assert_eq!(model.baseline_count(), 2);

        let mut edited = baseline(1, 12.0);
        edited.user_modified = true;
        model.upsert_baseline(edited);

        assert_eq!(model.baseline_count(), 2);
        assert!(model.baseline(1).unwrap().user_modified);
        // Replacement keeps the original position
        assert_eq!(model.baselines()[0].id, 1);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut model = InMemoryModel::new();
        model.upsert_baseline(baseline(7, 5.0));
        let before = model.baselines();
        model.upsert_baseline(baseline(7, 5.0));
        assert_eq!(model.baselines(), before);
    }

    #[test]
    fn test_snapshot_is_not_a_live_view() {
        let mut model = InMemoryModel::new();
        model.upsert_baseline(baseline(1, 10.0));
        let snapshot = model.baselines();
        model.upsert_baseline(baseline(2, 20.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(model.baseline_count(), 2);
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut model = InMemoryModel::new();
        model.upsert_baseline(baseline(1, 10.0));
        model.upsert_block(TextBlock {
            block_id: 4,
            baseline_ids: vec![1],
            top_baseline_id: 1,
            bottom_baseline_id: 1,
            bounds: Rect {
                left: 0.0,
                top: 0.0,
                right: 100.0,
                bottom: 20.0,
            },
            distortion_type: DistortionType::Curved,
            confidence: 0.8,
            user_modified: false,
            top_spline_points: vec![],
            bottom_spline_points: vec![],
            advisory: None,
        });

        let json = serde_json::to_string(&model).unwrap();
        let back: InMemoryModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.baselines(), model.baselines());
        assert_eq!(back.blocks(), model.blocks());
    }
}
