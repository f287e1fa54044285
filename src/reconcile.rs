//! Reconciliation of freshly loaded batches with the live model's prior
//! state.
//!
//! Matching is by detector-assigned id only; there is no geometric matching.
//! A matched record is replaced by the new one unless the old one is
//! user-modified, in which case the old geometry stays and the new detector
//! metadata is attached as an advisory. Records missing from the new batch
//! are retained: deletion is an explicit operation elsewhere, never a side
//! effect of a detection run.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::model::{Baseline, BaselineAdvisory, BlockAdvisory, TextBlock};

/// A text block excluded from the reconciled set because one of its
/// baselines no longer resolves post-merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLinkage {
    pub block_id: i64,
    pub missing_baseline_ids: Vec<i64>,
}

impl std::fmt::Display for BrokenLinkage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "text block {} excluded: baselines {:?} not present after merge",
            self.block_id, self.missing_baseline_ids
        )
    }
}

/// Result of one merge, owned by the caller until handed to the populator.
#[derive(Debug)]
pub struct ReconcileOutcome {
    pub baselines: Vec<Baseline>,
    pub blocks: Vec<TextBlock>,
    /// Blocks dropped by the post-merge linkage check, in model order.
    pub excluded: Vec<BrokenLinkage>,
}

/// Merge new batches into the prior state.
///
/// Output ordering is deterministic: prior records in their original order,
/// then newly inserted records in batch order.
pub fn merge_batches(
    old_baselines: Vec<Baseline>,
    old_blocks: Vec<TextBlock>,
    new_baselines: Vec<Baseline>,
    new_blocks: Vec<TextBlock>,
) -> ReconcileOutcome {
    let baselines = merge_baselines(old_baselines, new_baselines);
    let merged_blocks = merge_blocks(old_blocks, new_blocks);

    // Re-validate referential integrity over the combined result. Loader
    // output is internally consistent, so breakage can only come from prior
    // state that lost a baseline through an external edit.
    let baseline_ids: HashSet<i64> = baselines.iter().map(|b| b.id).collect();
    let mut blocks = Vec::with_capacity(merged_blocks.len());
    let mut excluded = Vec::new();
    for block in merged_blocks {
        let missing = block.missing_references(|id| baseline_ids.contains(&id));
        if missing.is_empty() {
            blocks.push(block);
        } else {
            let report = BrokenLinkage {
                block_id: block.block_id,
                missing_baseline_ids: missing,
            };
            tracing::warn!("{report}");
            excluded.push(report);
        }
    }

    ReconcileOutcome {
        baselines,
        blocks,
        excluded,
    }
}

fn merge_baselines(old: Vec<Baseline>, new: Vec<Baseline>) -> Vec<Baseline> {
    let insert_order: Vec<i64> = new.iter().map(|b| b.id).collect();
    let mut incoming: HashMap<i64, Baseline> = new.into_iter().map(|b| (b.id, b)).collect();

    let mut merged = Vec::with_capacity(old.len() + incoming.len());
    for mut prior in old {
        match incoming.remove(&prior.id) {
            Some(fresh) if prior.user_modified => {
                prior.advisory = Some(BaselineAdvisory {
                    confidence: fresh.confidence,
                    curvature_estimate: fresh.curvature_estimate,
                });
                merged.push(prior);
            }
            Some(fresh) => merged.push(fresh),
            None => merged.push(prior),
        }
    }
    for id in insert_order {
        if let Some(fresh) = incoming.remove(&id) {
            merged.push(fresh);
        }
    }
    merged
}

fn merge_blocks(old: Vec<TextBlock>, new: Vec<TextBlock>) -> Vec<TextBlock> {
    let insert_order: Vec<i64> = new.iter().map(|b| b.block_id).collect();
    let mut incoming: HashMap<i64, TextBlock> =
        new.into_iter().map(|b| (b.block_id, b)).collect();

    let mut merged = Vec::with_capacity(old.len() + incoming.len());
    for mut prior in old {
        match incoming.remove(&prior.block_id) {
            Some(fresh) if prior.user_modified => {
                prior.advisory = Some(BlockAdvisory {
                    confidence: fresh.confidence,
                    distortion_type: fresh.distortion_type,
                });
                merged.push(prior);
            }
            Some(fresh) => merged.push(fresh),
            None => merged.push(prior),
        }
    }
    for id in insert_order {
        if let Some(fresh) = incoming.remove(&id) {
            merged.push(fresh);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Rect};
    use crate::model::DistortionType;

    fn baseline(id: i64, points: Vec<Point>) -> Baseline {
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

    fn block(block_id: i64, baseline_ids: Vec<i64>) -> TextBlock {
        TextBlock {
            block_id,
            top_baseline_id: baseline_ids[0],
            bottom_baseline_id: *baseline_ids.last().unwrap(),
            baseline_ids,
            bounds: Rect {
                left: 0.0,
                top: 0.0,
                right: 100.0,
                bottom: 100.0,
            },
            distortion_type: DistortionType::Curved,
            confidence: 0.8,
            user_modified: false,
            top_spline_points: vec![],
            bottom_spline_points: vec![],
            advisory: None,
        }
    }

    fn horizontal(y: f64) -> Vec<Point> {
        vec![Point::new(0.0, y), Point::new(10.0, y)]
    }

    #[test]
    fn test_user_modified_geometry_survives_redetection() {
        // The user moved baseline 1 and a new detection run disagrees. The
        // user wins; the detector's numbers become advisory.
        let mut edited = baseline(1, horizontal(0.0));
        edited.user_modified = true;

        let mut fresh = baseline(1, horizontal(5.0));
        fresh.confidence = 0.4;
        fresh.curvature_estimate = 7.0;

        let outcome = merge_batches(vec![edited], vec![], vec![fresh], vec![]);
        let merged = &outcome.baselines[0];
        assert_eq!(merged.points, horizontal(0.0));
        assert!(merged.user_modified);
        let advisory = merged.advisory.unwrap();
        assert_eq!(advisory.confidence, 0.4);
        assert_eq!(advisory.curvature_estimate, 7.0);
    }

    #[test]
    fn test_unmodified_record_is_fully_replaced() {
        let old = baseline(1, horizontal(0.0));
        let fresh = baseline(1, horizontal(5.0));

        let outcome = merge_batches(vec![old], vec![], vec![fresh.clone()], vec![]);
        assert_eq!(outcome.baselines, vec![fresh]);
    }

    #[test]
    fn test_records_absent_from_new_batch_are_retained() {
        let old = vec![baseline(1, horizontal(0.0)), baseline(2, horizontal(20.0))];
        let old_block = block(3, vec![1, 2]);

        let outcome = merge_batches(old.clone(), vec![old_block.clone()], vec![], vec![]);
        assert_eq!(outcome.baselines, old);
        assert_eq!(outcome.blocks, vec![old_block]);
        assert!(outcome.excluded.is_empty());
    }

    #[test]
    fn test_new_records_append_in_batch_order() {
        let old = vec![baseline(5, horizontal(0.0))];
        let new = vec![
            baseline(9, horizontal(10.0)),
            baseline(2, horizontal(20.0)),
        ];

        let outcome = merge_batches(old, vec![], new, vec![]);
        let ids: Vec<i64> = outcome.baselines.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![5, 9, 2]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut edited = baseline(1, horizontal(0.0));
        edited.user_modified = true;
        let old = vec![edited, baseline(2, horizontal(20.0))];
        let new_baselines = vec![baseline(1, horizontal(5.0)), baseline(3, horizontal(30.0))];
        let new_blocks = vec![block(7, vec![1, 3])];

        let once = merge_batches(
            old.clone(),
            vec![],
            new_baselines.clone(),
            new_blocks.clone(),
        );
        let twice = merge_batches(
            once.baselines.clone(),
            once.blocks.clone(),
            new_baselines,
            new_blocks,
        );
        assert_eq!(once.baselines, twice.baselines);
        assert_eq!(once.blocks, twice.blocks);
    }

    #[test]
    fn test_broken_linkage_drops_only_the_affected_block() {
        // Prior state references a baseline that is gone (removed through an
        // external edit). The stale block is excluded, everything else stays.
        let old_blocks = vec![block(3, vec![1, 99]), block(4, vec![1])];
        let old_baselines = vec![baseline(1, horizontal(0.0))];

        let outcome = merge_batches(old_baselines, old_blocks, vec![], vec![]);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.blocks[0].block_id, 4);
        assert_eq!(
            outcome.excluded,
            vec![BrokenLinkage {
                block_id: 3,
                missing_baseline_ids: vec![99],
            }]
        );
    }

    #[test]
    fn test_user_modified_block_keeps_membership_and_gains_advisory() {
        let mut edited = block(7, vec![1, 2]);
        edited.user_modified = true;
        edited.top_spline_points = vec![Point::new(0.0, 1.0)];

        let mut fresh = block(7, vec![1, 2, 3]);
        fresh.distortion_type = DistortionType::Perspective;
        fresh.confidence = 0.55;

        let baselines = vec![
            baseline(1, horizontal(0.0)),
            baseline(2, horizontal(10.0)),
            baseline(3, horizontal(20.0)),
        ];
        let outcome = merge_batches(baselines, vec![edited], vec![], vec![fresh]);

        let merged = &outcome.blocks[0];
        assert_eq!(merged.baseline_ids, vec![1, 2]);
        assert_eq!(merged.top_spline_points, vec![Point::new(0.0, 1.0)]);
        assert_eq!(merged.distortion_type, DistortionType::Curved);
        let advisory = merged.advisory.as_ref().unwrap();
        assert_eq!(advisory.distortion_type, DistortionType::Perspective);
        assert_eq!(advisory.confidence, 0.55);
    }
}
