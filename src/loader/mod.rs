//! Result loader: parses the two detection result files into validated
//! record batches.
//!
//! Loading is all-or-nothing per batch. Hard invariant violations (missing
//! geometry, non-finite numbers, broken referential integrity) abort the
//! load; soft invariant violations (bounds containment, unrecognized
//! distortion tags) are collected as warnings and reported alongside the
//! batches.

pub mod format;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::error::{BridgeError, RecordKind, SourceKind};
use crate::geometry::{Point, Rect};
use crate::model::{Baseline, DistortionType, TextBlock};

use format::{ImageDimensions, RawBaseline, RawTextBlock, SUPPORTED_FORMAT_VERSION};

/// Slack (in pixels) allowed when checking declared bounds against geometry.
const BOUNDS_TOLERANCE: f64 = 0.5;

/// Validated batches produced by one load.
#[derive(Debug)]
pub struct LoadOutcome {
    pub baselines: Vec<Baseline>,
    pub blocks: Vec<TextBlock>,
    pub image_dimensions: ImageDimensions,
    /// Soft invariant violations, in encounter order.
    pub warnings: Vec<String>,
}

/// Load and validate the two result sources.
///
/// Returns the baseline batch and text block batch, or the first hard
/// invariant violation encountered. The live model is never touched here.
pub fn load_results(
    baseline_path: &Path,
    textblock_path: &Path,
) -> Result<LoadOutcome, BridgeError> {
    let baseline_file: format::BaselineFile = read_source(baseline_path, SourceKind::Baselines)?;
    let block_file: format::TextBlockFile = read_source(textblock_path, SourceKind::TextBlocks)?;

    let mut warnings = Vec::new();

    if baseline_file.format_version != SUPPORTED_FORMAT_VERSION {
        warnings.push(format!(
            "baseline source has format_version {:?}, expected {:?}",
            baseline_file.format_version, SUPPORTED_FORMAT_VERSION
        ));
    }
    if block_file.format_version != SUPPORTED_FORMAT_VERSION {
        warnings.push(format!(
            "text block source has format_version {:?}, expected {:?}",
            block_file.format_version, SUPPORTED_FORMAT_VERSION
        ));
    }
    if baseline_file.image_dimensions != block_file.image_dimensions {
        warnings.push(format!(
            "image dimensions disagree between sources: {}x{} vs {}x{}",
            baseline_file.image_dimensions.width,
            baseline_file.image_dimensions.height,
            block_file.image_dimensions.width,
            block_file.image_dimensions.height
        ));
    }

    let mut baselines = Vec::with_capacity(baseline_file.baselines.len());
    let mut seen_ids = HashSet::new();
    for raw in baseline_file.baselines {
        if !seen_ids.insert(raw.id) {
            return Err(BridgeError::malformed(
                RecordKind::Baseline,
                raw.id,
                "duplicate id within batch",
            ));
        }
        baselines.push(convert_baseline(raw, &mut warnings)?);
    }

    let baseline_ids: HashSet<i64> = baselines.iter().map(|b| b.id).collect();

    let mut blocks = Vec::with_capacity(block_file.distortion_models.len());
    let mut seen_block_ids = HashSet::new();
    for raw in block_file.distortion_models {
        if !seen_block_ids.insert(raw.block_id) {
            return Err(BridgeError::malformed(
                RecordKind::TextBlock,
                raw.block_id,
                "duplicate block_id within batch",
            ));
        }
        let block = convert_block(raw, &mut warnings)?;

        // Referential integrity within the batch
        if let Some(&missing) = block
            .baseline_ids
            .iter()
            .find(|id| !baseline_ids.contains(id))
        {
            return Err(BridgeError::DanglingReference {
                block_id: block.block_id,
                baseline_id: missing,
            });
        }

        check_bounds_containment(&block, &baselines, &mut warnings);
        blocks.push(block);
    }

    tracing::debug!(
        baselines = baselines.len(),
        blocks = blocks.len(),
        warnings = warnings.len(),
        "loaded detection results"
    );

    Ok(LoadOutcome {
        baselines,
        blocks,
        image_dimensions: baseline_file.image_dimensions,
        warnings,
    })
}

fn read_source<T: DeserializeOwned>(path: &Path, kind: SourceKind) -> Result<T, BridgeError> {
    let text = fs::read_to_string(path).map_err(|source| BridgeError::SourceUnavailable {
        kind,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| BridgeError::InvalidFormat {
        kind,
        path: path.to_path_buf(),
        source,
    })
}

fn convert_baseline(raw: RawBaseline, warnings: &mut Vec<String>) -> Result<Baseline, BridgeError> {
    let id = raw.id;
    if let Some(declared) = raw.num_points {
        if declared != raw.points.len() {
            return Err(BridgeError::malformed(
                RecordKind::Baseline,
                id,
                format!(
                    "num_points is {} but {} points are present",
                    declared,
                    raw.points.len()
                ),
            ));
        }
    }
    if raw.points.len() < 2 {
        return Err(BridgeError::malformed(
            RecordKind::Baseline,
            id,
            format!("needs at least 2 points, got {}", raw.points.len()),
        ));
    }
    ensure_finite_points(&raw.points, RecordKind::Baseline, id)?;
    ensure_finite(raw.curvature_estimate, "curvature_estimate", RecordKind::Baseline, id)?;
    ensure_unit_interval(raw.confidence, "confidence", RecordKind::Baseline, id)?;

    // Bounds are always the tight bbox of the points; the declared rectangle
    // is only cross-checked.
    let bounds = Rect::from_points(&raw.points).ok_or_else(|| {
        BridgeError::malformed(RecordKind::Baseline, id, "points are empty")
    })?;
    if let Some(declared) = raw.bounds {
        if !declared.is_finite() || !declared.approx_eq(&bounds, BOUNDS_TOLERANCE) {
            warnings.push(format!(
                "baseline {id}: declared bounds are not the tight bounding box of its points"
            ));
        }
    }

    // Manual baselines from the exporter are user-owned unless the flag says
    // otherwise explicitly.
    let user_modified = raw
        .user_modified
        .unwrap_or_else(|| raw.baseline_type.as_deref() == Some("manual"));

    Ok(Baseline {
        id,
        points: raw.points,
        bounds,
        curvature_estimate: raw.curvature_estimate,
        confidence: raw.confidence,
        user_modified,
        advisory: None,
    })
}

fn convert_block(raw: RawTextBlock, warnings: &mut Vec<String>) -> Result<TextBlock, BridgeError> {
    let id = raw.block_id;
    if raw.baseline_ids.is_empty() {
        return Err(BridgeError::malformed(
            RecordKind::TextBlock,
            id,
            "baseline_ids is empty",
        ));
    }
    if let Some(declared) = raw.num_baselines {
        if declared != raw.baseline_ids.len() {
            return Err(BridgeError::malformed(
                RecordKind::TextBlock,
                id,
                format!(
                    "num_baselines is {} but {} baseline ids are present",
                    declared,
                    raw.baseline_ids.len()
                ),
            ));
        }
    }

    let mut baseline_ids = raw.baseline_ids;
    baseline_ids.sort_unstable();
    let before = baseline_ids.len();
    baseline_ids.dedup();
    if baseline_ids.len() != before {
        warnings.push(format!("text block {id}: duplicate entries in baseline_ids"));
    }

    for (name, value) in [
        ("top_baseline_id", raw.top_baseline_id),
        ("bottom_baseline_id", raw.bottom_baseline_id),
    ] {
        if !baseline_ids.contains(&value) {
            return Err(BridgeError::malformed(
                RecordKind::TextBlock,
                id,
                format!("{name} {value} is not a member of baseline_ids"),
            ));
        }
    }
    if baseline_ids.len() > 1 && raw.top_baseline_id == raw.bottom_baseline_id {
        return Err(BridgeError::malformed(
            RecordKind::TextBlock,
            id,
            "top and bottom baseline ids coincide in a multi-baseline block",
        ));
    }

    if !raw.bounds.is_finite() {
        return Err(BridgeError::malformed(
            RecordKind::TextBlock,
            id,
            "bounds contain non-finite values",
        ));
    }
    ensure_unit_interval(
        raw.confidence_data.overall_confidence,
        "confidence",
        RecordKind::TextBlock,
        id,
    )?;

    let (top_spline_points, bottom_spline_points) = match raw.spline_params {
        Some(params) => (params.top_spline.control_points, params.bottom_spline.control_points),
        None => (Vec::new(), Vec::new()),
    };
    ensure_finite_points(&top_spline_points, RecordKind::TextBlock, id)?;
    ensure_finite_points(&bottom_spline_points, RecordKind::TextBlock, id)?;

    let distortion_type = DistortionType::from(raw.distortion_type);
    if !distortion_type.is_recognized() {
        warnings.push(format!(
            "text block {id}: unrecognized distortion_type {:?}",
            distortion_type.as_str()
        ));
    }

    Ok(TextBlock {
        block_id: id,
        baseline_ids,
        top_baseline_id: raw.top_baseline_id,
        bottom_baseline_id: raw.bottom_baseline_id,
        bounds: raw.bounds,
        distortion_type,
        confidence: raw.confidence_data.overall_confidence,
        user_modified: raw.user_modified.unwrap_or(false),
        top_spline_points,
        bottom_spline_points,
        advisory: None,
    })
}

/// Soft invariant: a block's bounds should contain the bounds of every
/// baseline it references. Detection noise makes this warn-only.
fn check_bounds_containment(block: &TextBlock, baselines: &[Baseline], warnings: &mut Vec<String>) {
    for baseline in baselines {
        if block.baseline_ids.contains(&baseline.id)
            && !block.bounds.contains_rect(&baseline.bounds, BOUNDS_TOLERANCE)
        {
            warnings.push(format!(
                "text block {}: bounds do not contain baseline {}",
                block.block_id, baseline.id
            ));
        }
    }
}

fn ensure_finite(value: f64, field: &str, kind: RecordKind, id: i64) -> Result<(), BridgeError> {
    if !value.is_finite() {
        return Err(BridgeError::malformed(
            kind,
            id,
            format!("{field} must be finite, got {value}"),
        ));
    }
    Ok(())
}

fn ensure_unit_interval(
    value: f64,
    field: &str,
    kind: RecordKind,
    id: i64,
) -> Result<(), BridgeError> {
    ensure_finite(value, field, kind, id)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(BridgeError::malformed(
            kind,
            id,
            format!("{field} must be in [0, 1], got {value}"),
        ));
    }
    Ok(())
}

fn ensure_finite_points(points: &[Point], kind: RecordKind, id: i64) -> Result<(), BridgeError> {
    if let Some(bad) = points.iter().find(|p| !p.is_finite()) {
        return Err(BridgeError::malformed(
            kind,
            id,
            format!("point ({}, {}) is not finite", bad.x, bad.y),
        ));
    }
    Ok(())
}
