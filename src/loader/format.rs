//! Raw serde structs mirroring the detection exporter's JSON layout.
//!
//! These deliberately stay close to the files on disk; conversion into model
//! records and all invariant checking happens in the loader itself.

use serde::Deserialize;

use crate::geometry::{Point, Rect};

pub const SUPPORTED_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-level layout of `baselines.json`.
#[derive(Debug, Deserialize)]
pub struct BaselineFile {
    pub format_version: String,
    pub image_dimensions: ImageDimensions,
    pub baselines: Vec<RawBaseline>,
}

#[derive(Debug, Deserialize)]
pub struct RawBaseline {
    pub id: i64,
    pub points: Vec<Point>,
    /// Redundant count emitted by the exporter; checked against `points`.
    #[serde(default)]
    pub num_points: Option<usize>,
    #[serde(default)]
    pub bounds: Option<Rect>,
    pub curvature_estimate: f64,
    pub confidence: f64,
    /// `"detected"` or `"manual"`; manual baselines are user-owned.
    #[serde(default)]
    pub baseline_type: Option<String>,
    #[serde(default)]
    pub user_modified: Option<bool>,
}

/// Top-level layout of `textblocks.json`.
#[derive(Debug, Deserialize)]
pub struct TextBlockFile {
    pub format_version: String,
    pub image_dimensions: ImageDimensions,
    pub distortion_models: Vec<RawTextBlock>,
}

#[derive(Debug, Deserialize)]
pub struct RawTextBlock {
    pub block_id: i64,
    #[serde(default)]
    pub num_baselines: Option<usize>,
    pub baseline_ids: Vec<i64>,
    pub top_baseline_id: i64,
    pub bottom_baseline_id: i64,
    pub bounds: Rect,
    pub distortion_type: String,
    #[serde(default)]
    pub spline_params: Option<RawSplineParams>,
    pub confidence_data: RawConfidence,
    #[serde(default)]
    pub user_modified: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct RawSplineParams {
    pub top_spline: RawSpline,
    pub bottom_spline: RawSpline,
}

#[derive(Debug, Deserialize)]
pub struct RawSpline {
    pub control_points: Vec<Point>,
}

#[derive(Debug, Deserialize)]
pub struct RawConfidence {
    pub overall_confidence: f64,
}
