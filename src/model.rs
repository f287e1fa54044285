//! Baseline and text block records as handed off to the dewarping model.
//!
//! Records are created by the loader, merged by the reconciler and moved into
//! the live model by the populator. Geometry on a record with
//! `user_modified = true` is owned by the user and is never replaced by
//! re-detected geometry; fresh detector metadata for such records is carried
//! in the advisory side channel instead.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Classification of how a text block deviates from a flat layout.
///
/// The closed vocabulary is `none`, `linear`, `curved` and `perspective`;
/// anything else a detector emits is carried verbatim as `Other` and flagged
/// by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DistortionType {
    None,
    Linear,
    Curved,
    Perspective,
    Other(String),
}

impl DistortionType {
    pub fn is_recognized(&self) -> bool {
        !matches!(self, DistortionType::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            DistortionType::None => "none",
            DistortionType::Linear => "linear",
            DistortionType::Curved => "curved",
            DistortionType::Perspective => "perspective",
            DistortionType::Other(tag) => tag,
        }
    }
}

impl From<String> for DistortionType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "none" => DistortionType::None,
            "linear" => DistortionType::Linear,
            "curved" => DistortionType::Curved,
            "perspective" => DistortionType::Perspective,
            _ => DistortionType::Other(tag),
        }
    }
}

impl From<DistortionType> for String {
    fn from(value: DistortionType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for DistortionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector metadata attached to a user-modified baseline instead of
/// overwriting its geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineAdvisory {
    pub confidence: f64,
    pub curvature_estimate: f64,
}

/// Detector metadata attached to a user-modified text block instead of
/// overwriting its geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockAdvisory {
    pub confidence: f64,
    pub distortion_type: DistortionType,
}

/// A detected text baseline.
///
/// `points` is the left-to-right trace of the baseline; its order is
/// semantically meaningful. `bounds` is always the tight bounding box of
/// `points` (the loader recomputes it on import).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub id: i64,
    pub points: Vec<Point>,
    pub bounds: Rect,
    pub curvature_estimate: f64,
    pub confidence: f64,
    #[serde(default)]
    pub user_modified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<BaselineAdvisory>,
}

/// A detected text block referencing baselines by id.
///
/// `baseline_ids` is kept sorted and deduplicated. The top and bottom ids are
/// always members of `baseline_ids`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub block_id: i64,
    pub baseline_ids: Vec<i64>,
    pub top_baseline_id: i64,
    pub bottom_baseline_id: i64,
    pub bounds: Rect,
    pub distortion_type: DistortionType,
    pub confidence: f64,
    #[serde(default)]
    pub user_modified: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_spline_points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bottom_spline_points: Vec<Point>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advisory: Option<BlockAdvisory>,
}

impl TextBlock {
    /// Ids referenced by this block that are absent from `resolve`.
    pub fn missing_references<F>(&self, mut resolve: F) -> Vec<i64>
    where
        F: FnMut(i64) -> bool,
    {
        self.baseline_ids
            .iter()
            .copied()
            .filter(|&id| !resolve(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distortion_type_parses_known_tags() {
        assert_eq!(DistortionType::from("curved".to_string()), DistortionType::Curved);
        assert_eq!(DistortionType::from("none".to_string()), DistortionType::None);
        assert!(DistortionType::Perspective.is_recognized());
    }

    #[test]
    fn test_distortion_type_carries_unknown_tags() {
        let t = DistortionType::from("cylindrical".to_string());
        assert_eq!(t, DistortionType::Other("cylindrical".to_string()));
        assert!(!t.is_recognized());
        assert_eq!(t.as_str(), "cylindrical");
    }

    #[test]
    fn test_distortion_type_serde_is_a_plain_string() {
        let json = serde_json::to_string(&DistortionType::Linear).unwrap();
        assert_eq!(json, "\"linear\"");
        let back: DistortionType = serde_json::from_str("\"cylindrical\"").unwrap();
        assert_eq!(back.as_str(), "cylindrical");
    }

    #[test]
    fn test_missing_references_filters_unresolved_ids() {
        let block = TextBlock {
            block_id: 3,
            baseline_ids: vec![1, 4, 9],
            top_baseline_id: 1,
            bottom_baseline_id: 9,
            bounds: Rect {
                left: 0.0,
                top: 0.0,
                right: 10.0,
                bottom: 10.0,
            },
            distortion_type: DistortionType::None,
            confidence: 0.9,
            user_modified: false,
            top_spline_points: vec![],
            bottom_spline_points: vec![],
            advisory: None,
        };
        let missing = block.missing_references(|id| id != 4);
        assert_eq!(missing, vec![4]);
    }
}
