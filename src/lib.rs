//! Bridge between an external text detection pipeline and a document
//! dewarping model.
//!
//! Detection runs export two JSON files, one with text baselines and one
//! with text blocks. This crate loads and validates them, reconciles the
//! fresh geometry with any previously imported (and possibly user-edited)
//! state, and populates the result into the dewarping engine's baseline
//! collection and distortion model through two narrow upsert traits.

pub mod cycle;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod model;
pub mod populate;
pub mod reconcile;
pub mod sink;

pub use cycle::{run_cycle, CycleReport};
pub use error::{BridgeError, RecordKind, SourceKind};
pub use geometry::{Point, Rect};
pub use loader::{load_results, LoadOutcome};
pub use model::{Baseline, DistortionType, TextBlock};
pub use reconcile::{merge_batches, BrokenLinkage, ReconcileOutcome};
pub use sink::{BaselineSink, DistortionModelSink, InMemoryModel};
