//! Per-marker score test against the fitted null model.

pub mod single_variant;

pub use single_variant::{ScoreTestEngine, ScoreTestResult};
