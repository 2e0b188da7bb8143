//! Numeric helpers shared across the pipeline.

pub mod math;
pub mod stats;
