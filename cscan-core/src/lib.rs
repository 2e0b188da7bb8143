//! cscan-core: Statistical pipeline for cscan
//!
//! Reproduces the spurious score-test association of a marker that is
//! perfectly collinear with an adjustment covariate: confounded-marker
//! selection, covariate synthesis, phenotype simulation, the Gaussian null
//! model and per-marker score scan, the per-marker OLS comparison, and the
//! report builders.

pub mod compare;
pub mod confound;
pub mod model;
pub mod ols;
pub mod pipeline;
pub mod report;
pub mod score_test;
pub mod simulate;
pub mod util;
