//! Gaussian null model: phenotype ~ intercept + covariates, no covariance
//! structure. Its residuals and projection feed the per-marker score test.

pub mod null_model;
pub mod serialization;

pub use null_model::{fit_null_model, FixedEffect, ModelError, NullModel};
