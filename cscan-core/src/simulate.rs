//! Seeded simulation: individual subsampling and the null phenotype.
//!
//! The phenotype is drawn without looking at any genotype, so every
//! phenotype-marker association in the output is noise.

use rand::seq::index;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;
use tracing::debug;

use cscan_geno::phenotype::PhenotypeData;

pub const DEFAULT_PHENO_MEAN: f64 = 150.0;
pub const DEFAULT_PHENO_SD: f64 = 50.0;

#[derive(Error, Debug, PartialEq)]
pub enum SimulationError {
    #[error("Invalid Normal parameters: mean={mean}, sd={sd}")]
    InvalidNormal { mean: f64, sd: f64 },

    #[error("Cannot draw {requested} individuals from a population of {available}")]
    SampleTooLarge { requested: usize, available: usize },
}

/// Draw `n` distinct individuals uniformly without replacement.
///
/// The result keeps the population's order; downstream code joins on IDs,
/// so draw order carries no meaning.
pub fn subsample_individuals<R: Rng + ?Sized>(
    ids: &[String],
    n: usize,
    rng: &mut R,
) -> Result<Vec<String>, SimulationError> {
    if n > ids.len() {
        return Err(SimulationError::SampleTooLarge {
            requested: n,
            available: ids.len(),
        });
    }
    let mut picked = index::sample(rng, ids.len(), n).into_vec();
    picked.sort_unstable();
    debug!("Subsampled {} of {} individuals", n, ids.len());
    Ok(picked.into_iter().map(|i| ids[i].clone()).collect())
}

/// Draw one phenotype value per individual from Normal(mean, sd).
pub fn simulate_phenotype<R: Rng + ?Sized>(
    ids: &[String],
    mean: f64,
    sd: f64,
    rng: &mut R,
) -> Result<PhenotypeData, SimulationError> {
    if !mean.is_finite() || !sd.is_finite() || sd <= 0.0 {
        return Err(SimulationError::InvalidNormal { mean, sd });
    }
    let normal = Normal::new(mean, sd).map_err(|_| SimulationError::InvalidNormal { mean, sd })?;
    let phenotype = ids.iter().map(|_| normal.sample(&mut *rng)).collect();
    Ok(PhenotypeData {
        sample_ids: ids.to_vec(),
        phenotype,
    })
}
