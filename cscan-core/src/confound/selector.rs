//! Confounded-marker selection.
//!
//! Draws marker indices uniformly at random until one has exactly two
//! distinct non-missing dosage levels whose sum reaches `MIN_DOSAGE_SUM`.
//! Such a marker can be turned into a two-level covariate that is a
//! deterministic function of the marker's genotype.

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use cscan_geno::{GenotypeReader, MarkerData};

/// Minimum sum of non-missing dosages for a marker to qualify.
pub const MIN_DOSAGE_SUM: f64 = 10.0;

/// Default bound on the number of random draws.
pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

#[derive(Error, Debug)]
pub enum SelectionError {
    #[error("Genotype store has no markers")]
    EmptyStore,

    #[error("No qualifying marker found after {attempts} attempts")]
    NoQualifyingMarker { attempts: usize },

    #[error(transparent)]
    Read(#[from] anyhow::Error),
}

/// A marker chosen to be confounded with the synthesized covariate.
#[derive(Debug, Clone)]
pub struct ConfoundedSelection {
    /// Index of the marker in the store.
    pub marker_index: u64,
    /// Marker data restricted to the reader's sample subset at selection time.
    pub marker: MarkerData,
    /// Sample IDs aligned with `marker.dosages`.
    pub sample_ids: Vec<String>,
    /// The two dosage levels, ascending.
    pub levels: (f64, f64),
    /// Number of draws it took.
    pub attempts: usize,
}

impl ConfoundedSelection {
    pub fn marker_id(&self) -> &str {
        &self.marker.info.id
    }
}

/// The two distinct non-missing dosage levels (ascending) if the marker
/// qualifies, `None` otherwise.
pub fn qualifying_levels(dosages: &[f64]) -> Option<(f64, f64)> {
    let mut levels: Vec<f64> = Vec::with_capacity(3);
    let mut sum = 0.0;
    for &d in dosages.iter().filter(|d| !d.is_nan()) {
        sum += d;
        if !levels.contains(&d) {
            levels.push(d);
            if levels.len() > 2 {
                return None;
            }
        }
    }
    if levels.len() != 2 || sum < MIN_DOSAGE_SUM {
        return None;
    }
    let (a, b) = (levels[0], levels[1]);
    Some(if a < b { (a, b) } else { (b, a) })
}

/// Draw random markers until one qualifies, giving up after `max_attempts`.
///
/// Reads go through the reader's current sample subset, so qualification is
/// judged on the sampled individuals only.
pub fn select_confounded_marker<G, R>(
    reader: &mut G,
    rng: &mut R,
    max_attempts: usize,
) -> Result<ConfoundedSelection, SelectionError>
where
    G: GenotypeReader + ?Sized,
    R: Rng + ?Sized,
{
    let n_markers = reader.n_markers() as u64;
    if n_markers == 0 {
        return Err(SelectionError::EmptyStore);
    }

    for attempt in 1..=max_attempts {
        let index = rng.gen_range(0..n_markers);
        let marker = reader.read_marker(index)?;
        match qualifying_levels(&marker.dosages) {
            Some(levels) => {
                info!(
                    "Selected marker {} (index {}) after {} draws: levels {} / {}, dosage sum {}",
                    marker.info.id,
                    index,
                    attempt,
                    levels.0,
                    levels.1,
                    marker.dosage_sum()
                );
                return Ok(ConfoundedSelection {
                    marker_index: index,
                    sample_ids: reader.sample_ids().to_vec(),
                    marker,
                    levels,
                    attempts: attempt,
                });
            }
            None => debug!("Draw {}: marker {} does not qualify", attempt, marker.info.id),
        }
    }

    Err(SelectionError::NoQualifyingMarker {
        attempts: max_attempts,
    })
}
