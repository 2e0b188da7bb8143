//! Core traits for genotype reading.

use anyhow::Result;

/// Information about a genetic marker (variant).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerInfo {
    /// Chromosome (e.g. "1", "22", "X").
    pub chrom: String,
    /// Position in base pairs.
    pub pos: u64,
    /// Marker/variant ID. Opaque, unique within a store.
    pub id: String,
    /// Reference allele.
    pub ref_allele: String,
    /// Alternative allele (the counted allele).
    pub alt_allele: String,
}

/// Data for a single marker across the current sample set.
#[derive(Debug, Clone)]
pub struct MarkerData {
    /// Marker metadata.
    pub info: MarkerInfo,
    /// Dosage values for each sample (0.0, 1.0 or 2.0).
    /// Missing values represented as NaN.
    pub dosages: Vec<f64>,
    /// Allele frequency of the alt allele.
    pub af: f64,
    /// Minor allele count.
    pub mac: f64,
    /// Number of non-missing samples.
    pub n_valid: usize,
}

impl MarkerData {
    /// Build marker data from dosages, computing the summary counts.
    pub fn new(info: MarkerInfo, dosages: Vec<f64>) -> Self {
        let (af, mac, n_valid) = Self::compute_af(&dosages);
        Self {
            info,
            dosages,
            af,
            mac,
            n_valid,
        }
    }

    /// Compute allele frequency, minor allele count and non-missing count.
    pub fn compute_af(dosages: &[f64]) -> (f64, f64, usize) {
        let mut sum = 0.0;
        let mut n = 0usize;
        for &d in dosages {
            if !d.is_nan() {
                sum += d;
                n += 1;
            }
        }
        let af = if n > 0 { sum / (2.0 * n as f64) } else { 0.0 };
        let mac = sum.min(2.0 * n as f64 - sum);
        (af, mac, n)
    }

    /// Sum of the non-missing dosages.
    pub fn dosage_sum(&self) -> f64 {
        self.dosages.iter().filter(|d| !d.is_nan()).sum()
    }

    /// Whether any sample is missing at this marker.
    pub fn has_missing(&self) -> bool {
        self.n_valid < self.dosages.len()
    }

    /// Impute missing dosages with twice the allele frequency (the mean dosage).
    pub fn impute_missing(&mut self) {
        let impute_val = 2.0 * self.af;
        for d in &mut self.dosages {
            if d.is_nan() {
                *d = impute_val;
            }
        }
    }
}

/// Trait for reading genotype data from a store.
///
/// Readers hold their file handles for as long as they live; dropping the
/// reader releases them.
pub trait GenotypeReader: Send {
    /// Total number of markers in the store.
    fn n_markers(&self) -> usize;

    /// Number of samples in the current subset (all samples if unset).
    fn n_samples(&self) -> usize;

    /// Sample IDs of the current subset, in read order.
    fn sample_ids(&self) -> &[String];

    /// Restrict subsequent reads to `ids`, in the given order.
    ///
    /// IDs not present in the store are dropped silently, so the effective
    /// subset is the inner join of `ids` with the store's samples.
    fn set_sample_subset(&mut self, ids: &[String]) -> Result<()>;

    /// Read genotype data for the marker at the given index.
    fn read_marker(&mut self, index: u64) -> Result<MarkerData>;

    /// Get marker info without reading genotype data.
    fn marker_info(&self, index: u64) -> Result<MarkerInfo>;
}
