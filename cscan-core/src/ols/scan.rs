//! Per-marker OLS scan: phenotype ~ genotype + covariate.

use rayon::prelude::*;
use serde::Serialize;

use cscan_geno::MarkerData;

use super::linear::{fit, OlsError};

/// Term name of the genotype column.
pub const GENOTYPE_TERM: &str = "genotype";

/// Genotype coefficient of one marker's fit.
#[derive(Debug, Clone, Serialize)]
pub struct OlsMarkerResult {
    pub marker_id: String,
    pub chrom: String,
    pub pos: u64,
    pub estimate: f64,
    pub se: f64,
    pub t_stat: f64,
    pub pvalue: f64,
    /// Genotype was a linear combination of the intercept (estimate is NaN).
    pub aliased: bool,
    /// Covariate was a linear combination of intercept and genotype.
    pub covariate_aliased: bool,
    /// Complete-case rows in the fit.
    pub n: usize,
}

/// Phenotype and covariate shared by every per-marker fit.
pub struct OlsScan {
    pub y: Vec<f64>,
    pub covariate: Vec<f64>,
    pub covariate_name: String,
}

impl OlsScan {
    pub fn new(y: Vec<f64>, covariate: Vec<f64>, covariate_name: &str) -> Self {
        Self {
            y,
            covariate,
            covariate_name: covariate_name.to_string(),
        }
    }

    /// Fit one marker. Missing dosages drop their rows (complete cases).
    pub fn fit_marker(&self, marker: &MarkerData) -> Result<OlsMarkerResult, OlsError> {
        let fit = fit(
            &self.y,
            &[
                (GENOTYPE_TERM, marker.dosages.as_slice()),
                (self.covariate_name.as_str(), self.covariate.as_slice()),
            ],
        )?;
        // Term order is fixed: intercept, genotype, covariate.
        let geno = &fit.coefficients[1];
        let covariate_aliased = fit.coefficients[2].aliased;

        Ok(OlsMarkerResult {
            marker_id: marker.info.id.clone(),
            chrom: marker.info.chrom.clone(),
            pos: marker.info.pos,
            estimate: geno.estimate,
            se: geno.se,
            t_stat: geno.t_stat,
            pvalue: geno.pvalue,
            aliased: geno.aliased,
            covariate_aliased,
            n: fit.n,
        })
    }

    /// Fit a block of markers in parallel. Output order follows input order.
    pub fn fit_block(&self, markers: &[MarkerData]) -> Result<Vec<OlsMarkerResult>, OlsError> {
        markers.par_iter().map(|m| self.fit_marker(m)).collect()
    }
}
