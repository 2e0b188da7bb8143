//! Single-variant score test against the Gaussian null model.
//!
//! Computes the score test statistic for a single marker:
//!   g_tilde = g - X * (X'X)^{-1} * X' * g
//!   S = g' * residuals / sigma2
//!   var = g_tilde' * g_tilde / sigma2
//!   T = S^2 / var ~ chi-sq(1)
//!
//! The residuals are orthogonal to X, so S needs no projection; only the
//! variance uses g_tilde. Nothing guards against a marker in the span of X:
//! its g_tilde is rounding noise, var collapses towards zero while S keeps
//! the residuals' own rounding error, and T becomes arbitrarily large.

use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::Serialize;

use cscan_geno::MarkerData;
use cscan_linalg::dense::DenseMatrix;

use crate::model::NullModel;
use crate::util::stats::chi2_1df_pvalue;

/// Result of a single-variant score test.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreTestResult {
    /// Marker ID.
    pub marker_id: String,
    pub chrom: String,
    pub pos: u64,
    pub ref_allele: String,
    pub alt_allele: String,
    /// Allele count of alt allele.
    pub ac: f64,
    /// Allele frequency of alt allele.
    pub af: f64,
    /// Minor allele count.
    pub mac: f64,
    /// Number of non-missing samples (missing ones are mean-imputed).
    pub n: usize,
    /// Score statistic.
    pub score: f64,
    /// Variance of the score statistic.
    pub var: f64,
    /// Chi-squared test statistic.
    pub tstat: f64,
    pub pvalue: f64,
    /// Effect size estimate S / var.
    pub beta: f64,
    /// Standard error of beta.
    pub se_beta: f64,
}

/// Engine for running score tests. Initialized from a null model.
pub struct ScoreTestEngine {
    /// Residuals (y - fitted) in model sample order.
    pub residuals: Vec<f64>,
    /// Residual variance.
    pub sigma2: f64,
    /// Precomputed (X'X)^{-1} X' of shape (p x n).
    pub xtx_inv_xt: DenseMatrix,
    /// Design matrix X (n x p).
    pub x: DenseMatrix,
}

impl ScoreTestEngine {
    pub fn from_null_model(model: &NullModel) -> Self {
        Self {
            residuals: model.residuals.clone(),
            sigma2: model.sigma2,
            xtx_inv_xt: model.projection(),
            x: model.design(),
        }
    }

    /// Run the score test for a single marker.
    ///
    /// The marker's dosages must be aligned with the null model's samples.
    pub fn test_marker(&self, marker: &MarkerData) -> Result<ScoreTestResult> {
        let n = self.residuals.len();
        if marker.dosages.len() != n {
            bail!(
                "Marker {} has {} dosages, null model has {} samples",
                marker.info.id,
                marker.dosages.len(),
                n
            );
        }

        let g = if marker.has_missing() {
            let mut imputed = marker.clone();
            imputed.impute_missing();
            imputed.dosages
        } else {
            marker.dosages.clone()
        };

        // g_tilde = g - X * (X'X)^{-1} * X' * g
        let coef = self.xtx_inv_xt.mat_vec(&g);
        let x_proj = self.x.mat_vec(&coef);
        let g_tilde: Vec<f64> = g
            .iter()
            .zip(x_proj.iter())
            .map(|(gi, xi)| gi - xi)
            .collect();

        let score = DenseMatrix::dot(&g, &self.residuals) / self.sigma2;
        let var = DenseMatrix::dot(&g_tilde, &g_tilde) / self.sigma2;

        // Only an exactly zero g_tilde is untestable.
        let (tstat, beta, se_beta) = if var > 0.0 {
            (score * score / var, score / var, 1.0 / var.sqrt())
        } else {
            (0.0, 0.0, f64::INFINITY)
        };

        let ac = marker.dosage_sum();
        Ok(ScoreTestResult {
            marker_id: marker.info.id.clone(),
            chrom: marker.info.chrom.clone(),
            pos: marker.info.pos,
            ref_allele: marker.info.ref_allele.clone(),
            alt_allele: marker.info.alt_allele.clone(),
            ac,
            af: marker.af,
            mac: marker.mac,
            n: marker.n_valid,
            score,
            var,
            tstat,
            pvalue: chi2_1df_pvalue(tstat),
            beta,
            se_beta,
        })
    }

    /// Test a block of markers in parallel. Output order follows input order.
    pub fn test_block(&self, markers: &[MarkerData]) -> Result<Vec<ScoreTestResult>> {
        markers.par_iter().map(|m| self.test_marker(m)).collect()
    }
}
