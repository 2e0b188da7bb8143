//! NullModel: the fitted Gaussian null model, used as input for the score scan.
//!
//! Contains everything the scan needs:
//! - Residuals and the residual variance sigma2
//! - The design matrix X and the projection (X'X)^{-1} X'
//! - The fixed-effects table for reporting

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use cscan_linalg::decomposition::{CholeskyDecomp, LinalgError};
use cscan_linalg::dense::DenseMatrix;

use crate::util::stats::two_sided_t_pvalue;

/// Name of the intercept term, as R prints it.
pub const INTERCEPT: &str = "(Intercept)";

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Need more samples than model terms: {n} samples, {p} terms")]
    TooFewSamples { n: usize, p: usize },

    #[error("Design has {rows} rows but {n} phenotype values")]
    DimensionMismatch { rows: usize, n: usize },

    #[error("{names} term names for {cols} design columns")]
    TermCount { names: usize, cols: usize },

    #[error("Phenotype value for sample {id} is not finite")]
    NonFinitePhenotype { id: String },

    #[error("Design matrix is not of full rank: {0}")]
    Linalg(#[from] LinalgError),
}

/// One row of the fixed-effects table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedEffect {
    pub name: String,
    pub estimate: f64,
    pub se: f64,
    pub t_stat: f64,
    pub pvalue: f64,
}

/// The fitted null model, serialized to `null_model.json`.
#[derive(Debug, Clone, Serialize)]
pub struct NullModel {
    /// Version number for forward compatibility.
    pub version: u32,
    /// Sample IDs in model order.
    pub sample_ids: Vec<String>,
    /// Number of samples.
    pub n_samples: usize,
    /// Term names, intercept first.
    pub terms: Vec<String>,
    pub fixed_effects: Vec<FixedEffect>,
    /// Residual variance RSS / (n - p).
    pub sigma2: f64,
    /// Residual degrees of freedom n - p.
    pub df_resid: usize,
    pub fitted: Vec<f64>,
    /// Residuals (y - fitted).
    pub residuals: Vec<f64>,
    /// Phenotype values (y).
    pub y: Vec<f64>,
    /// Design matrix X as flat col-major vector (n x p).
    pub x_flat: Vec<f64>,
    /// Number of columns in X.
    pub x_ncols: usize,
    /// Precomputed (X'X)^{-1} X' as flat col-major (p x n).
    pub xtx_inv_xt_flat: Vec<f64>,
}

impl NullModel {
    /// Current model version.
    pub const VERSION: u32 = 1;

    pub fn design(&self) -> DenseMatrix {
        DenseMatrix::from_col_major(self.n_samples, self.x_ncols, self.x_flat.clone())
    }

    /// (X'X)^{-1} X', p x n.
    pub fn projection(&self) -> DenseMatrix {
        DenseMatrix::from_col_major(self.x_ncols, self.n_samples, self.xtx_inv_xt_flat.clone())
    }

    pub fn fixed_effect(&self, name: &str) -> Option<&FixedEffect> {
        self.fixed_effects.iter().find(|fe| fe.name == name)
    }
}

/// Build the design [1, c_1, ..., c_k] from named covariate columns.
///
/// Returns the design and its term names, intercept first.
pub fn design_with_intercept(covariates: &[(&str, &[f64])]) -> (DenseMatrix, Vec<String>) {
    let n = covariates.first().map_or(0, |(_, v)| v.len());
    let ones = vec![1.0; n];
    let mut columns: Vec<&[f64]> = Vec::with_capacity(covariates.len() + 1);
    columns.push(&ones);
    let mut terms = vec![INTERCEPT.to_string()];
    for (name, values) in covariates {
        columns.push(*values);
        terms.push(name.to_string());
    }
    (DenseMatrix::from_columns(&columns), terms)
}

/// Fit y ~ X by least squares through the Cholesky factor of X'X.
///
/// `terms` names the columns of `x`. The intercept, if any, must already be
/// a column of `x`.
pub fn fit_null_model(
    sample_ids: Vec<String>,
    y: Vec<f64>,
    x: &DenseMatrix,
    terms: Vec<String>,
) -> Result<NullModel, ModelError> {
    let n = y.len();
    let p = x.ncols();
    if x.nrows() != n || sample_ids.len() != n {
        return Err(ModelError::DimensionMismatch { rows: x.nrows(), n });
    }
    if terms.len() != p {
        return Err(ModelError::TermCount {
            names: terms.len(),
            cols: p,
        });
    }
    if n <= p {
        return Err(ModelError::TooFewSamples { n, p });
    }
    if let Some(i) = y.iter().position(|v| !v.is_finite()) {
        return Err(ModelError::NonFinitePhenotype {
            id: sample_ids[i].clone(),
        });
    }

    let chol = CholeskyDecomp::new(&x.xtx())?;
    let alpha = chol.solve(&x.xtv(&y));
    let xtx_inv = chol.inverse();

    let fitted = x.mat_vec(&alpha);
    let residuals: Vec<f64> = y.iter().zip(fitted.iter()).map(|(yi, fi)| yi - fi).collect();
    let rss = DenseMatrix::dot(&residuals, &residuals);
    let df_resid = n - p;
    let sigma2 = rss / df_resid as f64;
    debug!("Null model RSS = {:.6}, df = {}", rss, df_resid);

    let fixed_effects: Vec<FixedEffect> = terms
        .iter()
        .zip(alpha.iter())
        .enumerate()
        .map(|(j, (name, &estimate))| {
            let se = (sigma2 * xtx_inv.get(j, j)).sqrt();
            let t_stat = estimate / se;
            FixedEffect {
                name: name.clone(),
                estimate,
                se,
                t_stat,
                pvalue: two_sided_t_pvalue(t_stat, df_resid as f64),
            }
        })
        .collect();

    for fe in &fixed_effects {
        info!(
            "  {}: estimate = {:.6}, se = {:.6}, p = {:.4e}",
            fe.name, fe.estimate, fe.se, fe.pvalue
        );
    }

    let projection = xtx_inv.mat_mul(&x.transpose());

    Ok(NullModel {
        version: NullModel::VERSION,
        n_samples: n,
        sample_ids,
        terms,
        fixed_effects,
        sigma2,
        df_resid,
        fitted,
        residuals,
        y,
        x_flat: x.to_col_major(),
        x_ncols: p,
        xtx_inv_xt_flat: projection.to_col_major(),
    })
}
