//! Linear model fit with rank-revealing QR.
//!
//! Mirrors R's `lm`: rows with a missing value in any column are dropped,
//! terms are entered left to right, and a term that is a linear combination
//! of earlier ones is aliased (reported with NaN estimate) instead of
//! failing the fit.

use thiserror::Error;

use cscan_linalg::decomposition::{LinalgError, QrDecomp, DEFAULT_QR_TOL};
use cscan_linalg::dense::DenseMatrix;

use crate::model::null_model::INTERCEPT;
use crate::util::stats::two_sided_t_pvalue;

#[derive(Error, Debug)]
pub enum OlsError {
    #[error("Predictor {name} has {got} values, response has {expected}")]
    LengthMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Only {complete} complete rows for {terms} terms")]
    TooFewObservations { complete: usize, terms: usize },

    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OlsCoefficient {
    pub name: String,
    pub estimate: f64,
    pub se: f64,
    pub t_stat: f64,
    pub pvalue: f64,
    /// Linear combination of earlier terms; all statistics are NaN.
    pub aliased: bool,
}

impl OlsCoefficient {
    fn aliased(name: &str) -> Self {
        Self {
            name: name.to_string(),
            estimate: f64::NAN,
            se: f64::NAN,
            t_stat: f64::NAN,
            pvalue: f64::NAN,
            aliased: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OlsFit {
    /// One entry per term, intercept first, in model order.
    pub coefficients: Vec<OlsCoefficient>,
    /// Complete-case rows used.
    pub n: usize,
    pub rank: usize,
    pub df_resid: usize,
    /// Residual variance RSS / df_resid (NaN with no residual df).
    pub sigma2: f64,
}

impl OlsFit {
    pub fn coefficient(&self, name: &str) -> Option<&OlsCoefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }
}

/// Fit `y ~ 1 + predictors` with the predictors in the given order.
pub fn fit(y: &[f64], predictors: &[(&str, &[f64])]) -> Result<OlsFit, OlsError> {
    for (name, values) in predictors {
        if values.len() != y.len() {
            return Err(OlsError::LengthMismatch {
                name: name.to_string(),
                expected: y.len(),
                got: values.len(),
            });
        }
    }

    let rows: Vec<usize> = (0..y.len())
        .filter(|&i| !y[i].is_nan() && predictors.iter().all(|(_, v)| !v[i].is_nan()))
        .collect();
    let terms = predictors.len() + 1;
    if rows.len() < terms {
        return Err(OlsError::TooFewObservations {
            complete: rows.len(),
            terms,
        });
    }

    let n = rows.len();
    let y_cc: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
    let mut x = DenseMatrix::zeros(n, terms);
    x.set_col(0, &vec![1.0; n]);
    for (j, (_, values)) in predictors.iter().enumerate() {
        let col: Vec<f64> = rows.iter().map(|&i| values[i]).collect();
        x.set_col(j + 1, &col);
    }

    let qr = QrDecomp::with_tolerance(&x, DEFAULT_QR_TOL)?;
    let beta = qr.solve(&y_cc);
    let rank = qr.rank();

    let rss: f64 = (0..n)
        .map(|i| {
            let fitted: f64 = qr
                .kept
                .iter()
                .zip(beta.iter())
                .map(|(&j, b)| x.get(i, j) * b)
                .sum();
            (y_cc[i] - fitted).powi(2)
        })
        .sum();
    let df_resid = n - rank;
    let sigma2 = if df_resid > 0 {
        rss / df_resid as f64
    } else {
        f64::NAN
    };
    let cov = qr.unscaled_covariance();

    let names: Vec<&str> = std::iter::once(INTERCEPT)
        .chain(predictors.iter().map(|(name, _)| *name))
        .collect();
    let mut coefficients: Vec<OlsCoefficient> =
        names.iter().map(|name| OlsCoefficient::aliased(name)).collect();
    for (k, &j) in qr.kept.iter().enumerate() {
        let estimate = beta[k];
        let se = (sigma2 * cov.get(k, k)).sqrt();
        let t_stat = estimate / se;
        coefficients[j] = OlsCoefficient {
            name: names[j].to_string(),
            estimate,
            se,
            t_stat,
            pvalue: two_sided_t_pvalue(t_stat, df_resid as f64),
            aliased: false,
        };
    }

    Ok(OlsFit {
        coefficients,
        n,
        rank,
        df_resid,
        sigma2,
    })
}
