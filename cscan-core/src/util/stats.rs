//! Reference distributions for test statistics.
//!
//! Upper tails use the survival function directly so that very small
//! p-values keep their precision instead of collapsing to `1 - 1 = 0`.

use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};

/// Upper-tail p-value of a 1-df chi-squared statistic. NaN for invalid input.
pub fn chi2_1df_pvalue(stat: f64) -> f64 {
    if stat.is_nan() {
        return f64::NAN;
    }
    match ChiSquared::new(1.0) {
        Ok(chi2) => chi2.sf(stat.max(0.0)),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
pub fn two_sided_t_pvalue(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}
