//! cscan-linalg: Linear algebra wrappers for cscan.
//!
//! Provides the dense matrix type used for design matrices and the
//! decompositions behind the null-model fit and the per-marker OLS:
//! Cholesky for the SPD normal equations and a rank-revealing QR that
//! reports aliased (collinear) columns instead of failing.

pub mod decomposition;
pub mod dense;

pub use decomposition::LinalgError;
pub use dense::DenseMatrix;
