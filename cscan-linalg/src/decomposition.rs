#![allow(clippy::needless_range_loop)]
//! Matrix decompositions and solvers.
//!
//! Cholesky for the SPD normal equations (X'X) of the null model, and a
//! column-by-column Householder-free QR (modified Gram-Schmidt) that detects
//! aliased columns the same way R's `lm` does: a column whose component
//! orthogonal to the previous columns is negligible relative to its own norm
//! is dropped rather than treated as an error.

use crate::dense::DenseMatrix;
use thiserror::Error;

/// Relative tolerance below which a column is considered aliased.
pub const DEFAULT_QR_TOL: f64 = 1e-7;

#[derive(Error, Debug)]
pub enum LinalgError {
    #[error("Matrix is not positive definite")]
    NotPositiveDefinite,

    #[error("Column {column} is a linear combination of earlier columns")]
    RankDeficient { column: usize },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Result of a Cholesky decomposition.
pub struct CholeskyDecomp {
    /// Lower triangular factor L such that A = L * L'.
    pub l: DenseMatrix,
}

impl CholeskyDecomp {
    /// Compute the Cholesky decomposition of a symmetric positive definite matrix.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(LinalgError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }
        let mut l = DenseMatrix::zeros(n, n);

        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l.get(j, k) * l.get(j, k);
            }
            let diag = a.get(j, j) - sum;
            if diag <= 0.0 {
                return Err(LinalgError::NotPositiveDefinite);
            }
            l.set(j, j, diag.sqrt());

            for i in (j + 1)..n {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += l.get(i, k) * l.get(j, k);
                }
                l.set(i, j, (a.get(i, j) - sum) / l.get(j, j));
            }
        }

        Ok(CholeskyDecomp { l })
    }

    /// Solve L * L' * x = b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let n = self.l.nrows();
        assert_eq!(b.len(), n);

        // Forward substitution: L * y = b
        let mut y = vec![0.0; n];
        for i in 0..n {
            let mut sum = 0.0;
            for j in 0..i {
                sum += self.l.get(i, j) * y[j];
            }
            y[i] = (b[i] - sum) / self.l.get(i, i);
        }

        // Backward substitution: L' * x = y
        let mut x = vec![0.0; n];
        for i in (0..n).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..n {
                sum += self.l.get(j, i) * x[j];
            }
            x[i] = (y[i] - sum) / self.l.get(i, i);
        }

        x
    }

    /// Compute A^{-1} = (L L')^{-1}.
    pub fn inverse(&self) -> DenseMatrix {
        let n = self.l.nrows();
        let mut inv = DenseMatrix::zeros(n, n);
        for j in 0..n {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            let col = self.solve(&e);
            inv.set_col(j, &col);
        }
        inv
    }
}

/// Thin QR decomposition A[:, kept] = Q * R with aliased columns removed.
pub struct QrDecomp {
    /// Orthonormal columns, m x rank.
    pub q: DenseMatrix,
    /// Upper triangular factor, rank x rank.
    pub r: DenseMatrix,
    /// Indices of the columns of A that entered the factorization.
    pub kept: Vec<usize>,
    /// Indices of the columns of A dropped as linear combinations of earlier ones.
    pub aliased: Vec<usize>,
}

impl QrDecomp {
    /// Full-rank QR. Fails with `RankDeficient` on the first aliased column.
    pub fn new(a: &DenseMatrix) -> Result<Self, LinalgError> {
        let qr = Self::with_tolerance(a, DEFAULT_QR_TOL)?;
        match qr.aliased.first() {
            Some(&column) => Err(LinalgError::RankDeficient { column }),
            None => Ok(qr),
        }
    }

    /// Rank-revealing QR via modified Gram-Schmidt.
    ///
    /// Columns are processed left to right; a column whose residual norm after
    /// orthogonalization is below `tol` times its original norm is aliased
    /// and skipped, so earlier columns always take precedence.
    pub fn with_tolerance(a: &DenseMatrix, tol: f64) -> Result<Self, LinalgError> {
        let m = a.nrows();
        let n = a.ncols();
        if m < n {
            return Err(LinalgError::DimensionMismatch { expected: n, got: m });
        }

        let mut q_cols: Vec<Vec<f64>> = Vec::with_capacity(n);
        let mut r_entries: Vec<Vec<f64>> = Vec::with_capacity(n);
        let mut kept = Vec::with_capacity(n);
        let mut aliased = Vec::new();

        for j in 0..n {
            let mut v = a.col(j);
            let original_norm = DenseMatrix::dot(&v, &v).sqrt();
            let mut r_col = Vec::with_capacity(q_cols.len() + 1);

            for q_col in &q_cols {
                let rij = DenseMatrix::dot(q_col, &v);
                r_col.push(rij);
                for k in 0..m {
                    v[k] -= rij * q_col[k];
                }
            }

            let norm = DenseMatrix::dot(&v, &v).sqrt();
            if original_norm == 0.0 || norm < tol * original_norm {
                aliased.push(j);
                continue;
            }
            r_col.push(norm);
            for vk in v.iter_mut() {
                *vk /= norm;
            }
            q_cols.push(v);
            r_entries.push(r_col);
            kept.push(j);
        }

        let rank = kept.len();
        let mut q = DenseMatrix::zeros(m, rank);
        let mut r = DenseMatrix::zeros(rank, rank);
        for (j, (q_col, r_col)) in q_cols.iter().zip(r_entries.iter()).enumerate() {
            q.set_col(j, q_col);
            for (i, &rij) in r_col.iter().enumerate() {
                r.set(i, j, rij);
            }
        }

        Ok(QrDecomp {
            q,
            r,
            kept,
            aliased,
        })
    }

    /// Numerical rank (number of kept columns).
    pub fn rank(&self) -> usize {
        self.kept.len()
    }

    /// Least-squares coefficients for the kept columns: solve R * x = Q' * b.
    pub fn solve(&self, b: &[f64]) -> Vec<f64> {
        let qtb = self.q.transpose().mat_vec(b);
        self.back_substitute(&qtb)
    }

    /// (R'R)^{-1}, i.e. (X'X)^{-1} restricted to the kept columns.
    pub fn unscaled_covariance(&self) -> DenseMatrix {
        let k = self.rank();
        let mut r_inv = DenseMatrix::zeros(k, k);
        for j in 0..k {
            let mut e = vec![0.0; k];
            e[j] = 1.0;
            r_inv.set_col(j, &self.back_substitute(&e));
        }
        r_inv.mat_mul(&r_inv.transpose())
    }

    fn back_substitute(&self, rhs: &[f64]) -> Vec<f64> {
        let k = self.rank();
        let mut x = vec![0.0; k];
        for i in (0..k).rev() {
            let mut sum = 0.0;
            for j in (i + 1)..k {
                sum += self.r.get(i, j) * x[j];
            }
            x[i] = (rhs[i] - sum) / self.r.get(i, i);
        }
        x
    }
}
