// src/correlation.rs

use crate::config::Scaling;
use crate::error::{InvalidArgument, NumericalError, Result};
use crate::standardize::StandardizedMatrix;
use float_cmp::approx_eq;
use log::{debug, info};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Which association matrix was built from the standardized data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatrixKind {
    /// Pearson correlation (unit-variance columns). Unit diagonal.
    Correlation,
    /// Sample covariance (centered-only columns).
    Covariance,
}

/// Symmetric p×p association matrix of the features.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    matrix: Array2<f64>,
    kind: MatrixKind,
}

impl CorrelationMatrix {
    /// Wraps an existing symmetric matrix, e.g. one computed elsewhere.
    ///
    /// Only the shape is checked here; symmetry and definiteness are checked by
    /// [`crate::EigenDecomposition::compute`].
    ///
    /// # Errors
    /// [`crate::InvalidArgument::DimensionMismatch`] if the matrix is not square.
    pub fn from_matrix(matrix: Array2<f64>, kind: MatrixKind) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(InvalidArgument::DimensionMismatch {
                expected: matrix.nrows(),
                got: matrix.ncols(),
            }
            .into());
        }
        Ok(Self { matrix, kind })
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    pub fn n_features(&self) -> usize {
        self.matrix.nrows()
    }

    /// Entry for features `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }

    /// Sum of the diagonal; equals p for a correlation matrix.
    pub fn trace(&self) -> f64 {
        self.matrix.diag().sum()
    }
}

/// Computes `Z^T Z / (n - 1)` for the standardized matrix `Z` and symmetrizes
/// the result as `(M + M^T) / 2`.
///
/// For unit-variance input this is the Pearson correlation matrix of the
/// original data; every diagonal entry is then checked against 1 and the
/// off-diagonal entries are clamped into [-1, 1].
///
/// # Errors
/// [`NumericalError::DiagonalNotUnit`] if a correlation diagonal entry is
/// further than `diagonal_tolerance` from 1.
pub fn correlate(
    standardized: &StandardizedMatrix,
    diagonal_tolerance: f64,
) -> Result<CorrelationMatrix> {
    let z = standardized.data();
    let n_samples = z.nrows();
    info!(
        "Building {}x{} association matrix from {} samples.",
        z.ncols(),
        z.ncols(),
        n_samples
    );

    let mut gram = z.t().dot(z);
    gram /= (n_samples - 1) as f64;
    let mut matrix = (&gram + &gram.t()) * 0.5;

    let kind = match standardized.feature_scaling().scaling() {
        Scaling::UnitVariance => MatrixKind::Correlation,
        Scaling::CenterOnly => MatrixKind::Covariance,
    };

    if kind == MatrixKind::Correlation {
        for (index, &value) in matrix.diag().iter().enumerate() {
            if !approx_eq!(f64, value, 1.0, epsilon = diagonal_tolerance) {
                return Err(NumericalError::DiagonalNotUnit { index, value }.into());
            }
        }
        matrix.mapv_inplace(|r| r.clamp(-1.0, 1.0));
    }

    debug!("Association matrix ({:?}):\n{:.4}", kind, matrix);
    Ok(CorrelationMatrix { matrix, kind })
}
