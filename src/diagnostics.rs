// src/diagnostics.rs

use crate::correlation::MatrixKind;
use crate::pca::PcaOutput;
use ndarray::{Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

// --- Utility Functions for Metrics ---

/// Computes the Frobenius norm of a matrix.
pub fn frobenius_norm(matrix: &ArrayView2<f64>) -> f64 {
    if matrix.is_empty() {
        return 0.0;
    }
    matrix.iter().map(|&x| x * x).sum::<f64>().sqrt()
}

/// Frobenius norm of the off-diagonal part of a square matrix.
pub fn off_diagonal_norm(matrix: &ArrayView2<f64>) -> f64 {
    matrix
        .indexed_iter()
        .filter(|((i, j), _)| i != j)
        .map(|(_, &x)| x * x)
        .sum::<f64>()
        .sqrt()
}

/// Largest `|M[i][j] - M[j][i]|` of a square matrix.
pub fn max_symmetry_deviation(matrix: &ArrayView2<f64>) -> f64 {
    let n = matrix.nrows().min(matrix.ncols());
    let mut max_deviation = 0.0_f64;
    for i in 0..n {
        for j in (i + 1)..n {
            max_deviation = max_deviation.max((matrix[[i, j]] - matrix[[j, i]]).abs());
        }
    }
    max_deviation
}

/// Computes `||I - Q^T Q||_F` for a matrix with (ideally) orthonormal columns.
pub fn orthogonality_error(q_matrix: &ArrayView2<f64>) -> f64 {
    if q_matrix.ncols() == 0 {
        return 0.0;
    }
    let gram = q_matrix.t().dot(q_matrix);
    let identity = Array2::<f64>::eye(q_matrix.ncols());
    frobenius_norm(&(&identity - &gram).view())
}

/// Numeric health of one pipeline run.
///
/// Every field is an error magnitude: zero is ideal, and values around 1e-12
/// are ordinary floating-point noise.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Largest absolute column mean of the standardized matrix.
    pub max_abs_column_mean: f64,
    /// Largest deviation of a standardized column's sample std from its target
    /// (1 for unit-variance scaling, the raw std for center-only scaling).
    pub max_column_std_error: f64,
    /// Largest `|M - M^T|` entry of the association matrix.
    pub correlation_symmetry_error: f64,
    /// Largest `|M[i][i] - 1|`; `None` for covariance matrices.
    pub correlation_diagonal_error: Option<f64>,
    /// `|sum(eigenvalues) - trace|`.
    pub eigenvalue_trace_error: f64,
    /// `||I - V^T V||_F` over all eigenvectors.
    pub eigenvector_orthogonality_error: f64,
    /// `||I - P^T P||_F` of the projection matrix.
    pub projection_orthogonality_error: f64,
    /// `||Z - Z P P^T||_F / ||Z||_F`: share of the standardized data lost by
    /// the selected subspace. Zero when every component is kept.
    pub relative_reconstruction_error: f64,
    /// Largest `|var(score_j) - eigenvalue_j|` over the selected components.
    pub max_score_variance_error: f64,
}

impl PipelineDiagnostics {
    /// Measures the invariants of every stage of a finished run.
    pub fn collect(output: &PcaOutput) -> Self {
        let z = output.standardized().data();
        let scaling = output.feature_scaling();

        let max_abs_column_mean = z
            .mean_axis(Axis(0))
            .map(|means| means.iter().fold(0.0_f64, |acc, m| acc.max(m.abs())))
            .unwrap_or(0.0);
        let targets = scaling.std_devs() / &scaling.divisors();
        let max_column_std_error = z
            .std_axis(Axis(0), 1.0)
            .iter()
            .zip(targets.iter())
            .fold(0.0_f64, |acc, (s, t)| acc.max((s - t).abs()));

        let correlation = output.correlation();
        let correlation_diagonal_error = match correlation.kind() {
            MatrixKind::Correlation => Some(
                correlation
                    .matrix()
                    .diag()
                    .iter()
                    .fold(0.0_f64, |acc, d| acc.max((d - 1.0).abs())),
            ),
            MatrixKind::Covariance => None,
        };

        let eigen = output.eigen_decomposition();
        let projection = output.projection().view();
        let scores = output.projected().scores();

        let reconstructed = scores.dot(&projection.t());
        let z_norm = frobenius_norm(&z.view());
        let relative_reconstruction_error = if z_norm > 0.0 {
            frobenius_norm(&(z - &reconstructed).view()) / z_norm
        } else {
            0.0
        };

        let max_score_variance_error = scores
            .var_axis(Axis(0), 1.0)
            .iter()
            .zip(output.variance_report().iter())
            .fold(0.0_f64, |acc, (var, component)| {
                acc.max((var - component.eigenvalue).abs())
            });

        PipelineDiagnostics {
            max_abs_column_mean,
            max_column_std_error,
            correlation_symmetry_error: max_symmetry_deviation(&correlation.view()),
            correlation_diagonal_error,
            eigenvalue_trace_error: (eigen.eigenvalue_sum() - eigen.trace()).abs(),
            eigenvector_orthogonality_error: orthogonality_error(&eigen.eigenvectors().view()),
            projection_orthogonality_error: orthogonality_error(&projection),
            relative_reconstruction_error,
            max_score_variance_error,
        }
    }
}
