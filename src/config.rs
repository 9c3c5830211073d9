// src/config.rs

use serde::{Deserialize, Serialize};

/// How each feature column is rescaled before the association matrix is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scaling {
    /// Center and divide by the sample standard deviation. The association
    /// matrix is then the Pearson correlation matrix.
    #[default]
    UnitVariance,
    /// Center only. The association matrix is then the sample covariance matrix.
    CenterOnly,
}

/// Sign applied to each selected eigenvector.
///
/// Eigensolvers may return either sign for an eigenvector. Both describe the
/// same axis, so the choice only matters for reproducibility across backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignConvention {
    /// Flip each vector so its largest-magnitude entry is positive
    /// (the first such entry when several share the maximum).
    #[default]
    LargestMagnitudePositive,
    /// Keep whatever sign the eigensolver produced.
    AsComputed,
}

/// Tolerances for the checks run around the eigendecomposition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenChecks {
    /// Maximum allowed `|M[i][j] - M[j][i]|` of the input matrix.
    pub symmetry_tolerance: f64,
    /// Eigenvalues in `[-psd_tolerance, 0)` are treated as round-off and clamped to 0.
    pub psd_tolerance: f64,
    /// Relative tolerance for `sum(eigenvalues) == trace`.
    pub trace_tolerance: f64,
    /// Maximum allowed `||I - V^T V||_F` of the eigenvector matrix.
    pub orthonormality_tolerance: f64,
}

impl Default for EigenChecks {
    fn default() -> Self {
        EigenChecks {
            symmetry_tolerance: 1e-9,
            psd_tolerance: 1e-8,
            trace_tolerance: 1e-8,
            orthonormality_tolerance: 1e-8,
        }
    }
}

/// Parameters of the cyclic Jacobi eigensolver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JacobiConfig {
    /// Upper bound on full sweeps over the off-diagonal entries.
    pub max_sweeps: usize,
    /// Converged once `||offdiag(A)||_F <= tolerance * ||A||_F`.
    pub tolerance: f64,
    /// Factor applied to `tolerance` for the single relaxed retry after a
    /// convergence failure.
    pub relaxed_tolerance_factor: f64,
}

impl Default for JacobiConfig {
    fn default() -> Self {
        JacobiConfig {
            max_sweeps: 64,
            tolerance: 1e-13,
            relaxed_tolerance_factor: 1e3,
        }
    }
}

/// Configuration for the PCA pipeline.
///
/// The number of components is deliberately not part of the configuration; it
/// is passed explicitly to [`crate::PCA::fit`] on every call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaConfig {
    /// Column scaling applied by the standardizer.
    pub scaling: Scaling,
    /// Sign normalization of the selected eigenvectors.
    pub sign_convention: SignConvention,
    /// A column is constant when `std <= zero_variance_tolerance * max_i |x_i|`,
    /// so only columns without relative spread fail, whatever their units.
    pub zero_variance_tolerance: f64,
    /// Allowed deviation of correlation diagonal entries from 1.
    pub diagonal_tolerance: f64,
    /// Checks run around the eigendecomposition.
    pub eigen_checks: EigenChecks,
    /// Parameters for the default Jacobi eigensolver.
    pub jacobi: JacobiConfig,
}

impl Default for PcaConfig {
    fn default() -> Self {
        PcaConfig {
            scaling: Scaling::UnitVariance,
            sign_convention: SignConvention::LargestMagnitudePositive,
            zero_variance_tolerance: 1e-12,
            diagonal_tolerance: 1e-9,
            eigen_checks: EigenChecks::default(),
            jacobi: JacobiConfig::default(),
        }
    }
}
