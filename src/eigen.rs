// src/eigen.rs

use crate::config::EigenChecks;
use crate::correlation::{CorrelationMatrix, MatrixKind};
use crate::diagnostics::{max_symmetry_deviation, orthogonality_error};
use crate::error::{NumericalError, Result};
use crate::linalg_backends::{EighOutput, Eigensolver};
use float_cmp::approx_eq;
use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// One eigenvalue with its unit eigenvector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Eigenpair {
    /// Position of this pair in the solver's output. Used as the tie-breaker
    /// when two eigenvalues are equal.
    pub index: usize,
    pub eigenvalue: f64,
    /// Shape: (n_features)
    pub eigenvector: Array1<f64>,
}

/// All p eigenpairs of a symmetric association matrix, unsorted.
///
/// Invariants (checked in [`EigenDecomposition::compute`]): eigenvalues are
/// non-negative, their sum matches the matrix trace, and the eigenvectors are
/// orthonormal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenDecomposition {
    pairs: Vec<Eigenpair>,
    trace: f64,
    kind: MatrixKind,
}

impl EigenDecomposition {
    /// Runs `solver` on `matrix` and validates its output.
    ///
    /// If the solver reports [`NumericalError::NotConverged`] and offers a
    /// relaxed variant, that variant is tried exactly once, with a warning.
    /// No other failure is retried.
    ///
    /// # Errors
    /// [`NumericalError::NotSymmetric`] before solving; the solver's own error;
    /// then [`NumericalError::NotPositiveSemiDefinite`],
    /// [`NumericalError::TraceMismatch`] or [`NumericalError::NotOrthonormal`]
    /// if a self-check fails.
    pub fn compute<E: Eigensolver>(
        solver: &E,
        matrix: &CorrelationMatrix,
        checks: &EigenChecks,
    ) -> Result<Self> {
        let n_features = matrix.n_features();
        info!("Eigendecomposing {}x{} {:?} matrix.", n_features, n_features, matrix.kind());

        let max_deviation = max_symmetry_deviation(&matrix.view());
        if max_deviation > checks.symmetry_tolerance {
            return Err(NumericalError::NotSymmetric {
                max_deviation,
                tolerance: checks.symmetry_tolerance,
            }
            .into());
        }

        let output = match solver.eigendecompose(matrix.view()) {
            Ok(output) => output,
            Err(NumericalError::NotConverged {
                sweeps,
                off_diagonal,
            }) => {
                let relaxed = solver.relaxed().ok_or(NumericalError::NotConverged {
                    sweeps,
                    off_diagonal,
                })?;
                warn!(
                    "Eigensolver did not converge after {} sweeps (off-diagonal norm {:.3e}); retrying once with a looser tolerance.",
                    sweeps, off_diagonal
                );
                relaxed.eigendecompose(matrix.view())?
            }
            Err(e) => return Err(e.into()),
        };

        let decomposition = Self::validate(output, matrix, checks)?;
        debug!(
            "Eigenvalues (solver order): {:?}",
            decomposition.eigenvalues()
        );
        Ok(decomposition)
    }

    fn validate(
        output: EighOutput,
        matrix: &CorrelationMatrix,
        checks: &EigenChecks,
    ) -> Result<Self> {
        let n_features = matrix.n_features();
        let EighOutput {
            eigenvalues,
            eigenvectors,
        } = output;
        if eigenvalues.len() != n_features || eigenvectors.dim() != (n_features, n_features) {
            return Err(NumericalError::Backend(format!(
                "Eigensolver returned {} eigenvalues and a {:?} eigenvector matrix for a {}x{} input.",
                eigenvalues.len(),
                eigenvectors.dim(),
                n_features,
                n_features
            ))
            .into());
        }

        let trace = matrix.trace();
        let eigenvalue_sum = eigenvalues.sum();
        let trace_margin = checks.trace_tolerance * trace.abs().max(1.0);
        if !approx_eq!(f64, eigenvalue_sum, trace, epsilon = trace_margin) {
            return Err(NumericalError::TraceMismatch {
                trace,
                eigenvalue_sum,
            }
            .into());
        }

        let orthogonality = orthogonality_error(&eigenvectors.view());
        if orthogonality > checks.orthonormality_tolerance {
            return Err(NumericalError::NotOrthonormal {
                error: orthogonality,
            }
            .into());
        }

        let psd_margin = checks.psd_tolerance * trace.abs().max(1.0);
        let mut pairs = Vec::with_capacity(n_features);
        for (index, (&eigenvalue, eigenvector)) in eigenvalues
            .iter()
            .zip(eigenvectors.axis_iter(Axis(1)))
            .enumerate()
        {
            if eigenvalue < -psd_margin || !eigenvalue.is_finite() {
                return Err(NumericalError::NotPositiveSemiDefinite {
                    index,
                    value: eigenvalue,
                }
                .into());
            }
            pairs.push(Eigenpair {
                index,
                // Round-off below zero on a PSD matrix.
                eigenvalue: eigenvalue.max(0.0),
                eigenvector: eigenvector.to_owned(),
            });
        }

        Ok(Self {
            pairs,
            trace,
            kind: matrix.kind(),
        })
    }

    pub fn pairs(&self) -> &[Eigenpair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// Trace of the decomposed matrix (p for a correlation matrix).
    pub fn trace(&self) -> f64 {
        self.trace
    }

    /// Eigenvalues in solver order.
    pub fn eigenvalues(&self) -> Array1<f64> {
        self.pairs.iter().map(|pair| pair.eigenvalue).collect()
    }

    pub fn eigenvalue_sum(&self) -> f64 {
        self.pairs.iter().map(|pair| pair.eigenvalue).sum()
    }

    /// Eigenvectors as columns, in solver order. Shape: (n_features, n_features)
    pub fn eigenvectors(&self) -> Array2<f64> {
        let n = self.pairs.len();
        let mut vectors = Array2::<f64>::zeros((n, n));
        for (mut column, pair) in vectors.columns_mut().into_iter().zip(self.pairs.iter()) {
            column.assign(&pair.eigenvector);
        }
        vectors
    }

    /// Eigenvector of the pair at solver position `index`.
    pub fn eigenvector(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        self.pairs.get(index).map(|pair| pair.eigenvector.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcaError;
    use crate::linalg_backends::JacobiEigensolver;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn correlation(m: Array2<f64>) -> CorrelationMatrix {
        CorrelationMatrix::from_matrix(m, MatrixKind::Correlation).unwrap()
    }

    #[test]
    fn eigenvalues_sum_to_feature_count() {
        let m = correlation(array![
            [1.0, 0.8, 0.1],
            [0.8, 1.0, -0.2],
            [0.1, -0.2, 1.0]
        ]);
        let eigen = EigenDecomposition::compute(&JacobiEigensolver::default(), &m, &EigenChecks::default()).unwrap();
        assert_eq!(eigen.len(), 3);
        assert_abs_diff_eq!(eigen.eigenvalue_sum(), 3.0, epsilon = 1e-10);
        assert!(eigen.eigenvalues().iter().all(|&v| v >= 0.0));
        assert!(orthogonality_error(&eigen.eigenvectors().view()) < 1e-10);
    }

    #[test]
    fn asymmetric_matrix_is_rejected_before_solving() {
        let m = correlation(array![[1.0, 0.5], [0.4, 1.0]]);
        let err = EigenDecomposition::compute(&JacobiEigensolver::default(), &m, &EigenChecks::default()).unwrap_err();
        assert!(matches!(
            err,
            PcaError::Numerical(NumericalError::NotSymmetric { .. })
        ));
    }

    #[test]
    fn indefinite_matrix_is_rejected() {
        // Eigenvalues 1 + 1.5 and 1 - 1.5.
        let m = correlation(array![[1.0, 1.5], [1.5, 1.0]]);
        let err = EigenDecomposition::compute(&JacobiEigensolver::default(), &m, &EigenChecks::default()).unwrap_err();
        assert!(matches!(
            err,
            PcaError::Numerical(NumericalError::NotPositiveSemiDefinite { .. })
        ));
    }

    /// Fails to converge until relaxed; counts how often it is called.
    struct Stubborn {
        relaxed: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Eigensolver for Stubborn {
        fn eigendecompose(&self, matrix: ndarray::ArrayView2<'_, f64>) -> std::result::Result<EighOutput, NumericalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.relaxed {
                JacobiEigensolver::default().eigendecompose(matrix)
            } else {
                Err(NumericalError::NotConverged {
                    sweeps: 3,
                    off_diagonal: 0.1,
                })
            }
        }

        fn relaxed(&self) -> Option<Self> {
            Some(Stubborn {
                relaxed: true,
                calls: Arc::clone(&self.calls),
            })
        }
    }

    #[test]
    fn non_convergence_is_retried_once_with_relaxed_solver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let solver = Stubborn {
            relaxed: false,
            calls: Arc::clone(&calls),
        };
        let m = correlation(array![[1.0, 0.3], [0.3, 1.0]]);
        let eigen = EigenDecomposition::compute(&solver, &m, &EigenChecks::default()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_abs_diff_eq!(eigen.eigenvalue_sum(), 2.0, epsilon = 1e-12);
    }

    /// Never converges and offers no relaxed variant.
    struct NeverConverges;

    impl Eigensolver for NeverConverges {
        fn eigendecompose(&self, _matrix: ndarray::ArrayView2<'_, f64>) -> std::result::Result<EighOutput, NumericalError> {
            Err(NumericalError::NotConverged {
                sweeps: 7,
                off_diagonal: 0.5,
            })
        }
    }

    #[test]
    fn non_convergence_without_relaxed_variant_surfaces() {
        let m = correlation(array![[1.0, 0.3], [0.3, 1.0]]);
        let err = EigenDecomposition::compute(&NeverConverges, &m, &EigenChecks::default()).unwrap_err();
        assert_eq!(
            err,
            PcaError::Numerical(NumericalError::NotConverged {
                sweeps: 7,
                off_diagonal: 0.5
            })
        );
    }

    /// Returns eigenvalues that do not add up to the trace.
    struct WrongTrace;

    impl Eigensolver for WrongTrace {
        fn eigendecompose(&self, matrix: ndarray::ArrayView2<'_, f64>) -> std::result::Result<EighOutput, NumericalError> {
            let n = matrix.nrows();
            Ok(EighOutput {
                eigenvalues: Array1::from_elem(n, 2.0),
                eigenvectors: Array2::eye(n),
            })
        }
    }

    #[test]
    fn trace_self_check_catches_bad_solver() {
        let m = correlation(Array2::eye(3));
        let err = EigenDecomposition::compute(&WrongTrace, &m, &EigenChecks::default()).unwrap_err();
        assert!(matches!(
            err,
            PcaError::Numerical(NumericalError::TraceMismatch { .. })
        ));
    }

    /// Returns a fixed eigen-output regardless of the input.
    struct Fixed(EighOutput);

    impl Eigensolver for Fixed {
        fn eigendecompose(&self, _matrix: ndarray::ArrayView2<'_, f64>) -> std::result::Result<EighOutput, NumericalError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn skewed_eigenvectors_are_not_orthonormal() {
        let m = correlation(Array2::eye(2));
        let solver = Fixed(EighOutput {
            eigenvalues: array![1.0, 1.0],
            eigenvectors: array![[1.0, 1.0], [0.0, 1.0]],
        });
        match EigenDecomposition::compute(&solver, &m, &EigenChecks::default()) {
            Err(PcaError::Numerical(NumericalError::NotOrthonormal { error })) => {
                assert!(error > 1.0, "orthogonality error {}", error);
            }
            other => panic!("expected NotOrthonormal, got {:?}", other),
        }
    }

    #[test]
    fn round_off_negative_eigenvalue_is_clamped_to_zero() {
        let m = correlation(Array2::eye(2));
        let solver = Fixed(EighOutput {
            eigenvalues: array![2.0 + 1e-12, -1e-12],
            eigenvectors: Array2::eye(2),
        });
        let eigen = EigenDecomposition::compute(&solver, &m, &EigenChecks::default()).unwrap();
        assert_eq!(eigen.pairs()[1].eigenvalue, 0.0);
        assert_abs_diff_eq!(eigen.pairs()[0].eigenvalue, 2.0, epsilon = 1e-11);
        assert_abs_diff_eq!(eigen.eigenvalue_sum(), 2.0, epsilon = 1e-11);
    }
}
