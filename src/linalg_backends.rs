// src/linalg_backends.rs

use crate::config::JacobiConfig;
use crate::diagnostics::{frobenius_norm, off_diagonal_norm};
use crate::error::NumericalError;
use log::trace;
use ndarray::{Array1, Array2, ArrayView2};

/// Output of a symmetric eigendecomposition.
#[derive(Debug, Clone)]
pub struct EighOutput {
    /// Eigenvalues, in whatever order the backend produced them.
    pub eigenvalues: Array1<f64>,
    /// Eigenvectors as columns of the matrix.
    /// eigenvectors.column(i) corresponds to eigenvalues[i].
    pub eigenvectors: Array2<f64>,
}

/// Symmetric eigendecomposition capability.
///
/// Implementers receive a symmetric matrix (symmetry is checked by the caller)
/// and return all eigenpairs in no particular order. The sign of each
/// eigenvector is implementation-defined.
pub trait Eigensolver: Send + Sync {
    fn eigendecompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EighOutput, NumericalError>;

    /// A looser-tolerance variant used for a single retry after
    /// [`NumericalError::NotConverged`]. `None` disables the retry.
    fn relaxed(&self) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

fn check_square(matrix: &ArrayView2<'_, f64>) -> Result<(), NumericalError> {
    if matrix.nrows() != matrix.ncols() {
        return Err(NumericalError::Backend(format!(
            "Matrix must be square for eigendecomposition, got {}x{}.",
            matrix.nrows(),
            matrix.ncols()
        )));
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::Backend(
            "Matrix contains non-finite entries.".to_string(),
        ));
    }
    Ok(())
}

// --- Cyclic Jacobi (pure Rust, default) ---

/// Cyclic Jacobi eigensolver for small dense symmetric matrices.
///
/// Each sweep visits every off-diagonal pair (p, q) once and applies the plane
/// rotation that zeroes `A[p][q]`, accumulating the rotations into the
/// eigenvector matrix. Converges once the off-diagonal Frobenius norm falls to
/// `tolerance * ||A||_F`.
#[derive(Debug, Clone, Default)]
pub struct JacobiEigensolver {
    config: JacobiConfig,
}

impl JacobiEigensolver {
    pub fn new(config: JacobiConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &JacobiConfig {
        &self.config
    }
}

impl Eigensolver for JacobiEigensolver {
    fn eigendecompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EighOutput, NumericalError> {
        check_square(&matrix)?;
        let n = matrix.nrows();
        let mut a = matrix.to_owned();
        let mut v = Array2::<f64>::eye(n);

        let threshold = self.config.tolerance * frobenius_norm(&a.view());
        let mut sweeps = 0;
        loop {
            let off_diagonal = off_diagonal_norm(&a.view());
            trace!(
                "Jacobi sweep {}: off-diagonal norm {:.3e} (threshold {:.3e})",
                sweeps,
                off_diagonal,
                threshold
            );
            if off_diagonal <= threshold {
                break;
            }
            if sweeps == self.config.max_sweeps {
                return Err(NumericalError::NotConverged {
                    sweeps,
                    off_diagonal,
                });
            }
            for p in 0..n.saturating_sub(1) {
                for q in (p + 1)..n {
                    rotate(&mut a, &mut v, p, q);
                }
            }
            sweeps += 1;
        }

        Ok(EighOutput {
            eigenvalues: a.diag().to_owned(),
            eigenvectors: v,
        })
    }

    fn relaxed(&self) -> Option<Self> {
        let mut config = self.config.clone();
        config.tolerance *= config.relaxed_tolerance_factor;
        config.max_sweeps *= 2;
        Some(Self { config })
    }
}

/// Applies `A <- J^T A J` and `V <- V J` for the rotation `J` in the (p, q) plane
/// that annihilates `A[p][q]`.
fn rotate(a: &mut Array2<f64>, v: &mut Array2<f64>, p: usize, q: usize) {
    let apq = a[[p, q]];
    if apq == 0.0 {
        return;
    }
    let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
    // Smaller root of t^2 + 2 theta t - 1 = 0 keeps the rotation angle <= pi/4.
    let t = if theta.abs() > 1e150 {
        0.5 / theta
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let c = 1.0 / (t * t + 1.0).sqrt();
    let s = t * c;
    let n = a.nrows();

    for k in 0..n {
        let akp = a[[k, p]];
        let akq = a[[k, q]];
        a[[k, p]] = c * akp - s * akq;
        a[[k, q]] = s * akp + c * akq;
    }
    for k in 0..n {
        let apk = a[[p, k]];
        let aqk = a[[q, k]];
        a[[p, k]] = c * apk - s * aqk;
        a[[q, k]] = s * apk + c * aqk;
    }
    a[[p, q]] = 0.0;
    a[[q, p]] = 0.0;

    for k in 0..n {
        let vkp = v[[k, p]];
        let vkq = v[[k, q]];
        v[[k, p]] = c * vkp - s * vkq;
        v[[k, q]] = s * vkp + c * vkq;
    }
}

// --- LAPACK via ndarray-linalg ---
#[cfg(feature = "lapack")]
mod lapack_backend {
    use super::{check_square, EighOutput, Eigensolver};
    use crate::error::NumericalError;
    use ndarray::ArrayView2;
    use ndarray_linalg::{Eigh, UPLO};

    /// `?syevd` through `ndarray-linalg`, reading the upper triangle.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct LapackEigensolver;

    impl Eigensolver for LapackEigensolver {
        fn eigendecompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EighOutput, NumericalError> {
            check_square(&matrix)?;
            let (eigenvalues, eigenvectors) = matrix
                .eigh(UPLO::Upper)
                .map_err(|e| NumericalError::Backend(format!("LAPACK eigh failed: {}", e)))?;
            Ok(EighOutput {
                eigenvalues,
                eigenvectors,
            })
        }
    }
}

#[cfg(feature = "lapack")]
pub use lapack_backend::LapackEigensolver;

// --- faer ---
#[cfg(feature = "backend_faer")]
mod faer_backend {
    use super::{check_square, EighOutput, Eigensolver};
    use crate::error::NumericalError;
    use faer::{Mat, Side};
    use ndarray::{Array1, Array2, ArrayView2};

    /// Self-adjoint eigendecomposition from `faer`.
    #[derive(Debug, Default, Copy, Clone)]
    pub struct FaerEigensolver;

    impl Eigensolver for FaerEigensolver {
        fn eigendecompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EighOutput, NumericalError> {
            check_square(&matrix)?;
            let n = matrix.nrows();
            if n == 0 {
                return Ok(EighOutput {
                    eigenvalues: Array1::zeros(0),
                    eigenvectors: Array2::zeros((0, 0)),
                });
            }
            let faer_mat = Mat::<f64>::from_fn(n, n, |i, j| matrix[[i, j]]);
            let eig = faer_mat
                .as_ref()
                .self_adjoint_eigen(Side::Lower)
                .map_err(|e| NumericalError::Backend(format!("faer eigendecomposition failed: {:?}", e)))?;
            let values = eig.S().column_vector();
            let vectors = eig.U();
            Ok(EighOutput {
                eigenvalues: Array1::from_shape_fn(n, |i| values[i]),
                eigenvectors: Array2::from_shape_fn((n, n), |(i, j)| vectors[(i, j)]),
            })
        }
    }
}

#[cfg(feature = "backend_faer")]
pub use faer_backend::FaerEigensolver;

// --- Provider dispatch ---

/// Dispatches to the eigensolver selected by compile-time features: a LAPACK
/// backend when one is enabled, otherwise `faer` (the default feature),
/// otherwise the built-in Jacobi solver.
///
/// [`JacobiEigensolver`] can always be chosen explicitly through
/// [`crate::PCA::with_solver`].
#[derive(Debug, Clone, Default)]
pub struct EigensolverProvider {
    jacobi: JacobiEigensolver,
}

impl EigensolverProvider {
    pub fn new(jacobi: JacobiConfig) -> Self {
        Self {
            jacobi: JacobiEigensolver::new(jacobi),
        }
    }

    /// Name of the backend this build dispatches to.
    pub fn backend_name(&self) -> &'static str {
        #[cfg(feature = "lapack")]
        {
            "lapack"
        }
        #[cfg(all(feature = "backend_faer", not(feature = "lapack")))]
        {
            "faer"
        }
        #[cfg(not(any(feature = "lapack", feature = "backend_faer")))]
        {
            "jacobi"
        }
    }
}

impl Eigensolver for EigensolverProvider {
    fn eigendecompose(&self, matrix: ArrayView2<'_, f64>) -> Result<EighOutput, NumericalError> {
        #[cfg(feature = "lapack")]
        {
            LapackEigensolver.eigendecompose(matrix)
        }
        #[cfg(all(feature = "backend_faer", not(feature = "lapack")))]
        {
            FaerEigensolver.eigendecompose(matrix)
        }
        #[cfg(not(any(feature = "lapack", feature = "backend_faer")))]
        {
            self.jacobi.eigendecompose(matrix)
        }
    }

    fn relaxed(&self) -> Option<Self> {
        if self.backend_name() != "jacobi" {
            return None;
        }
        self.jacobi.relaxed().map(|jacobi| Self { jacobi })
    }
}
