// src/pca.rs

use crate::config::PcaConfig;
use crate::correlation::{correlate, CorrelationMatrix};
use crate::dataset::Dataset;
use crate::diagnostics::PipelineDiagnostics;
use crate::eigen::EigenDecomposition;
use crate::error::Result;
use crate::linalg_backends::{Eigensolver, EigensolverProvider};
use crate::projection::{inverse_project, project, ProjectedDataset};
use crate::selection::{rank_and_select, validate_component_count, ProjectionMatrix, VarianceReport};
use crate::standardize::{standardize, FeatureScaling, StandardizedMatrix};
use log::{debug, info, log_enabled, Level};
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Correlation-based principal component analysis.
///
/// A `PCA` holds only configuration and an eigensolver; it never stores a
/// fitted model. Every call to [`PCA::fit`] recomputes all stages from the
/// dataset and returns them in a [`PcaOutput`], so one `PCA` can be shared
/// between threads and reused for any number of datasets.
///
/// The default eigensolver is chosen at compile time (see
/// [`EigensolverProvider`]); [`PCA::with_solver`] plugs in any other
/// [`Eigensolver`].
#[derive(Debug, Clone)]
pub struct PCA<E = EigensolverProvider> {
    config: PcaConfig,
    solver: E,
}

impl Default for PCA {
    fn default() -> Self {
        Self::new()
    }
}

impl PCA {
    /// Creates a PCA with the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use correlation_pca::PCA;
    /// let pca = PCA::new();
    /// ```
    pub fn new() -> Self {
        Self::with_config(PcaConfig::default())
    }

    /// Creates a PCA with `config` and the compile-time default eigensolver.
    pub fn with_config(config: PcaConfig) -> Self {
        let solver = EigensolverProvider::new(config.jacobi.clone());
        Self { config, solver }
    }
}

impl<E: Eigensolver> PCA<E> {
    /// Creates a PCA that decomposes with `solver` instead of the default backend.
    pub fn with_solver(config: PcaConfig, solver: E) -> Self {
        Self { config, solver }
    }

    pub fn config(&self) -> &PcaConfig {
        &self.config
    }

    pub fn solver(&self) -> &E {
        &self.solver
    }

    /// Runs the full pipeline on `dataset` and keeps `n_components` components.
    ///
    /// Stages run in order: standardize, build the correlation matrix,
    /// eigendecompose, rank and select, project. The first failing stage
    /// aborts the run; no partial output is returned.
    ///
    /// * `dataset` - Validated input table, shape (n_samples, n_features).
    /// * `n_components` - Number of components to keep, `1..=n_features`.
    ///                    There is no default.
    ///
    /// # Errors
    /// [`crate::InvalidArgument::ComponentCount`] before any computation if
    /// `n_components` is out of range; [`crate::InputError::ZeroVariance`]
    /// for a constant column; any [`crate::NumericalError`] raised around the
    /// eigendecomposition.
    ///
    /// # Examples
    ///
    /// ```
    /// use correlation_pca::{Dataset, PCA};
    /// use ndarray::array;
    ///
    /// let dataset = Dataset::new(array![
    ///     [2.5, 2.4, 1.2],
    ///     [0.5, 0.7, 0.3],
    ///     [2.2, 2.9, 1.1],
    ///     [1.9, 2.2, 0.2],
    ///     [3.1, 3.0, 0.9],
    /// ])
    /// .unwrap();
    /// let output = PCA::new().fit(&dataset, 2).unwrap();
    /// assert_eq!(output.projected().scores().dim(), (5, 2));
    /// assert!(output.variance_report().components()[0].percent > 50.0);
    /// ```
    pub fn fit(&self, dataset: &Dataset, n_components: usize) -> Result<PcaOutput> {
        let start = Instant::now();
        let (n_samples, n_features) = (dataset.n_samples(), dataset.n_features());
        validate_component_count(n_components, n_features)?;
        info!(
            "Starting PCA on {} samples x {} features, keeping {} components.",
            n_samples, n_features, n_components
        );

        let standardized = standardize(
            dataset,
            self.config.scaling,
            self.config.zero_variance_tolerance,
        )?;
        debug!("Standardization finished after {:?}.", start.elapsed());

        let correlation = correlate(&standardized, self.config.diagonal_tolerance)?;
        debug!("Association matrix finished after {:?}.", start.elapsed());

        let eigen =
            EigenDecomposition::compute(&self.solver, &correlation, &self.config.eigen_checks)?;
        debug!("Eigendecomposition finished after {:?}.", start.elapsed());

        let (report, projection) =
            rank_and_select(&eigen, n_components, self.config.sign_convention)?;
        let projected = project(
            &standardized,
            &projection,
            dataset.labels().map(|labels| labels.to_vec()),
        )?;

        let output = PcaOutput {
            feature_names: dataset.feature_names().to_vec(),
            standardized,
            correlation,
            eigen,
            report,
            projection,
            projected,
        };

        if log_enabled!(Level::Debug) {
            debug!("Pipeline diagnostics: {:?}", output.diagnostics());
        }
        info!("PCA finished in {:?}.", start.elapsed());
        Ok(output)
    }
}

/// Every stage output of one [`PCA::fit`] call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PcaOutput {
    feature_names: Vec<String>,
    standardized: StandardizedMatrix,
    correlation: CorrelationMatrix,
    eigen: EigenDecomposition,
    report: VarianceReport,
    projection: ProjectionMatrix,
    projected: ProjectedDataset,
}

impl PcaOutput {
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn standardized(&self) -> &StandardizedMatrix {
        &self.standardized
    }

    /// Means and standard deviations learned from the training data.
    pub fn feature_scaling(&self) -> &FeatureScaling {
        self.standardized.feature_scaling()
    }

    pub fn correlation(&self) -> &CorrelationMatrix {
        &self.correlation
    }

    /// All eigenpairs, in solver order.
    pub fn eigen_decomposition(&self) -> &EigenDecomposition {
        &self.eigen
    }

    pub fn variance_report(&self) -> &VarianceReport {
        &self.report
    }

    pub fn projection(&self) -> &ProjectionMatrix {
        &self.projection
    }

    pub fn projected(&self) -> &ProjectedDataset {
        &self.projected
    }

    pub fn n_components(&self) -> usize {
        self.projection.n_components()
    }

    /// Projects new raw rows with the fitted means, scales and components.
    ///
    /// * `raw` - Rows in original units, shape (m_samples, n_features).
    ///
    /// # Errors
    /// [`crate::InvalidArgument::DimensionMismatch`] if the column count
    /// differs from the training data.
    pub fn transform(&self, raw: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let z = self.feature_scaling().apply(raw)?;
        Ok(z.dot(self.projection.matrix()))
    }

    /// Maps scores back to the standardized feature space.
    ///
    /// # Errors
    /// [`crate::InvalidArgument::DimensionMismatch`] if `scores` does not
    /// have `n_components` columns.
    pub fn inverse_transform(&self, scores: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        inverse_project(scores, &self.projection)
    }

    /// Maps scores back to the original units of the features.
    ///
    /// # Errors
    /// Same as [`PcaOutput::inverse_transform`].
    pub fn reconstruct(&self, scores: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let z = self.inverse_transform(scores)?;
        self.feature_scaling().invert(z.view())
    }

    /// Measures the numeric health of this run.
    pub fn diagnostics(&self) -> PipelineDiagnostics {
        PipelineDiagnostics::collect(self)
    }
}
