// Principal component analysis (PCA)

#![doc = include_str!("../README.md")]

pub mod config;
pub mod correlation;
pub mod dataset;
pub mod diagnostics;
pub mod eigen;
pub mod error;
pub mod linalg_backends;
pub mod pca;
pub mod projection;
pub mod selection;
pub mod standardize;

pub use config::{EigenChecks, JacobiConfig, PcaConfig, Scaling, SignConvention};
pub use correlation::{correlate, CorrelationMatrix, MatrixKind};
pub use dataset::Dataset;
pub use diagnostics::PipelineDiagnostics;
pub use eigen::{EigenDecomposition, Eigenpair};
pub use error::{InputError, InvalidArgument, NumericalError, PcaError, Result};
pub use linalg_backends::{EighOutput, Eigensolver, EigensolverProvider, JacobiEigensolver};
pub use pca::{PcaOutput, PCA};
pub use projection::{inverse_project, project, ProjectedDataset};
pub use selection::{rank_and_select, ComponentVariance, ProjectionMatrix, VarianceReport};
pub use standardize::{standardize, FeatureScaling, StandardizedMatrix};

#[cfg(feature = "lapack")]
pub use linalg_backends::LapackEigensolver;
#[cfg(feature = "backend_faer")]
pub use linalg_backends::FaerEigensolver;
