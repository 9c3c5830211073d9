// src/error.rs

//! Error taxonomy for the PCA pipeline.
//!
//! Every stage returns [`PcaError`]. The three families mirror where a run can
//! fail: bad input data, a numerical self-check that did not hold, or a caller
//! argument outside its valid range.

/// Problems with the supplied data, detected before any computation proceeds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("dataset needs at least 2 features, got {got}")]
    TooFewFeatures { got: usize },

    #[error("dataset needs at least 2 samples, got {got}")]
    TooFewSamples { got: usize },

    #[error("non-finite value {value} at row {row}, column {column}")]
    NonFiniteValue { row: usize, column: usize, value: f64 },

    #[error("missing value at row {row}, column '{column}'")]
    MissingValue { row: usize, column: String },

    #[error("non-numeric value '{value}' at row {row}, column '{column}'")]
    NonNumeric {
        row: usize,
        column: String,
        value: String,
    },

    #[error("column {column} ('{name}') has zero variance and cannot be standardized")]
    ZeroVariance { column: usize, name: String },

    #[error("record {row} has {got} cells, header has {expected}")]
    RaggedRecord {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("{got} feature names supplied for {expected} columns")]
    FeatureNameCount { expected: usize, got: usize },

    #[error("{got} labels supplied for {expected} rows")]
    LabelCount { expected: usize, got: usize },

    #[error("label column '{0}' is not in the header")]
    UnknownLabelColumn(String),
}

/// A numerical routine failed or one of its post-hoc checks did not hold.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NumericalError {
    #[error("matrix is not symmetric (max deviation {max_deviation:.3e} exceeds tolerance {tolerance:.3e})")]
    NotSymmetric { max_deviation: f64, tolerance: f64 },

    #[error("correlation diagonal entry {index} is {value}, expected 1")]
    DiagonalNotUnit { index: usize, value: f64 },

    #[error("eigensolver did not converge after {sweeps} sweeps (off-diagonal norm {off_diagonal:.3e})")]
    NotConverged { sweeps: usize, off_diagonal: f64 },

    #[error("eigenvalue {index} is {value:.3e}; matrix is not positive semi-definite")]
    NotPositiveSemiDefinite { index: usize, value: f64 },

    #[error("eigenvalue sum {eigenvalue_sum} does not match matrix trace {trace}")]
    TraceMismatch { trace: f64, eigenvalue_sum: f64 },

    #[error("eigenvectors are not orthonormal (||I - V^T V||_F = {error:.3e})")]
    NotOrthonormal { error: f64 },

    #[error("linear algebra backend failed: {0}")]
    Backend(String),
}

/// A caller-supplied argument is outside its valid range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidArgument {
    #[error("requested {requested} components, valid range is 1..={available}")]
    ComponentCount { requested: usize, available: usize },

    #[error("expected {expected} features, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Error returned by every fallible operation in this crate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PcaError {
    #[error("input error: {0}")]
    Input(#[from] InputError),

    #[error("numerical error: {0}")]
    Numerical(#[from] NumericalError),

    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] InvalidArgument),
}

pub type Result<T> = std::result::Result<T, PcaError>;
