// src/projection.rs

use crate::error::{InputError, InvalidArgument, PcaError, Result};
use crate::selection::ProjectionMatrix;
use crate::standardize::StandardizedMatrix;
use log::info;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Component scores of every sample, with the optional per-row labels carried
/// through unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectedFields")]
pub struct ProjectedDataset {
    /// Shape: (n_samples, n_components)
    scores: Array2<f64>,
    labels: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ProjectedFields {
    scores: Array2<f64>,
    labels: Option<Vec<String>>,
}

impl TryFrom<ProjectedFields> for ProjectedDataset {
    type Error = PcaError;

    fn try_from(fields: ProjectedFields) -> Result<Self> {
        if let Some(labels) = &fields.labels {
            if labels.len() != fields.scores.nrows() {
                return Err(InputError::LabelCount {
                    expected: fields.scores.nrows(),
                    got: labels.len(),
                }
                .into());
            }
        }
        Ok(Self {
            scores: fields.scores,
            labels: fields.labels,
        })
    }
}

impl ProjectedDataset {
    pub fn scores(&self) -> &Array2<f64> {
        &self.scores
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    pub fn n_samples(&self) -> usize {
        self.scores.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.scores.ncols()
    }

    /// Sample variance (n - 1 denominator) of each score column. For a
    /// correlation-based fit these equal the selected eigenvalues.
    pub fn column_variances(&self) -> Array1<f64> {
        self.scores.var_axis(Axis(0), 1.0)
    }

    /// Iterates `(label, scores)` per sample; the label is `None` for
    /// unlabeled data.
    pub fn labeled_rows(&self) -> impl Iterator<Item = (Option<&str>, ArrayView1<'_, f64>)> + '_ {
        self.scores
            .axis_iter(Axis(0))
            .enumerate()
            .map(move |(i, row)| {
                let label = self
                    .labels
                    .as_ref()
                    .and_then(|labels| labels.get(i))
                    .map(String::as_str);
                (label, row)
            })
    }

    pub fn into_parts(self) -> (Array2<f64>, Option<Vec<String>>) {
        (self.scores, self.labels)
    }
}

/// Multiplies the standardized matrix by the projection matrix: `scores = Z P`.
///
/// # Errors
/// [`InvalidArgument::DimensionMismatch`] if `Z` and `P` disagree on the
/// feature count; [`InputError::LabelCount`] if `labels` does not have one
/// entry per sample.
pub fn project(
    standardized: &StandardizedMatrix,
    projection: &ProjectionMatrix,
    labels: Option<Vec<String>>,
) -> Result<ProjectedDataset> {
    let n_samples = standardized.n_samples();
    if let Some(labels) = &labels {
        if labels.len() != n_samples {
            return Err(InputError::LabelCount {
                expected: n_samples,
                got: labels.len(),
            }
            .into());
        }
    }
    let scores = multiply(standardized.view(), projection.view())?;
    info!(
        "Projected {} samples onto {} components.",
        n_samples,
        scores.ncols()
    );
    Ok(ProjectedDataset { scores, labels })
}

/// Maps scores back to the standardized feature space: `Z_hat = scores P^T`.
///
/// With every component kept this recovers `Z` up to round-off.
///
/// # Errors
/// [`InvalidArgument::DimensionMismatch`] if `scores` does not have one
/// column per selected component.
pub fn inverse_project(
    scores: ArrayView2<'_, f64>,
    projection: &ProjectionMatrix,
) -> Result<Array2<f64>> {
    multiply(scores, projection.view().reversed_axes())
}

fn multiply(lhs: ArrayView2<'_, f64>, rhs: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    if lhs.ncols() != rhs.nrows() {
        return Err(InvalidArgument::DimensionMismatch {
            expected: rhs.nrows(),
            got: lhs.ncols(),
        }
        .into());
    }
    Ok(lhs.dot(&rhs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EigenChecks, Scaling, SignConvention};
    use crate::correlation::correlate;
    use crate::dataset::Dataset;
    use crate::eigen::EigenDecomposition;
    use crate::linalg_backends::JacobiEigensolver;
    use crate::selection::rank_and_select;
    use crate::standardize::standardize;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn fitted(k: usize) -> (StandardizedMatrix, ProjectionMatrix, Array1<f64>) {
        let dataset = Dataset::new(array![
            [2.5, 2.4, 0.5],
            [0.5, 0.7, 1.9],
            [2.2, 2.9, 0.8],
            [1.9, 2.2, 1.1],
            [3.1, 3.0, 0.2],
            [2.3, 2.7, 1.0],
            [2.0, 1.6, 1.4],
            [1.0, 1.1, 2.0]
        ])
        .unwrap();
        let z = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
        let m = correlate(&z, 1e-9).unwrap();
        let eigen = EigenDecomposition::compute(&JacobiEigensolver::default(), &m, &EigenChecks::default()).unwrap();
        let (report, p) = rank_and_select(&eigen, k, SignConvention::default()).unwrap();
        (z, p, report.eigenvalues())
    }

    #[test]
    fn score_variances_match_eigenvalues() {
        let (z, p, eigenvalues) = fitted(3);
        let projected = project(&z, &p, None).unwrap();
        assert_eq!(projected.n_samples(), 8);
        assert_eq!(projected.n_components(), 3);
        let variances = projected.column_variances();
        for j in 0..3 {
            assert_abs_diff_eq!(variances[j], eigenvalues[j], epsilon = 1e-9);
        }
    }

    #[test]
    fn full_rank_inverse_recovers_standardized_data() {
        let (z, p, _) = fitted(3);
        let projected = project(&z, &p, None).unwrap();
        let back = inverse_project(projected.scores().view(), &p).unwrap();
        for (a, b) in back.iter().zip(z.data().iter()) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn labels_stay_aligned_with_rows() {
        let (z, p, _) = fitted(2);
        let labels: Vec<String> = (0..8).map(|i| format!("s{}", i)).collect();
        let projected = project(&z, &p, Some(labels.clone())).unwrap();
        assert_eq!(projected.labels(), Some(labels.as_slice()));
        let expected = z.data().dot(p.matrix());
        for (i, (label, row)) in projected.labeled_rows().enumerate() {
            assert_eq!(label, Some(labels[i].as_str()));
            for (a, b) in row.iter().zip(expected.row(i).iter()) {
                assert_abs_diff_eq!(a, b, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn label_count_must_match_samples() {
        let (z, p, _) = fitted(2);
        let err = project(&z, &p, Some(vec!["only".to_string()])).unwrap_err();
        assert_eq!(
            err,
            PcaError::Input(InputError::LabelCount {
                expected: 8,
                got: 1
            })
        );
    }

    #[test]
    fn inverse_rejects_wrong_score_width() {
        let (_, p, _) = fitted(2);
        let err = inverse_project(Array2::<f64>::zeros((4, 3)).view(), &p).unwrap_err();
        assert_eq!(
            err,
            PcaError::InvalidArgument(InvalidArgument::DimensionMismatch {
                expected: 2,
                got: 3
            })
        );
    }

    #[test]
    fn deserialized_labels_must_match_score_rows() {
        let (z, p, _) = fitted(2);
        let labels: Vec<String> = (0..8).map(|i| format!("s{}", i)).collect();
        let projected = project(&z, &p, Some(labels)).unwrap();
        let json = serde_json::to_string(&projected).unwrap();
        let parsed: ProjectedDataset = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.labels(), projected.labels());
        for (a, b) in parsed.scores().iter().zip(projected.scores().iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
        }

        let mismatched = r#"{"scores":{"v":1,"dim":[2,1],"data":[0.5,-0.5]},"labels":["a"]}"#;
        let err = serde_json::from_str::<ProjectedDataset>(mismatched).unwrap_err();
        assert!(err.to_string().contains("1 labels supplied for 2 rows"));

        let unlabeled = r#"{"scores":{"v":1,"dim":[2,1],"data":[0.5,-0.5]},"labels":null}"#;
        let parsed: ProjectedDataset = serde_json::from_str(unlabeled).unwrap();
        assert!(parsed.labeled_rows().all(|(label, _)| label.is_none()));
    }
}
