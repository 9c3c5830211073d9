// src/selection.rs

use crate::config::SignConvention;
use crate::eigen::EigenDecomposition;
use crate::error::{InvalidArgument, Result};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Decimal places kept for percentages in the [`VarianceReport`].
pub const PERCENT_DECIMALS: i32 = 2;

/// Variance statistics of one ranked principal component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentVariance {
    /// 1-based rank (1 = largest eigenvalue).
    pub component: usize,
    /// Position of the eigenpair in the solver's output.
    pub source_index: usize,
    pub eigenvalue: f64,
    /// `eigenvalue / sum(eigenvalues) * 100`, rounded to two decimals.
    pub percent: f64,
    /// Running sum of the rounded percentages.
    pub cumulative_percent: f64,
}

/// Components ordered by descending eigenvalue, with variance explained.
///
/// Percentages are rounded per component and then summed, so the final
/// cumulative value can differ from exactly 100.00 by up to 0.01 per
/// component. That drift is expected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    components: Vec<ComponentVariance>,
    total_variance: f64,
}

impl VarianceReport {
    pub fn components(&self) -> &[ComponentVariance] {
        &self.components
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ComponentVariance> {
        self.components.iter()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Sum of all eigenvalues.
    pub fn total_variance(&self) -> f64 {
        self.total_variance
    }

    /// Eigenvalues in ranked order.
    pub fn eigenvalues(&self) -> Array1<f64> {
        self.components.iter().map(|c| c.eigenvalue).collect()
    }

    /// Rounded percentages in ranked order.
    pub fn percentages(&self) -> Array1<f64> {
        self.components.iter().map(|c| c.percent).collect()
    }

    /// Cumulative percentage after the first `k` components (0 for `k == 0`).
    pub fn cumulative_percent(&self, k: usize) -> f64 {
        match k {
            0 => 0.0,
            k => self.components[k.min(self.components.len()) - 1].cumulative_percent,
        }
    }

    /// Smallest number of components whose cumulative percentage reaches
    /// `threshold_percent`, if any.
    pub fn components_for_cumulative(&self, threshold_percent: f64) -> Option<usize> {
        self.components
            .iter()
            .find(|c| c.cumulative_percent >= threshold_percent)
            .map(|c| c.component)
    }
}

/// p×k matrix whose columns are the selected eigenvectors (the loadings).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectionMatrix {
    /// Shape: (n_features, n_components)
    matrix: Array2<f64>,
}

impl ProjectionMatrix {
    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.matrix.view()
    }

    pub fn n_features(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.matrix.ncols()
    }

    /// Loading vector of the `j`-th ranked component (0-based).
    pub fn component(&self, j: usize) -> ArrayView1<'_, f64> {
        self.matrix.column(j)
    }
}

/// Checks that `n_components` lies in `1..=n_features`.
pub fn validate_component_count(n_components: usize, n_features: usize) -> Result<()> {
    if n_components < 1 || n_components > n_features {
        return Err(InvalidArgument::ComponentCount {
            requested: n_components,
            available: n_features,
        }
        .into());
    }
    Ok(())
}

/// Rounds `value` to `decimals` places, half away from zero.
pub fn round_to_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ranks the eigenpairs, builds the variance report and keeps the top
/// `n_components` eigenvectors as the projection matrix.
///
/// Ranking is by descending eigenvalue; equal eigenvalues keep solver order.
///
/// # Errors
/// [`InvalidArgument::ComponentCount`] if `n_components` is 0 or exceeds the
/// number of features; nothing is computed in that case.
pub fn rank_and_select(
    decomposition: &EigenDecomposition,
    n_components: usize,
    sign_convention: SignConvention,
) -> Result<(VarianceReport, ProjectionMatrix)> {
    let n_features = decomposition.len();
    validate_component_count(n_components, n_features)?;

    let pairs = decomposition.pairs();
    let mut order: Vec<usize> = (0..n_features).collect();
    order.sort_by(|&a, &b| {
        pairs[b]
            .eigenvalue
            .total_cmp(&pairs[a].eigenvalue)
            .then(pairs[a].index.cmp(&pairs[b].index))
    });

    let total_variance = decomposition.eigenvalue_sum();
    let mut cumulative = 0.0;
    let components: Vec<ComponentVariance> = order
        .iter()
        .enumerate()
        .map(|(rank, &i)| {
            let eigenvalue = pairs[i].eigenvalue;
            let share = if total_variance > 0.0 {
                eigenvalue / total_variance * 100.0
            } else {
                0.0
            };
            let percent = round_to_decimals(share, PERCENT_DECIMALS);
            // The running sum of two-decimal values is re-rounded only to drop binary noise.
            cumulative = round_to_decimals(cumulative + percent, PERCENT_DECIMALS);
            ComponentVariance {
                component: rank + 1,
                source_index: pairs[i].index,
                eigenvalue,
                percent,
                cumulative_percent: cumulative,
            }
        })
        .collect();

    let mut matrix = Array2::<f64>::zeros((n_features, n_components));
    for (mut column, &i) in matrix.columns_mut().into_iter().zip(order.iter()) {
        column.assign(&pairs[i].eigenvector);
        if sign_convention == SignConvention::LargestMagnitudePositive {
            let pivot = largest_magnitude_entry(column.view());
            if pivot < 0.0 {
                column.mapv_inplace(|x| -x);
            }
        }
    }

    info!(
        "Selected {} of {} components ({:.2}% of variance).",
        n_components,
        n_features,
        components[n_components - 1].cumulative_percent
    );
    for c in &components {
        debug!(
            "PC{}: eigenvalue={:.6}, percent={:.2}, cumulative={:.2}",
            c.component, c.eigenvalue, c.percent, c.cumulative_percent
        );
    }

    Ok((
        VarianceReport {
            components,
            total_variance,
        },
        ProjectionMatrix { matrix },
    ))
}

/// Entry with the largest absolute value (the first one on ties).
fn largest_magnitude_entry(vector: ArrayView1<'_, f64>) -> f64 {
    vector
        .iter()
        .fold(0.0_f64, |best, &x| if x.abs() > best.abs() { x } else { best })
}
