// src/standardize.rs

use crate::config::Scaling;
use crate::dataset::Dataset;
use crate::error::{InputError, InvalidArgument, Result};
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use serde::{Deserialize, Serialize};

/// Per-feature location and scale learned from a dataset.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    /// Sample mean of each column. Shape: (n_features)
    means: Array1<f64>,
    /// Sample standard deviation (n-1 denominator) of each column. Shape: (n_features)
    std_devs: Array1<f64>,
    scaling: Scaling,
}

impl FeatureScaling {
    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn std_devs(&self) -> &Array1<f64> {
        &self.std_devs
    }

    pub fn scaling(&self) -> Scaling {
        self.scaling
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Values each centered column is divided by: the standard deviations for
    /// [`Scaling::UnitVariance`], ones for [`Scaling::CenterOnly`].
    pub fn divisors(&self) -> Array1<f64> {
        match self.scaling {
            Scaling::UnitVariance => self.std_devs.clone(),
            Scaling::CenterOnly => Array1::ones(self.std_devs.len()),
        }
    }

    /// Centers and scales `raw` (m_samples × n_features) with these parameters.
    ///
    /// # Errors
    /// [`InvalidArgument::DimensionMismatch`] if the column count differs.
    pub fn apply(&self, raw: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if raw.ncols() != self.n_features() {
            return Err(InvalidArgument::DimensionMismatch {
                expected: self.n_features(),
                got: raw.ncols(),
            }
            .into());
        }
        let divisors = self.divisors();
        let mut scaled = raw.to_owned();
        Zip::from(scaled.columns_mut())
            .and(&self.means)
            .and(&divisors)
            .par_for_each(|mut column, &mean, &divisor| {
                column.mapv_inplace(|x| (x - mean) / divisor);
            });
        Ok(scaled)
    }

    /// Maps standardized values back to the original units.
    ///
    /// # Errors
    /// [`InvalidArgument::DimensionMismatch`] if the column count differs.
    pub fn invert(&self, standardized: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        if standardized.ncols() != self.n_features() {
            return Err(InvalidArgument::DimensionMismatch {
                expected: self.n_features(),
                got: standardized.ncols(),
            }
            .into());
        }
        let divisors = self.divisors();
        let mut raw = standardized.to_owned();
        Zip::from(raw.columns_mut())
            .and(&self.means)
            .and(&divisors)
            .for_each(|mut column, &mean, &divisor| {
                column.mapv_inplace(|z| z * divisor + mean);
            });
        Ok(raw)
    }
}

/// Dataset after centering (and, by default, scaling) every column.
///
/// With [`Scaling::UnitVariance`] each column has mean 0 and sample standard
/// deviation 1 up to floating-point tolerance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandardizedMatrix {
    /// Shape: (n_samples, n_features)
    data: Array2<f64>,
    feature_scaling: FeatureScaling,
}

impl StandardizedMatrix {
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn feature_scaling(&self) -> &FeatureScaling {
        &self.feature_scaling
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    /// Scales new raw rows with already-fitted parameters.
    ///
    /// The result is only unit-variance when `raw` has the same spread as the
    /// data `feature_scaling` was learned from.
    ///
    /// # Errors
    /// [`InvalidArgument::DimensionMismatch`] if the column count differs.
    pub fn from_scaling(feature_scaling: FeatureScaling, raw: ArrayView2<'_, f64>) -> Result<Self> {
        let data = feature_scaling.apply(raw)?;
        Ok(Self {
            data,
            feature_scaling,
        })
    }

    pub fn into_parts(self) -> (Array2<f64>, FeatureScaling) {
        (self.data, self.feature_scaling)
    }
}

/// Centers each column of `dataset` and, for [`Scaling::UnitVariance`],
/// divides it by its sample standard deviation.
///
/// The standard deviation is taken over exactly the centered values that end
/// up in the output, so every scaled column has a sample standard deviation
/// of 1 even when the column sits on a large offset. The mean itself is
/// refined with a second pass over the residuals.
///
/// All columns are checked before any of them is transformed, so a constant
/// column fails the whole call without producing partial output.
///
/// # Errors
/// [`InputError::ZeroVariance`] for the first column whose standard deviation
/// is at most `zero_variance_tolerance` times its largest absolute entry.
pub fn standardize(
    dataset: &Dataset,
    scaling: Scaling,
    zero_variance_tolerance: f64,
) -> Result<StandardizedMatrix> {
    let raw = dataset.data();
    let (n_samples, n_features) = raw.dim();
    info!(
        "Standardizing {} features over {} samples ({:?}).",
        n_features, n_samples, scaling
    );

    let mut means = raw
        .mean_axis(Axis(0))
        .ok_or(InputError::TooFewSamples { got: n_samples })?;
    let mut std_devs = Array1::<f64>::zeros(n_features);
    let mut magnitudes = Array1::<f64>::zeros(n_features);
    let n = n_samples as f64;
    Zip::from(raw.columns())
        .and(&mut means)
        .and(&mut std_devs)
        .and(&mut magnitudes)
        .par_for_each(|column, mean, std_dev, magnitude| {
            let first_pass = *mean;
            *mean = first_pass + column.iter().map(|&x| x - first_pass).sum::<f64>() / n;
            let sum_sq: f64 = column.iter().map(|&x| (x - *mean).powi(2)).sum();
            *std_dev = (sum_sq / (n - 1.0)).sqrt();
            *magnitude = column.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
        });

    for (column, (&std_dev, &magnitude)) in std_devs.iter().zip(magnitudes.iter()).enumerate() {
        // Exactly constant columns have std 0 and always fail, including all-zero ones.
        if std_dev <= zero_variance_tolerance * magnitude {
            return Err(InputError::ZeroVariance {
                column,
                name: dataset.feature_names()[column].clone(),
            }
            .into());
        }
    }

    let feature_scaling = FeatureScaling {
        means,
        std_devs,
        scaling,
    };
    let data = feature_scaling.apply(raw.view())?;
    debug!(
        "Column means: {:?}; standard deviations: {:?}",
        feature_scaling.means, feature_scaling.std_devs
    );

    Ok(StandardizedMatrix {
        data,
        feature_scaling,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PcaError;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample_dataset() -> Dataset {
        Dataset::new(array![
            [2.0, 10.0, -1.0],
            [4.0, 30.0, 0.5],
            [6.0, 20.0, 2.0],
            [8.0, 60.0, 1.0],
            [5.0, 15.0, -3.0]
        ])
        .unwrap()
    }

    #[test]
    fn columns_have_zero_mean_and_unit_std() {
        let standardized = standardize(&sample_dataset(), Scaling::UnitVariance, 1e-12).unwrap();
        let means = standardized.data().mean_axis(Axis(0)).unwrap();
        let stds = standardized.data().std_axis(Axis(0), 1.0);
        for j in 0..3 {
            assert_abs_diff_eq!(means[j], 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(stds[j], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn uses_unbiased_standard_deviation() {
        let dataset = Dataset::new(array![[1.0, 0.0], [3.0, 4.0]]).unwrap();
        let standardized = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
        // mean 2, sample std sqrt(2)
        assert_abs_diff_eq!(standardized.feature_scaling().std_devs()[0], 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(standardized.data()[[0, 0]], -1.0 / 2f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn center_only_keeps_original_spread() {
        let dataset = sample_dataset();
        let centered = standardize(&dataset, Scaling::CenterOnly, 1e-12).unwrap();
        let stds = centered.data().std_axis(Axis(0), 1.0);
        let raw_stds = dataset.data().std_axis(Axis(0), 1.0);
        for j in 0..3 {
            assert_abs_diff_eq!(stds[j], raw_stds[j], epsilon = 1e-12);
        }
    }

    #[test]
    fn constant_column_is_rejected() {
        let dataset = Dataset::new(array![[1.0, 0.3], [2.0, 0.3], [3.0, 0.3]])
            .unwrap()
            .with_feature_names(vec!["height", "batch"])
            .unwrap();
        let err = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap_err();
        assert_eq!(
            err,
            PcaError::Input(InputError::ZeroVariance {
                column: 1,
                name: "batch".to_string()
            })
        );
    }

    #[test]
    fn apply_and_invert_round_trip() {
        let dataset = sample_dataset();
        let standardized = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
        let restored = standardized
            .feature_scaling()
            .invert(standardized.view())
            .unwrap();
        for (a, b) in restored.iter().zip(dataset.data().iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }

        let err = standardized
            .feature_scaling()
            .apply(array![[1.0, 2.0]].view())
            .unwrap_err();
        assert_eq!(
            err,
            PcaError::InvalidArgument(InvalidArgument::DimensionMismatch { expected: 3, got: 2 })
        );
    }

    #[test]
    fn offset_columns_are_still_unit_variance() {
        for offset in [1e6, 1e8] {
            let data = Array2::from_shape_fn((150, 3), |(i, j)| match j {
                0 => i as f64,
                1 => ((i * 7) % 5) as f64,
                _ => offset + ((i * 13) % 11) as f64 * 1e-3,
            });
            let dataset = Dataset::new(data).unwrap();
            let standardized = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
            let z = standardized.data();
            let sum_sq = z.column(2).iter().map(|x| x * x).sum::<f64>() / 149.0;
            assert_abs_diff_eq!(sum_sq, 1.0, epsilon = 1e-12);
            assert_abs_diff_eq!(z.column(2).sum(), 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn tiny_scale_column_is_not_constant() {
        let data = Array2::from_shape_fn((20, 3), |(i, j)| match j {
            0 => i as f64,
            1 => ((i * 3) % 7) as f64,
            _ => (i as f64).sin() * 1e-13,
        });
        let dataset = Dataset::new(data).unwrap();
        let standardized = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
        let stds = standardized.data().std_axis(Axis(0), 1.0);
        assert_abs_diff_eq!(stds[2], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn all_zero_column_is_rejected() {
        let dataset = Dataset::new(array![[1.0, 0.0], [2.0, 0.0], [4.0, 0.0]]).unwrap();
        let err = standardize(&dataset, Scaling::CenterOnly, 1e-12).unwrap_err();
        assert!(matches!(err, PcaError::Input(InputError::ZeroVariance { column: 1, .. })));
    }

    #[test]
    fn from_scaling_reuses_fitted_parameters() {
        let dataset = sample_dataset();
        let fitted = standardize(&dataset, Scaling::UnitVariance, 1e-12).unwrap();
        let doubled = dataset.data() * 2.0;
        let rescaled =
            StandardizedMatrix::from_scaling(fitted.feature_scaling().clone(), doubled.view()).unwrap();
        assert_eq!(rescaled.feature_scaling(), fitted.feature_scaling());
        let stds = rescaled.data().std_axis(Axis(0), 1.0);
        for j in 0..3 {
            assert_abs_diff_eq!(stds[j], 2.0, epsilon = 1e-9);
        }
    }
}
