// src/dataset.rs

use crate::error::{InputError, PcaError, Result};
use log::debug;
use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

/// Cell tokens read as "no value" by [`Dataset::from_records`] (compared case-insensitively).
const MISSING_TOKENS: [&str; 5] = ["", "na", "n/a", "nan", "null"];

/// A validated n×p table of finite observations.
///
/// Rows are samples, columns are numeric features. An optional label column
/// travels alongside the rows untouched; it never enters the computation and
/// is handed back with the projected coordinates in the same row order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetFields")]
pub struct Dataset {
    data: Array2<f64>,
    feature_names: Vec<String>,
    labels: Option<Vec<String>>,
}

/// Serialized form of [`Dataset`]; deserialization goes through the
/// validating constructors.
#[derive(Deserialize)]
struct DatasetFields {
    data: Array2<f64>,
    feature_names: Vec<String>,
    labels: Option<Vec<String>>,
}

impl TryFrom<DatasetFields> for Dataset {
    type Error = PcaError;

    fn try_from(fields: DatasetFields) -> Result<Self> {
        let dataset = Dataset::new(fields.data)?.with_feature_names(fields.feature_names)?;
        match fields.labels {
            Some(labels) => dataset.with_labels(labels),
            None => Ok(dataset),
        }
    }
}

impl Dataset {
    /// Wraps a numeric matrix, shape (n_samples, n_features).
    ///
    /// Features are named `x0`, `x1`, ... until [`Dataset::with_feature_names`]
    /// replaces them.
    ///
    /// # Errors
    /// Returns [`InputError`] if there are fewer than 2 features or samples,
    /// or if any entry is NaN or infinite.
    ///
    /// # Examples
    ///
    /// ```
    /// use correlation_pca::Dataset;
    /// use ndarray::array;
    ///
    /// let dataset = Dataset::new(array![[1.0, 2.0], [2.0, 3.5], [3.0, 7.0]]).unwrap();
    /// assert_eq!(dataset.n_features(), 2);
    /// ```
    pub fn new(data: Array2<f64>) -> Result<Self> {
        let (n_samples, n_features) = data.dim();
        if n_features < 2 {
            return Err(InputError::TooFewFeatures { got: n_features }.into());
        }
        if n_samples < 2 {
            return Err(InputError::TooFewSamples { got: n_samples }.into());
        }
        if let Some(((row, column), &value)) =
            data.indexed_iter().find(|(_, value)| !value.is_finite())
        {
            return Err(InputError::NonFiniteValue { row, column, value }.into());
        }

        let feature_names = (0..n_features).map(|j| format!("x{}", j)).collect();
        Ok(Self {
            data,
            feature_names,
            labels: None,
        })
    }

    /// Replaces the feature names. One name per column is required.
    pub fn with_feature_names<I, S>(mut self, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() != self.n_features() {
            return Err(InputError::FeatureNameCount {
                expected: self.n_features(),
                got: names.len(),
            }
            .into());
        }
        self.feature_names = names;
        Ok(self)
    }

    /// Attaches one opaque label per row.
    pub fn with_labels<I, S>(mut self, labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.n_samples() {
            return Err(InputError::LabelCount {
                expected: self.n_samples(),
                got: labels.len(),
            }
            .into());
        }
        self.labels = Some(labels);
        Ok(self)
    }

    /// Builds a dataset from a text table.
    ///
    /// Every column except `label_column` must hold numbers. Empty cells and
    /// `NA`/`N/A`/`NaN`/`null` are missing values, which are rejected: this
    /// crate does not impute.
    ///
    /// # Errors
    /// [`InputError::UnknownLabelColumn`], [`InputError::RaggedRecord`],
    /// [`InputError::MissingValue`], [`InputError::NonNumeric`], plus anything
    /// [`Dataset::new`] rejects.
    ///
    /// # Examples
    ///
    /// ```
    /// use correlation_pca::Dataset;
    ///
    /// let records = vec![
    ///     vec!["5.1", "3.5", "setosa"],
    ///     vec!["7.0", "3.2", "versicolor"],
    ///     vec!["6.3", "3.3", "virginica"],
    /// ];
    /// let dataset = Dataset::from_records(&["length", "width", "species"], &records, Some("species")).unwrap();
    /// assert_eq!(dataset.feature_names(), &["length", "width"]);
    /// assert_eq!(dataset.labels().unwrap()[2], "virginica");
    /// ```
    pub fn from_records<H, S>(
        header: &[H],
        records: &[Vec<S>],
        label_column: Option<&str>,
    ) -> Result<Self>
    where
        H: AsRef<str>,
        S: AsRef<str>,
    {
        let label_index = match label_column {
            Some(name) => Some(
                header
                    .iter()
                    .position(|h| h.as_ref() == name)
                    .ok_or_else(|| InputError::UnknownLabelColumn(name.to_string()))?,
            ),
            None => None,
        };

        let feature_columns: Vec<usize> = (0..header.len())
            .filter(|&j| Some(j) != label_index)
            .collect();
        let n_samples = records.len();
        let n_features = feature_columns.len();

        let mut data = Array2::<f64>::zeros((n_samples, n_features));
        let mut labels = label_index.map(|_| Vec::with_capacity(n_samples));

        for (row, record) in records.iter().enumerate() {
            if record.len() != header.len() {
                return Err(InputError::RaggedRecord {
                    row,
                    expected: header.len(),
                    got: record.len(),
                }
                .into());
            }
            for (out_col, &in_col) in feature_columns.iter().enumerate() {
                data[[row, out_col]] = parse_cell(record[in_col].as_ref(), row, header[in_col].as_ref())?;
            }
            if let (Some(idx), Some(labels)) = (label_index, labels.as_mut()) {
                labels.push(record[idx].as_ref().to_string());
            }
        }

        debug!(
            "Parsed {} records into a {}x{} numeric table{}.",
            n_samples,
            n_samples,
            n_features,
            if label_index.is_some() { " with labels" } else { "" }
        );

        let names: Vec<String> = feature_columns
            .iter()
            .map(|&j| header[j].as_ref().to_string())
            .collect();
        let dataset = Dataset::new(data)?.with_feature_names(names)?;
        match labels {
            Some(labels) => dataset.with_labels(labels),
            None => Ok(dataset),
        }
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.data.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }
}

fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64> {
    let trimmed = cell.trim();
    if MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
    {
        return Err(InputError::MissingValue {
            row,
            column: column.to_string(),
        }
        .into());
    }
    trimmed.parse::<f64>().map_err(|_| {
        InputError::NonNumeric {
            row,
            column: column.to_string(),
            value: trimmed.to_string(),
        }
        .into()
    })
}
