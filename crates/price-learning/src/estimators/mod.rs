//! Regression estimators.
//!
//! Every estimator implements [`Estimator`]: `fit` on a dense
//! [`FeatureMatrix`] and a target vector, then `predict` on matrices with the
//! same columns. The trees themselves come from `smartcore`:
//!
//! - [`RandomForest`]: `smartcore`'s random forest regressor
//! - [`GradientBoosting`]: least-squares boosting of `smartcore` regression
//!   trees
//!
//! Both take an explicit seed, so a fit is reproducible.

mod boosting;
mod forest;

pub use boosting::{GradientBoosting, GradientBoostingParams};
pub use forest::{RandomForest, RandomForestParams};

use crate::error::{LearningError, Result};
use polars::prelude::*;
use price_processing::utils::is_numeric_like;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;

/// Growth limits of a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; `None` grows until leaves are pure or too small.
    pub max_depth: Option<usize>,
    /// Minimum rows a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum rows on each side of a split.
    pub min_samples_leaf: usize,
    /// Features drawn at random for each split (random forest only);
    /// `None` considers all.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

impl TreeParams {
    /// Depth limit in the width `smartcore` expects.
    pub(crate) fn depth_limit(&self) -> Result<Option<u16>> {
        self.max_depth
            .map(|depth| {
                u16::try_from(depth).map_err(|_| {
                    LearningError::InvalidConfig(format!("max_depth {} is too large", depth))
                })
            })
            .transpose()
    }
}

/// A supervised regression model.
pub trait Estimator {
    /// Fit the model to a feature matrix and its targets.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if the row counts differ or the
    /// matrix is empty, and [`LearningError::TrainingFailed`] if the model
    /// cannot be fitted.
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()>;

    /// Predict one value per row.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InferenceError`] if the model is not fitted or
    /// the matrix has a different number of columns than the training matrix.
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Whether `fit` has completed successfully.
    fn is_fitted(&self) -> bool;
}

/// Dense row-major `f64` matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    values: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Build a matrix from rows.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if a row has the wrong length
    /// or a value is not finite.
    pub fn from_rows(feature_names: Vec<String>, rows: &[Vec<f64>]) -> Result<Self> {
        let n_cols = feature_names.len();
        let mut values = Vec::with_capacity(rows.len() * n_cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_cols {
                return Err(LearningError::InvalidData(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            values.extend_from_slice(row);
        }
        if let Some(bad) = values.iter().position(|v| !v.is_finite()) {
            return Err(LearningError::InvalidData(format!(
                "non-finite value at row {}",
                bad / n_cols.max(1)
            )));
        }
        Ok(Self {
            feature_names,
            values,
            n_rows: rows.len(),
        })
    }

    /// Convert a fully numeric, gap-free DataFrame.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidData`] if a column is not numeric or
    /// holds a missing or non-finite value.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let n_rows = df.height();
        let n_cols = df.width();
        let mut feature_names = Vec::with_capacity(n_cols);
        let mut values = vec![0.0; n_rows * n_cols];

        for (j, col) in df.get_columns().iter().enumerate() {
            let name = col.name().to_string();
            if !is_numeric_like(col.dtype()) {
                return Err(LearningError::InvalidData(format!(
                    "feature '{}' is {}, not numeric",
                    name,
                    col.dtype()
                )));
            }
            if col.null_count() > 0 {
                return Err(LearningError::InvalidData(format!(
                    "feature '{}' has {} missing values",
                    name,
                    col.null_count()
                )));
            }

            let cast = col.as_materialized_series().cast(&DataType::Float64)?;
            for (i, value) in cast.f64()?.into_iter().enumerate() {
                let value = value.unwrap_or(f64::NAN);
                if !value.is_finite() {
                    return Err(LearningError::InvalidData(format!(
                        "feature '{}' has a non-finite value at row {}",
                        name, i
                    )));
                }
                values[i * n_cols + j] = value;
            }
            feature_names.push(name);
        }

        Ok(Self {
            feature_names,
            values,
            n_rows,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.feature_names.len()
    }

    /// Value at (`row`, `col`).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols() + col]
    }

    /// All values of one row.
    pub fn row(&self, row: usize) -> &[f64] {
        let n_cols = self.n_cols();
        &self.values[row * n_cols..(row + 1) * n_cols]
    }

    /// A new matrix holding the given rows, in that order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        let mut values = Vec::with_capacity(rows.len() * self.n_cols());
        for &row in rows {
            values.extend_from_slice(self.row(row));
        }
        Self {
            feature_names: self.feature_names.clone(),
            values,
            n_rows: rows.len(),
        }
    }

    pub(crate) fn to_dense(&self) -> DenseMatrix<f64> {
        DenseMatrix::new(self.n_rows, self.n_cols(), self.values.clone(), false)
    }
}

/// Map a `smartcore` failure during fitting.
pub(crate) fn training_failed(err: smartcore::error::Failed) -> LearningError {
    LearningError::TrainingFailed(err.to_string())
}

/// Map a `smartcore` failure during prediction.
pub(crate) fn inference_failed(err: smartcore::error::Failed) -> LearningError {
    LearningError::InferenceError(err.to_string())
}

/// Check the shape of a training call.
pub(crate) fn check_training_input(x: &FeatureMatrix, y: &[f64]) -> Result<()> {
    if x.n_rows() == 0 {
        return Err(LearningError::InvalidData(
            "cannot fit on an empty feature matrix".to_string(),
        ));
    }
    if x.n_cols() == 0 {
        return Err(LearningError::InvalidData(
            "cannot fit without feature columns".to_string(),
        ));
    }
    if x.n_rows() != y.len() {
        return Err(LearningError::InvalidData(format!(
            "feature rows ({}) and target rows ({}) differ",
            x.n_rows(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(LearningError::InvalidData(
            "target contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Check that a prediction matrix has the width the model was fitted on.
pub(crate) fn check_prediction_input(x: &FeatureMatrix, n_features: usize) -> Result<()> {
    if x.n_cols() != n_features {
        return Err(LearningError::InferenceError(format!(
            "model expects {} features, got {}",
            n_features,
            x.n_cols()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_dataframe_row_major() {
        let df = df![
            "area" => [100.0, 80.0],
            "rooms" => [3i64, 2],
            "garden" => [true, false],
        ]
        .unwrap();

        let x = FeatureMatrix::from_dataframe(&df).unwrap();
        assert_eq!(x.n_rows(), 2);
        assert_eq!(x.n_cols(), 3);
        assert_eq!(x.row(0), &[100.0, 3.0, 1.0]);
        assert_eq!(x.get(1, 1), 2.0);
        assert_eq!(x.feature_names(), &["area", "rooms", "garden"]);
    }

    #[test]
    fn test_from_dataframe_rejects_missing_values() {
        let df = df!["area" => [Some(100.0), None]].unwrap();
        let err = FeatureMatrix::from_dataframe(&df).unwrap_err();
        assert!(matches!(err, LearningError::InvalidData(_)));
        assert!(err.to_string().contains("area"));
    }

    #[test]
    fn test_from_dataframe_rejects_text() {
        let df = df!["city" => ["Gent", "Leuven"]].unwrap();
        assert!(FeatureMatrix::from_dataframe(&df).is_err());
    }

    #[test]
    fn test_from_rows_checks_width() {
        let names = vec!["a".to_string(), "b".to_string()];
        assert!(FeatureMatrix::from_rows(names.clone(), &[vec![1.0, 2.0]]).is_ok());
        assert!(FeatureMatrix::from_rows(names, &[vec![1.0]]).is_err());
    }

    #[test]
    fn test_select_rows_keeps_order() {
        let x = FeatureMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            &[vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]],
        )
        .unwrap();

        let picked = x.select_rows(&[2, 0, 2]);
        assert_eq!(picked.n_rows(), 3);
        assert_eq!(picked.row(0), &[5.0, 6.0]);
        assert_eq!(picked.row(1), &[1.0, 2.0]);
        assert_eq!(picked.feature_names(), x.feature_names());
    }

    #[test]
    fn test_depth_limit_range() {
        let params = TreeParams {
            max_depth: Some(3),
            ..TreeParams::default()
        };
        assert_eq!(params.depth_limit().unwrap(), Some(3));
        assert_eq!(TreeParams::default().depth_limit().unwrap(), None);

        let deep = TreeParams {
            max_depth: Some(1 << 20),
            ..TreeParams::default()
        };
        assert!(matches!(
            deep.depth_limit(),
            Err(LearningError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_training_input_checks() {
        let x = FeatureMatrix::from_rows(vec!["a".to_string()], &[vec![1.0], vec![2.0]]).unwrap();
        assert!(check_training_input(&x, &[1.0, 2.0]).is_ok());
        assert!(check_training_input(&x, &[1.0]).is_err());
        assert!(check_training_input(&x, &[1.0, f64::NAN]).is_err());
    }
}
