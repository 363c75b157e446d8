//! Result types returned by the training driver.
//!
//! - [`Metrics`]: holdout regression metrics
//! - [`TrainingReport`]: summary of a completed training run
//!
//! # Example
//!
//! ```ignore
//! let report = TrainingDriver::new(config).run(&df)?;
//!
//! println!("Model: {}", report.model_name);
//! println!("Holdout R²: {:.3}", report.metrics.r2);
//! ```

use crate::config::Algorithm;
use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Regression metrics computed on the holdout set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean Squared Error. Lower is better.
    pub mse: f64,

    /// Root Mean Squared Error, in the same units as the target.
    pub rmse: f64,

    /// Mean Absolute Error. Lower is better.
    pub mae: f64,

    /// R-squared (coefficient of determination).
    ///
    /// 1.0 is a perfect fit; 0.0 matches predicting the mean; negative values
    /// are worse than the mean. A constant holdout target scores 1.0 when
    /// every prediction is exact and 0.0 otherwise.
    pub r2: f64,

    /// Number of holdout rows the metrics were computed on.
    pub n_samples: usize,
}

impl Metrics {
    /// Compute metrics for predictions against the true targets.
    ///
    /// # Errors
    ///
    /// - [`LearningError::EmptyHoldout`] if there are no rows
    /// - [`LearningError::InvalidData`] if the slices differ in length
    /// - [`LearningError::TrainingFailed`] if a value or a metric is not finite
    pub fn compute(y_true: &[f64], y_pred: &[f64]) -> Result<Self> {
        if y_true.is_empty() {
            return Err(LearningError::EmptyHoldout);
        }
        if y_true.len() != y_pred.len() {
            return Err(LearningError::InvalidData(format!(
                "{} targets but {} predictions",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.iter().chain(y_pred).any(|v| !v.is_finite()) {
            return Err(LearningError::TrainingFailed(
                "holdout targets or predictions contain non-finite values".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let mean = y_true.iter().sum::<f64>() / n;

        let mut sse = 0.0;
        let mut sae = 0.0;
        let mut sst = 0.0;
        for (t, p) in y_true.iter().zip(y_pred) {
            sse += (t - p).powi(2);
            sae += (t - p).abs();
            sst += (t - mean).powi(2);
        }

        let mse = sse / n;
        let r2 = if sst > 0.0 {
            1.0 - sse / sst
        } else if sse == 0.0 {
            1.0
        } else {
            0.0
        };

        let metrics = Self {
            mse,
            rmse: mse.sqrt(),
            mae: sae / n,
            r2,
            n_samples: y_true.len(),
        };

        if [metrics.mse, metrics.rmse, metrics.mae, metrics.r2]
            .iter()
            .any(|v| !v.is_finite())
        {
            return Err(LearningError::TrainingFailed(
                "holdout metrics are not finite".to_string(),
            ));
        }
        Ok(metrics)
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MSE={:.4} RMSE={:.4} MAE={:.4} R²={:.4} (n={})",
            self.mse, self.rmse, self.mae, self.r2, self.n_samples
        )
    }
}

/// Summary of a training run whose artifacts were persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct TrainingReport {
    /// Algorithm that was trained.
    pub algorithm: Algorithm,

    /// Artifact key of the trained model (e.g. `"random_forest_model"`).
    pub model_name: String,

    /// Feature columns the model was trained on, in order.
    pub features: Vec<String>,

    /// Rows in the training split.
    pub n_train: usize,

    /// Rows in the holdout split.
    pub n_test: usize,

    /// Holdout metrics.
    pub metrics: Metrics,

    /// Training wall-clock time in seconds, preprocessing included.
    pub training_time_seconds: f64,

    /// Files written by the run.
    pub artifacts: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_known_values() {
        let m = Metrics::compute(&[1.0, 2.0, 3.0, 4.0], &[1.0, 2.0, 3.0, 6.0]).unwrap();
        assert_eq!(m.mse, 1.0);
        assert_eq!(m.rmse, 1.0);
        assert_eq!(m.mae, 0.5);
        // sst = 5.0, sse = 4.0
        assert!((m.r2 - 0.2).abs() < 1e-12);
        assert_eq!(m.n_samples, 4);
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [10.0, 20.0, 30.0];
        let m = Metrics::compute(&y, &y).unwrap();
        assert_eq!(m.mse, 0.0);
        assert_eq!(m.r2, 1.0);
    }

    #[test]
    fn test_constant_target_r2() {
        assert_eq!(Metrics::compute(&[5.0, 5.0], &[5.0, 5.0]).unwrap().r2, 1.0);
        assert_eq!(Metrics::compute(&[5.0, 5.0], &[4.0, 6.0]).unwrap().r2, 0.0);
    }

    #[test]
    fn test_empty_holdout() {
        assert!(matches!(
            Metrics::compute(&[], &[]),
            Err(LearningError::EmptyHoldout)
        ));
    }

    #[test]
    fn test_non_finite_prediction() {
        assert!(matches!(
            Metrics::compute(&[1.0, 2.0], &[1.0, f64::INFINITY]),
            Err(LearningError::TrainingFailed(_))
        ));
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            Metrics::compute(&[1.0, 2.0], &[1.0]),
            Err(LearningError::InvalidData(_))
        ));
    }
}
