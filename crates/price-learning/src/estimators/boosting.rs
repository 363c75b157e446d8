//! Least-squares gradient boosting over `smartcore` regression trees.

use super::{
    Estimator, FeatureMatrix, TreeParams, check_prediction_input, check_training_input,
    inference_failed, training_failed,
};
use crate::error::{LearningError, Result};
use rand::prelude::*;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

type StageTree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Gradient boosting hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingParams {
    /// Number of boosting stages (default: 100).
    pub n_estimators: usize,
    /// Shrinkage applied to each stage (default: 0.1).
    pub learning_rate: f64,
    /// Fraction of rows drawn without replacement per stage (default: 1.0).
    pub subsample: f64,
    /// Growth limits of every stage tree (default depth: 3).
    pub tree: TreeParams,
    /// Seed for row subsampling.
    pub random_seed: u64,
}

impl Default for GradientBoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            subsample: 1.0,
            tree: TreeParams {
                max_depth: Some(3),
                ..TreeParams::default()
            },
            random_seed: 42,
        }
    }
}

/// Least-squares gradient boosting.
///
/// Starts from the training mean; each stage fits a tree to the current
/// residuals and adds its prediction scaled by the learning rate.
#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: GradientBoostingParams,
    n_features: usize,
    initial: f64,
    stages: Vec<StageTree>,
}

impl GradientBoosting {
    pub fn new(params: GradientBoostingParams) -> Self {
        Self {
            params,
            n_features: 0,
            initial: 0.0,
            stages: Vec::new(),
        }
    }

    pub fn params(&self) -> &GradientBoostingParams {
        &self.params
    }

    /// Number of fitted stages.
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }

    fn stage_settings(&self) -> Result<DecisionTreeRegressorParameters> {
        let tree = self.params.tree;
        let mut settings = DecisionTreeRegressorParameters::default()
            .with_min_samples_split(tree.min_samples_split)
            .with_min_samples_leaf(tree.min_samples_leaf);
        if let Some(depth) = tree.depth_limit()? {
            settings = settings.with_max_depth(depth);
        }
        Ok(settings)
    }
}

impl Estimator for GradientBoosting {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        check_training_input(x, y)?;
        let params = self.params;
        if params.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "gradient boosting needs at least one stage".to_string(),
            ));
        }
        if !(params.learning_rate > 0.0 && params.learning_rate <= 1.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be in (0.0, 1.0]".to_string(),
            ));
        }
        if !(params.subsample > 0.0 && params.subsample <= 1.0) {
            return Err(LearningError::InvalidConfig(
                "subsample must be in (0.0, 1.0]".to_string(),
            ));
        }

        let n_rows = x.n_rows();
        let initial = y.iter().sum::<f64>() / n_rows as f64;
        let mut current = vec![initial; n_rows];
        let mut residuals = vec![0.0; n_rows];
        let n_sample = ((n_rows as f64 * params.subsample).round() as usize).clamp(1, n_rows);

        let dense = x.to_dense();
        let mut rng = StdRng::seed_from_u64(params.random_seed);
        let mut stages = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            for i in 0..n_rows {
                residuals[i] = y[i] - current[i];
            }

            let settings = self.stage_settings()?;
            let tree = if n_sample < n_rows {
                let rows = index::sample(&mut rng, n_rows, n_sample).into_vec();
                let target: Vec<f64> = rows.iter().map(|&i| residuals[i]).collect();
                StageTree::fit(&x.select_rows(&rows).to_dense(), &target, settings)
            } else {
                StageTree::fit(&dense, &residuals, settings)
            }
            .map_err(training_failed)?;

            let step = tree.predict(&dense).map_err(training_failed)?;
            for (value, delta) in current.iter_mut().zip(&step) {
                *value += params.learning_rate * delta;
            }
            stages.push(tree);

            if (stage + 1) % 25 == 0 {
                let mse = y
                    .iter()
                    .zip(&current)
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n_rows as f64;
                debug!("Stage {}: training MSE {:.4}", stage + 1, mse);
            }
        }

        if current.iter().any(|v| !v.is_finite()) {
            return Err(LearningError::TrainingFailed(
                "gradient boosting diverged to non-finite predictions".to_string(),
            ));
        }

        self.n_features = x.n_cols();
        self.initial = initial;
        self.stages = stages;
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(LearningError::InferenceError(
                "gradient boosting model is not fitted".to_string(),
            ));
        }
        check_prediction_input(x, self.n_features)?;
        if x.n_rows() == 0 {
            return Ok(Vec::new());
        }

        let dense = x.to_dense();
        let mut predictions = vec![self.initial; x.n_rows()];
        for tree in &self.stages {
            let step = tree.predict(&dense).map_err(inference_failed)?;
            for (value, delta) in predictions.iter_mut().zip(&step) {
                *value += self.params.learning_rate * delta;
            }
        }
        Ok(predictions)
    }

    fn is_fitted(&self) -> bool {
        !self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic_data(n: usize) -> (FeatureMatrix, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / 10.0]).collect();
        let y: Vec<f64> = rows.iter().map(|r| 3.0 * r[0] * r[0] + 2.0).collect();
        let x = FeatureMatrix::from_rows(vec!["x".into()], &rows).unwrap();
        (x, y)
    }

    fn mse(a: &[f64], b: &[f64]) -> f64 {
        a.iter().zip(b).map(|(p, t)| (p - t).powi(2)).sum::<f64>() / a.len() as f64
    }

    #[test]
    fn test_boosting_beats_the_mean() {
        let (x, y) = quadratic_data(50);
        let mut model = GradientBoosting::new(GradientBoostingParams::default());
        model.fit(&x, &y).unwrap();

        let mean = y.iter().sum::<f64>() / y.len() as f64;
        let baseline = mse(&vec![mean; y.len()], &y);
        let fitted = mse(&model.predict(&x).unwrap(), &y);
        assert!(fitted < baseline * 0.05, "{} vs {}", fitted, baseline);
        assert_eq!(model.n_stages(), 100);
    }

    #[test]
    fn test_more_stages_fit_training_data_better() {
        let (x, y) = quadratic_data(40);
        let fit_with = |n_estimators| {
            let mut model = GradientBoosting::new(GradientBoostingParams {
                n_estimators,
                ..GradientBoostingParams::default()
            });
            model.fit(&x, &y).unwrap();
            mse(&model.predict(&x).unwrap(), &y)
        };
        assert!(fit_with(50) < fit_with(5));
    }

    #[test]
    fn test_subsample_is_reproducible() {
        let (x, y) = quadratic_data(30);
        let params = GradientBoostingParams {
            n_estimators: 10,
            subsample: 0.5,
            ..GradientBoostingParams::default()
        };
        let mut a = GradientBoosting::new(params);
        let mut b = GradientBoosting::new(params);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_serde_round_trip_predicts_identically() {
        let (x, y) = quadratic_data(30);
        let mut model = GradientBoosting::new(GradientBoostingParams {
            n_estimators: 15,
            ..GradientBoostingParams::default()
        });
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoosting = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.n_stages(), 15);
        assert_eq!(restored.predict(&x).unwrap(), model.predict(&x).unwrap());
    }

    #[test]
    fn test_rejects_invalid_learning_rate() {
        let (x, y) = quadratic_data(10);
        let mut model = GradientBoosting::new(GradientBoostingParams {
            learning_rate: 0.0,
            ..GradientBoostingParams::default()
        });
        assert!(matches!(
            model.fit(&x, &y),
            Err(LearningError::InvalidConfig(_))
        ));
        assert!(!model.is_fitted());
    }
}
