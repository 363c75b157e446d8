//! Random forest regression backed by `smartcore`.

use super::{
    Estimator, FeatureMatrix, TreeParams, check_prediction_input, check_training_input,
    inference_failed, training_failed,
};
use crate::error::{LearningError, Result};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Random forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomForestParams {
    /// Number of trees (default: 100).
    pub n_estimators: usize,
    /// Growth limits of every tree.
    pub tree: TreeParams,
    /// Seed for bootstrap sampling and per-split feature draws.
    pub random_seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            tree: TreeParams::default(),
            random_seed: 42,
        }
    }
}

/// Bootstrap-aggregated regression trees.
///
/// Each tree is grown on a bootstrap sample of the training rows; the
/// prediction is the mean of the tree predictions.
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    params: RandomForestParams,
    n_features: usize,
    model: Option<ForestModel>,
}

impl RandomForest {
    pub fn new(params: RandomForestParams) -> Self {
        Self {
            params,
            n_features: 0,
            model: None,
        }
    }

    pub fn params(&self) -> &RandomForestParams {
        &self.params
    }

    fn settings(&self, n_features: usize) -> Result<RandomForestRegressorParameters> {
        let tree = self.params.tree;
        let n_trees = self.params.n_estimators.try_into().map_err(|_| {
            LearningError::InvalidConfig(format!(
                "{} trees is more than the forest supports",
                self.params.n_estimators
            ))
        })?;
        let m = tree.max_features.unwrap_or(n_features).min(n_features);

        let mut settings = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees)
            .with_min_samples_split(tree.min_samples_split)
            .with_min_samples_leaf(tree.min_samples_leaf)
            .with_m(m)
            .with_seed(self.params.random_seed);
        if let Some(depth) = tree.depth_limit()? {
            settings = settings.with_max_depth(depth);
        }
        Ok(settings)
    }
}

impl Estimator for RandomForest {
    fn fit(&mut self, x: &FeatureMatrix, y: &[f64]) -> Result<()> {
        check_training_input(x, y)?;
        if self.params.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let settings = self.settings(x.n_cols())?;
        debug!(
            "Growing {} trees on {} rows x {} features",
            self.params.n_estimators,
            x.n_rows(),
            x.n_cols()
        );
        let model = ForestModel::fit(&x.to_dense(), &y.to_vec(), settings)
            .map_err(training_failed)?;

        self.n_features = x.n_cols();
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let Some(model) = &self.model else {
            return Err(LearningError::InferenceError(
                "random forest is not fitted".to_string(),
            ));
        };
        check_prediction_input(x, self.n_features)?;
        if x.n_rows() == 0 {
            return Ok(Vec::new());
        }
        model.predict(&x.to_dense()).map_err(inference_failed)
    }

    fn is_fitted(&self) -> bool {
        self.model.is_some()
    }
}
