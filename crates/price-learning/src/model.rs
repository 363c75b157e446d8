//! Trained model artifact.
//!
//! [`TrainedModel`] bundles a fitted estimator with everything needed to use
//! it safely later: the feature columns it was trained on (names and order),
//! the target column, the preprocessing run it was trained after, the
//! algorithm and the holdout metrics. It is persisted
//! through the same [`ArtifactStore`](price_processing::ArtifactStore) as the
//! preprocessing artifacts, under [`Algorithm::model_name`].
//!
//! # Example
//!
//! ```rust,ignore
//! use price_learning::TrainedModel;
//! use price_processing::{ArtifactStore, FsArtifactStore};
//!
//! let store = FsArtifactStore::new("saved_models");
//! let model: TrainedModel = store.load("random_forest_model")?;
//!
//! // `features` must already be preprocessed and aligned
//! let predictions = model.predict(&features)?;
//! ```

use crate::config::Algorithm;
use crate::error::{LearningError, Result};
use crate::estimators::{Estimator, FeatureMatrix, GradientBoosting, RandomForest};
use crate::types::Metrics;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use price_processing::{ARTIFACT_SCHEMA_VERSION, Artifact};
use serde::{Deserialize, Serialize};
use static_assertions::assert_impl_all;

/// Fitted estimator state, tagged by algorithm.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "state", rename_all = "snake_case")]
pub enum FittedEstimator {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl FittedEstimator {
    /// Algorithm of the wrapped estimator.
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::RandomForest(_) => Algorithm::RandomForest,
            Self::GradientBoosting(_) => Algorithm::GradientBoosting,
        }
    }

    pub(crate) fn as_estimator(&self) -> &dyn Estimator {
        match self {
            Self::RandomForest(m) => m,
            Self::GradientBoosting(m) => m,
        }
    }
}

/// A trained regression model ready for inference.
///
/// Immutable once built; prediction never refits.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrainedModel {
    schema_version: u32,
    run_id: String,
    target_column: String,
    feature_names: Vec<String>,
    estimator: FittedEstimator,
    metrics: Metrics,
    trained_at: DateTime<Utc>,
}

assert_impl_all!(TrainedModel: Send, Sync);

impl Artifact for TrainedModel {
    const KIND: &'static str = "trained_model";

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl TrainedModel {
    /// Wrap a fitted estimator trained on the output of preprocessing run
    /// `run_id`.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidData`] if `feature_names` contains the target
    ///   column or a duplicate
    /// - [`LearningError::TrainingFailed`] if the estimator is not fitted
    pub fn new(
        estimator: FittedEstimator,
        feature_names: Vec<String>,
        target_column: impl Into<String>,
        run_id: impl Into<String>,
        metrics: Metrics,
    ) -> Result<Self> {
        let target_column = target_column.into();
        if feature_names.iter().any(|f| *f == target_column) {
            return Err(LearningError::InvalidData(format!(
                "target column '{}' cannot be a model feature",
                target_column
            )));
        }
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(LearningError::InvalidData(format!(
                    "duplicate feature '{}'",
                    name
                )));
            }
        }
        if !estimator.as_estimator().is_fitted() {
            return Err(LearningError::TrainingFailed(
                "cannot wrap an unfitted estimator".to_string(),
            ));
        }

        Ok(Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            run_id: run_id.into(),
            target_column,
            feature_names,
            estimator,
            metrics,
            trained_at: Utc::now(),
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.estimator.algorithm()
    }

    /// Artifact key the model is stored under.
    pub fn model_name(&self) -> &'static str {
        self.algorithm().model_name()
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Feature columns in training order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn estimator(&self) -> &FittedEstimator {
        &self.estimator
    }

    /// Holdout metrics recorded at training time.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    /// Predict one value per row of a preprocessed DataFrame.
    ///
    /// # Errors
    ///
    /// - [`LearningError::FeatureMismatch`] if the column names or their order
    ///   differ from the training features (this includes a frame carrying the
    ///   target column)
    /// - [`LearningError::InvalidData`] if a value is missing or not numeric
    /// - [`LearningError::InferenceError`] if a prediction is not finite
    pub fn predict(&self, features: &DataFrame) -> Result<Vec<f64>> {
        let found: Vec<String> = features
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .collect();
        if found != self.feature_names {
            return Err(LearningError::FeatureMismatch {
                expected: self.feature_names.clone(),
                found,
            });
        }

        let x = FeatureMatrix::from_dataframe(features)?;
        self.predict_matrix(&x)
    }

    /// Predict from an already converted matrix.
    ///
    /// # Errors
    ///
    /// Same as [`predict`](Self::predict).
    pub fn predict_matrix(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if x.feature_names() != self.feature_names.as_slice() {
            return Err(LearningError::FeatureMismatch {
                expected: self.feature_names.clone(),
                found: x.feature_names().to_vec(),
            });
        }

        let predictions = self.estimator.as_estimator().predict(x)?;
        if let Some(row) = predictions.iter().position(|p| !p.is_finite()) {
            return Err(LearningError::InferenceError(format!(
                "prediction for row {} is not finite",
                row
            )));
        }
        Ok(predictions)
    }
}
