//! Configuration types for training and prediction.
//!
//! This module provides [`TrainingConfig`] and its builder, as well as the
//! [`Algorithm`] enum.
//!
//! # Example
//!
//! ```
//! use price_learning::{Algorithm, TrainingConfig};
//!
//! let config = TrainingConfig::builder()
//!     .algorithm(Algorithm::GradientBoosting)
//!     .n_estimators(200)
//!     .learning_rate(0.05)
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::LearningError;
use crate::estimators::{GradientBoostingParams, RandomForestParams, TreeParams};
use price_processing::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The regression algorithm to train.
///
/// Both algorithms share the same preprocessing; only the estimator differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum Algorithm {
    /// Bootstrap-aggregated regression trees.
    #[default]
    RandomForest,

    /// Least-squares boosting of shallow regression trees.
    GradientBoosting,
}

impl Algorithm {
    /// Returns the algorithm name.
    ///
    /// # Examples
    ///
    /// ```
    /// use price_learning::Algorithm;
    ///
    /// assert_eq!(Algorithm::RandomForest.as_str(), "random_forest");
    /// assert_eq!(Algorithm::GradientBoosting.as_str(), "gradient_boosting");
    /// ```
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RandomForest => "random_forest",
            Algorithm::GradientBoosting => "gradient_boosting",
        }
    }

    /// Returns the artifact key a model of this algorithm is saved under.
    ///
    /// # Examples
    ///
    /// ```
    /// use price_learning::Algorithm;
    ///
    /// assert_eq!(Algorithm::RandomForest.model_name(), "random_forest_model");
    /// ```
    #[must_use]
    pub fn model_name(&self) -> &'static str {
        match self {
            Algorithm::RandomForest => "random_forest_model",
            Algorithm::GradientBoosting => "gradient_boosting_model",
        }
    }

    /// Default tree depth limit (`None` means unlimited).
    #[must_use]
    pub fn default_max_depth(&self) -> Option<usize> {
        match self {
            Algorithm::RandomForest => None,
            Algorithm::GradientBoosting => Some(3),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a training run.
///
/// Use [`TrainingConfig::builder()`] to construct a configuration with the builder pattern.
/// The struct is serde-(de)serializable with defaults for every field, so a
/// partial JSON file is a valid configuration.
///
/// # Validation
///
/// The builder validates the following constraints on [`build()`](TrainingConfigBuilder::build):
/// - the embedded [`PipelineConfig`] is valid
/// - `n_estimators` must be at least 1
/// - `max_depth`, when set, must be at least 1
/// - `min_samples_split` must be at least 2
/// - `min_samples_leaf` must be at least 1
/// - `max_features`, when set, must be at least 1
/// - `learning_rate` must be in range `(0.0, 1.0]`
/// - `subsample` must be in range `(0.0, 1.0]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Estimator to train (default: random forest).
    pub algorithm: Algorithm,

    /// Cleaning, split, selection and imputation settings.
    pub preprocessing: PipelineConfig,

    /// Directory the preprocessing artifacts are written to (default: `preprocessing`).
    pub preprocessing_dir: PathBuf,

    /// Directory the model artifact is written to (default: `saved_models`).
    pub models_dir: PathBuf,

    /// Number of trees (default: 100).
    pub n_estimators: usize,

    /// Depth limit per tree.
    ///
    /// When `None`, the algorithm default applies: unlimited for random
    /// forest, 3 for gradient boosting.
    pub max_depth: Option<usize>,

    /// Minimum rows a node needs before it may split (default: 2).
    pub min_samples_split: usize,

    /// Minimum rows on each side of a split (default: 1).
    pub min_samples_leaf: usize,

    /// Features considered per split (default: all).
    ///
    /// Ignored by gradient boosting.
    pub max_features: Option<usize>,

    /// Shrinkage applied to each boosting stage (default: 0.1).
    ///
    /// Ignored by random forest.
    pub learning_rate: f64,

    /// Fraction of training rows drawn for each boosting stage (default: 1.0).
    ///
    /// Ignored by random forest, which always bootstraps.
    pub subsample: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            preprocessing: PipelineConfig::default(),
            preprocessing_dir: PathBuf::from("preprocessing"),
            models_dir: PathBuf::from("saved_models"),
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            learning_rate: 0.1,
            subsample: 1.0,
        }
    }
}

impl TrainingConfig {
    /// Create a new builder for `TrainingConfig`.
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::default()
    }

    /// Validate every setting.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] naming the first invalid setting.
    pub fn validate(&self) -> Result<(), LearningError> {
        self.preprocessing
            .validate()
            .map_err(|e| LearningError::InvalidConfig(e.to_string()))?;

        if self.n_estimators == 0 {
            return Err(LearningError::InvalidConfig(
                "n_estimators must be at least 1".to_string(),
            ));
        }

        if self.max_depth == Some(0) {
            return Err(LearningError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }

        if self.min_samples_split < 2 {
            return Err(LearningError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }

        if self.min_samples_leaf == 0 {
            return Err(LearningError::InvalidConfig(
                "min_samples_leaf must be at least 1".to_string(),
            ));
        }

        if self.max_features == Some(0) {
            return Err(LearningError::InvalidConfig(
                "max_features must be at least 1".to_string(),
            ));
        }

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(LearningError::InvalidConfig(
                "learning_rate must be in (0.0, 1.0]".to_string(),
            ));
        }

        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(LearningError::InvalidConfig(
                "subsample must be in (0.0, 1.0]".to_string(),
            ));
        }

        Ok(())
    }

    /// Per-tree parameters for the configured algorithm.
    #[must_use]
    pub fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth.or(self.algorithm.default_max_depth()),
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            max_features: self.max_features,
        }
    }

    /// Random forest parameters derived from this configuration.
    #[must_use]
    pub fn forest_params(&self) -> RandomForestParams {
        RandomForestParams {
            n_estimators: self.n_estimators,
            tree: self.tree_params(),
            random_seed: self.preprocessing.random_seed,
        }
    }

    /// Gradient boosting parameters derived from this configuration.
    #[must_use]
    pub fn boosting_params(&self) -> GradientBoostingParams {
        GradientBoostingParams {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            subsample: self.subsample,
            tree: self.tree_params(),
            random_seed: self.preprocessing.random_seed,
        }
    }
}

/// Builder for [`TrainingConfig`].
///
/// Created via [`TrainingConfig::builder()`]. All setters return `self` to allow
/// method chaining.
#[derive(Debug, Clone, Default)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl TrainingConfigBuilder {
    /// Set the estimator to train.
    #[must_use]
    pub fn algorithm(mut self, algorithm: Algorithm) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Set the preprocessing configuration.
    #[must_use]
    pub fn preprocessing(mut self, config: PipelineConfig) -> Self {
        self.config.preprocessing = config;
        self
    }

    /// Set the directory preprocessing artifacts are written to.
    #[must_use]
    pub fn preprocessing_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.preprocessing_dir = dir.into();
        self
    }

    /// Set the directory the model artifact is written to.
    #[must_use]
    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.models_dir = dir.into();
        self
    }

    /// Set the number of trees (default: 100).
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.n_estimators = n;
        self
    }

    /// Set the depth limit per tree.
    #[must_use]
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = Some(depth);
        self
    }

    /// Set the minimum rows a node needs before it may split (default: 2).
    #[must_use]
    pub fn min_samples_split(mut self, n: usize) -> Self {
        self.config.min_samples_split = n;
        self
    }

    /// Set the minimum rows on each side of a split (default: 1).
    #[must_use]
    pub fn min_samples_leaf(mut self, n: usize) -> Self {
        self.config.min_samples_leaf = n;
        self
    }

    /// Set the number of features considered per split.
    #[must_use]
    pub fn max_features(mut self, n: usize) -> Self {
        self.config.max_features = Some(n);
        self
    }

    /// Set the boosting learning rate (default: 0.1).
    #[must_use]
    pub fn learning_rate(mut self, rate: f64) -> Self {
        self.config.learning_rate = rate;
        self
    }

    /// Set the boosting row subsample fraction (default: 1.0).
    #[must_use]
    pub fn subsample(mut self, fraction: f64) -> Self {
        self.config.subsample = fraction;
        self
    }

    /// Build the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`LearningError::InvalidConfig`] if any setting is out of range.
    pub fn build(self) -> Result<TrainingConfig, LearningError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
