//! Training, evaluation and persistence.
//!
//! [`TrainingDriver::run`] executes a full training run:
//!
//! 1. **Preprocessing** - clean, split, encode, select and impute
//!    ([`FittedPreprocessor::fit`])
//! 2. **Training** - fit the configured estimator on the training split
//! 3. **Evaluation** - predict the holdout split and compute [`Metrics`]
//! 4. **Persistence** - write the preprocessing artifacts and the model
//!
//! Nothing is written unless every earlier step succeeds.
//!
//! # Example
//!
//! ```rust,ignore
//! use price_learning::{Algorithm, TrainingConfig, TrainingDriver, read_csv};
//!
//! let df = read_csv("input_data/properties.csv")?;
//! let config = TrainingConfig::builder()
//!     .algorithm(Algorithm::GradientBoosting)
//!     .build()?;
//!
//! let report = TrainingDriver::new(config).run(&df)?;
//! println!("{}: {}", report.model_name, report.metrics);
//! ```

use crate::config::{Algorithm, TrainingConfig};
use crate::error::{LearningError, Result};
use crate::estimators::{Estimator, FeatureMatrix, GradientBoosting, RandomForest};
use crate::model::{FittedEstimator, TrainedModel};
use crate::prediction::TrainedPipeline;
use crate::types::{Metrics, TrainingReport};
use polars::prelude::DataFrame;
use price_processing::FittedPreprocessor;
use std::time::Instant;
use tracing::info;

/// Runs training for one [`TrainingConfig`].
#[derive(Debug, Clone)]
pub struct TrainingDriver {
    config: TrainingConfig,
}

/// An in-memory training result, not yet persisted.
#[derive(Debug)]
pub struct TrainingRun {
    pub pipeline: TrainedPipeline,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingDriver {
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train and evaluate without writing anything.
    ///
    /// # Errors
    ///
    /// - [`LearningError::InvalidConfig`] for an invalid configuration
    /// - [`LearningError::TargetNotFound`] if the target column is absent
    /// - [`LearningError::Preprocessing`] if a preprocessing stage fails
    /// - [`LearningError::TrainingFailed`] / [`LearningError::EmptyHoldout`]
    ///   if the estimator cannot be fitted or evaluated
    pub fn fit(&self, df: &DataFrame) -> Result<TrainingRun> {
        self.config.validate()?;
        let target = self.config.preprocessing.target_column.as_str();
        if df.column(target).is_err() {
            return Err(LearningError::TargetNotFound(target.to_string()));
        }

        info!(
            "Training {} on {} rows, {} columns",
            self.config.algorithm,
            df.height(),
            df.width()
        );

        let (preprocessor, data) = FittedPreprocessor::fit(df, &self.config.preprocessing)?;
        let x_train = FeatureMatrix::from_dataframe(&data.x_train)?;
        let x_test = FeatureMatrix::from_dataframe(&data.x_test)?;
        info!(
            "Fitting {} on {} rows x {} features",
            self.config.algorithm,
            x_train.n_rows(),
            x_train.n_cols()
        );

        let estimator = self.fit_estimator(&x_train, &data.y_train)?;

        if data.y_test.is_empty() {
            return Err(LearningError::EmptyHoldout);
        }
        let holdout = estimator.as_estimator().predict(&x_test)?;
        let metrics = Metrics::compute(&data.y_test, &holdout)?;
        info!("Holdout metrics: {}", metrics);

        let model = TrainedModel::new(
            estimator,
            x_train.feature_names().to_vec(),
            target,
            preprocessor.run_id(),
            metrics,
        )?;
        let pipeline = TrainedPipeline::new(preprocessor, model)?;

        Ok(TrainingRun {
            pipeline,
            n_train: data.y_train.len(),
            n_test: data.y_test.len(),
        })
    }

    /// Train, evaluate and persist every artifact.
    ///
    /// Artifacts go to `preprocessing_dir` and `models_dir`; each file is
    /// written atomically and only after training and evaluation succeed.
    pub fn run(&self, df: &DataFrame) -> Result<TrainingReport> {
        let start = Instant::now();
        let run = self.fit(df)?;

        let artifacts = run
            .pipeline
            .save(&self.config.preprocessing_dir, &self.config.models_dir)?;

        let model = run.pipeline.model();
        let report = TrainingReport {
            algorithm: model.algorithm(),
            model_name: model.model_name().to_string(),
            features: model.feature_names().to_vec(),
            n_train: run.n_train,
            n_test: run.n_test,
            metrics: *model.metrics(),
            training_time_seconds: start.elapsed().as_secs_f64(),
            artifacts,
        };
        info!(
            "Training complete: {} saved in {:.2}s",
            report.model_name, report.training_time_seconds
        );
        Ok(report)
    }

    fn fit_estimator(&self, x: &FeatureMatrix, y: &[f64]) -> Result<FittedEstimator> {
        match self.config.algorithm {
            Algorithm::RandomForest => {
                let mut model = RandomForest::new(self.config.forest_params());
                model.fit(x, y)?;
                Ok(FittedEstimator::RandomForest(model))
            }
            Algorithm::GradientBoosting => {
                let mut model = GradientBoosting::new(self.config.boosting_params());
                model.fit(x, y)?;
                Ok(FittedEstimator::GradientBoosting(model))
            }
        }
    }
}
