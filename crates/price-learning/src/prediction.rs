//! Prediction on new data with persisted artifacts.
//!
//! [`PredictionDriver`] loads the preprocessing artifacts and a trained model
//! written by a training run, replays the preprocessing on a raw dataset and
//! predicts. Nothing is refitted: every statistic, vocabulary and column list
//! comes from training time.
//!
//! # Example
//!
//! ```rust,ignore
//! use price_learning::{PredictionDriver, read_csv, write_predictions};
//!
//! let df = read_csv("input_data/newdata.csv")?;
//! let driver = PredictionDriver::new("preprocessing", "saved_models", "random_forest_model");
//! let predictions = driver.run(&df)?;
//! write_predictions("output_data/predictions.csv", &predictions)?;
//! ```

use crate::error::{LearningError, Result};
use crate::model::TrainedModel;
use polars::prelude::DataFrame;
use price_processing::{
    Artifact, ArtifactStore, FittedPreprocessor, FsArtifactStore, MissingColumnPolicy,
    NumericImputer, OneHotEncoder, PreprocessingError, PreprocessingManifest, RetainedColumns,
};
use static_assertions::assert_impl_all;
use std::path::{Path, PathBuf};
use tracing::info;

/// Fitted preprocessing plus the model trained on its output.
#[derive(Debug)]
pub struct TrainedPipeline {
    preprocessor: FittedPreprocessor,
    model: TrainedModel,
}

assert_impl_all!(TrainedPipeline: Send, Sync);

impl TrainedPipeline {
    /// Pair a preprocessor with a model.
    ///
    /// # Errors
    ///
    /// - [`PreprocessingError::ArtifactMismatch`] (wrapped) if the model was
    ///   trained after a different preprocessing run
    /// - [`LearningError::FeatureMismatch`] if the model features differ
    ///   from the retained column set
    /// - [`LearningError::InvalidData`] if the two were built for different
    ///   target columns
    pub fn new(preprocessor: FittedPreprocessor, model: TrainedModel) -> Result<Self> {
        if model.run_id() != preprocessor.run_id() {
            return Err(PreprocessingError::mismatch(
                model.model_name(),
                format!(
                    "trained after preprocessing run '{}' but the preprocessing artifacts \
                     are from run '{}'; retrain the model",
                    model.run_id(),
                    preprocessor.run_id()
                ),
            )
            .into());
        }
        let retained = preprocessor.retained().columns();
        if retained != model.feature_names() {
            return Err(LearningError::FeatureMismatch {
                expected: model.feature_names().to_vec(),
                found: retained.to_vec(),
            });
        }
        let target = preprocessor.manifest().target_column();
        if target != model.target_column() {
            return Err(LearningError::InvalidData(format!(
                "preprocessing targets '{}' but the model targets '{}'",
                target,
                model.target_column()
            )));
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    /// Load both halves from their artifact directories.
    pub fn load(
        preprocessing_dir: impl AsRef<Path>,
        models_dir: impl AsRef<Path>,
        model_name: &str,
    ) -> Result<Self> {
        let preprocessing = FsArtifactStore::new(preprocessing_dir.as_ref());
        let models = FsArtifactStore::new(models_dir.as_ref());

        let preprocessor = FittedPreprocessor::load(&preprocessing)?;
        let model: TrainedModel = models.load(model_name)?;
        info!(
            "Loaded {} ({} features, target '{}')",
            model_name,
            model.feature_names().len(),
            model.target_column()
        );
        Self::new(preprocessor, model)
    }

    /// Persist both halves; returns the files written.
    ///
    /// Every file carries the run id, so a set left half-written by a
    /// failure is refused by [`load`](Self::load).
    pub fn save(
        &self,
        preprocessing_dir: impl AsRef<Path>,
        models_dir: impl AsRef<Path>,
    ) -> Result<Vec<PathBuf>> {
        let preprocessing = FsArtifactStore::new(preprocessing_dir.as_ref());
        let models = FsArtifactStore::new(models_dir.as_ref());

        self.preprocessor.save(&preprocessing)?;
        models.save(self.model.model_name(), &self.model)?;

        let mut written: Vec<PathBuf> = [
            PreprocessingManifest::KIND,
            OneHotEncoder::KIND,
            RetainedColumns::KIND,
            NumericImputer::KIND,
        ]
        .iter()
        .map(|key| preprocessing.path_for(key))
        .collect();
        written.push(models.path_for(self.model.model_name()));
        Ok(written)
    }

    pub fn preprocessor(&self) -> &FittedPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Preprocess a raw dataset and predict one value per row.
    pub fn predict(&self, df: &DataFrame, policy: MissingColumnPolicy) -> Result<Vec<f64>> {
        let features = self.preprocessor.transform(df, policy)?;
        self.model.predict(&features)
    }
}

/// Loads persisted artifacts and predicts on raw datasets.
#[derive(Debug, Clone)]
pub struct PredictionDriver {
    preprocessing_dir: PathBuf,
    models_dir: PathBuf,
    model_name: String,
    policy: MissingColumnPolicy,
}

impl PredictionDriver {
    /// Create a driver that fails when a column a cleaning rule needs is absent.
    pub fn new(
        preprocessing_dir: impl Into<PathBuf>,
        models_dir: impl Into<PathBuf>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            preprocessing_dir: preprocessing_dir.into(),
            models_dir: models_dir.into(),
            model_name: model_name.into(),
            policy: MissingColumnPolicy::default(),
        }
    }

    /// Set how cleaning treats absent columns.
    #[must_use]
    pub fn missing_column_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Load the artifacts and predict on `df`.
    ///
    /// # Errors
    ///
    /// Artifact errors (missing file, wrong schema version) and schema errors
    /// in `df` are returned as [`LearningError::Preprocessing`]; see
    /// [`LearningError::is_schema_error`].
    pub fn run(&self, df: &DataFrame) -> Result<Vec<f64>> {
        info!("Predicting {} rows with {}", df.height(), self.model_name);
        let pipeline =
            TrainedPipeline::load(&self.preprocessing_dir, &self.models_dir, &self.model_name)?;
        let predictions = pipeline.predict(df, self.policy)?;
        info!("Predicted {} values", predictions.len());
        Ok(predictions)
    }
}
