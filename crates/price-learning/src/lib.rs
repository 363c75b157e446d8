//! price-learning: property price regression with consistent preprocessing.
//!
//! This crate trains a regression model (random forest or gradient boosting)
//! to predict property prices and applies it to new listings. Preprocessing
//! is delegated to [`price_processing`]; this crate adds the estimators, the
//! trained model artifact and the two drivers that tie everything together.
//!
//! # Features
//!
//! - **Estimators**: random forest and gradient boosting over `smartcore` trees
//! - **Evaluation**: holdout MSE, RMSE, MAE and R²
//! - **Persistence**: versioned JSON artifacts, written only after a
//!   successful run
//! - **Prediction**: replays the training-time preprocessing on new data
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use price_learning::{
//!     Algorithm, PredictionDriver, TrainingConfig, TrainingDriver, read_csv, write_predictions,
//! };
//!
//! // Train and persist
//! let config = TrainingConfig::builder()
//!     .algorithm(Algorithm::RandomForest)
//!     .build()?;
//! let report = TrainingDriver::new(config).run(&read_csv("input_data/properties.csv")?)?;
//! println!("Holdout: {}", report.metrics);
//!
//! // Predict on new listings
//! let driver = PredictionDriver::new("preprocessing", "saved_models", report.model_name);
//! let predictions = driver.run(&read_csv("input_data/newdata.csv")?)?;
//! write_predictions("output_data/predictions.csv", &predictions)?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! raw CSV ──► FittedPreprocessor::fit ──► FeatureMatrix ──► Estimator::fit
//!                    │                                          │
//!                    ▼                                          ▼
//!        preprocessing/*.json                      saved_models/<model>.json
//!                    │                                          │
//! new CSV ──► FittedPreprocessor::transform ──► TrainedModel::predict ──► predictions.csv
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, LearningError>`](LearningError).
//! Preprocessing failures keep their own error inside
//! [`LearningError::Preprocessing`]; use [`LearningError::is_schema_error`] to
//! tell bad input apart from training failures.
//!
//! # Thread Safety
//!
//! Trained artifacts are immutable and `Send + Sync`. Training and prediction
//! run synchronously on the calling thread.

mod config;
mod error;
pub mod estimators;
mod io;
mod model;
mod prediction;
mod training;
mod types;

// Re-export public API
//
// Configuration types
pub use config::{Algorithm, TrainingConfig, TrainingConfigBuilder};
// Error types
pub use error::{LearningError, Result};
// Estimators
pub use estimators::{Estimator, FeatureMatrix};
// CSV input and prediction output
pub use io::{PREDICTION_COLUMN, read_csv, write_predictions};
// Model types
pub use model::{FittedEstimator, TrainedModel};
// Drivers
pub use prediction::{PredictionDriver, TrainedPipeline};
pub use training::{TrainingDriver, TrainingRun};
// Result and metrics types
pub use types::{Metrics, TrainingReport};

// Preprocessing types that appear in this crate's API
pub use price_processing::{MissingColumnPolicy, PipelineConfig};
