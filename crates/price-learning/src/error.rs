//! Error types for the price-learning crate.
//!
//! This module defines [`LearningError`], the main error type used throughout
//! the crate. All public API functions return `Result<T, LearningError>`.
//!
//! # Error Handling
//!
//! Errors are designed to be:
//! - **Descriptive**: Each variant includes context about what went wrong
//! - **Layered**: Preprocessing failures keep their own [`PreprocessingError`]
//!   so callers can still ask whether a failure is a schema or artifact problem
//!
//! # Example
//!
//! ```no_run
//! use price_learning::{LearningError, TrainingConfig};
//!
//! fn configure() -> Result<TrainingConfig, LearningError> {
//!     // Errors are automatically propagated with ?
//!     let config = TrainingConfig::builder()
//!         .n_estimators(200)
//!         .build()?;
//!     Ok(config)
//! }
//! ```

use price_processing::PreprocessingError;
use thiserror::Error;

/// The main error type for price-learning operations.
///
/// This enum covers all error conditions that can occur during:
/// - Configuration and validation
/// - Preprocessing (wrapped [`PreprocessingError`])
/// - Estimator training and holdout evaluation
/// - Inference and prediction output
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to a driver or estimator.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid data provided for training or inference.
    ///
    /// Common causes:
    /// - Feature matrix contains missing values (imputation was skipped)
    /// - Feature matrix and target have different row counts
    /// - A feature column is not numeric
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The configured target column was not found in the training data.
    ///
    /// Column names are case-sensitive.
    #[error("Target column '{0}' not found")]
    TargetNotFound(String),

    /// Estimator fitting or evaluation failed.
    #[error("Training failed: {0}")]
    TrainingFailed(String),

    /// The holdout split has no rows, so the model cannot be evaluated.
    #[error("Holdout set is empty; cannot evaluate the model")]
    EmptyHoldout,

    /// An error occurred during inference/prediction.
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// The features passed to a trained model differ from those it was trained on.
    #[error("Feature mismatch: expected {expected:?}, found {found:?}")]
    FeatureMismatch {
        /// Feature names the model was trained on, in order.
        expected: Vec<String>,
        /// Feature names that were supplied.
        found: Vec<String>,
    },

    /// A preprocessing stage failed.
    #[error("Preprocessing failed: {0}")]
    Preprocessing(#[from] PreprocessingError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl LearningError {
    /// Get a stable error code for diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::TrainingFailed(_) => "TRAINING_FAILED",
            Self::EmptyHoldout => "EMPTY_HOLDOUT",
            Self::InferenceError(_) => "INFERENCE_ERROR",
            Self::FeatureMismatch { .. } => "FEATURE_MISMATCH",
            Self::Preprocessing(e) => e.error_code(),
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
        }
    }

    /// Check if the input data does not have the schema the pipeline expects.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::TargetNotFound(_) | Self::FeatureMismatch { .. } => true,
            Self::Preprocessing(e) => e.is_schema_error() || e.is_artifact_error(),
            _ => false,
        }
    }
}

/// Result type alias for learning operations.
pub type Result<T> = std::result::Result<T, LearningError>;
