//! Custom error types for the preprocessing pipeline.
//!
//! This module provides the error hierarchy shared by every stage using
//! `thiserror`. Errors fall into three families:
//!
//! - **Schema errors** ([`ColumnNotFound`](PreprocessingError::ColumnNotFound),
//!   [`WrongColumnType`](PreprocessingError::WrongColumnType)): the dataset does
//!   not have a column a stage needs, or the column has the wrong type.
//! - **Artifact errors** ([`ArtifactMismatch`](PreprocessingError::ArtifactMismatch),
//!   [`IncompatibleArtifactVersion`](PreprocessingError::IncompatibleArtifactVersion),
//!   [`ArtifactNotFound`](PreprocessingError::ArtifactNotFound)): a fitted artifact
//!   does not line up with the data it is applied to, or cannot be loaded.
//! - **Wrapped errors** from IO, Polars and JSON.
//!
//! None of these are recovered locally; every stage fails fast and the driver
//! reports the error with the stage name attached via [`ResultExt::context`].

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the preprocessing pipeline.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Column exists but holds the wrong kind of values.
    #[error("Column '{column}' has type {found}, expected {expected}")]
    WrongColumnType {
        column: String,
        expected: String,
        found: String,
    },

    /// A fitted artifact does not line up with the dataset it is applied to.
    #[error("Artifact '{artifact}' does not match the dataset: {reason}")]
    ArtifactMismatch { artifact: String, reason: String },

    /// A persisted artifact was written with a different schema version.
    #[error("Artifact '{artifact}' has schema version {found}, expected {expected}")]
    IncompatibleArtifactVersion {
        artifact: String,
        found: u32,
        expected: u32,
    },

    /// No persisted artifact exists under the requested key.
    #[error("Artifact not found: {path}")]
    ArtifactNotFound { path: String },

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Feature selection kept no column.
    #[error("No feature passed the selection criterion ({0})")]
    NoFeaturesSelected(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The dataset cannot be processed (e.g. too few rows).
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for [`ArtifactMismatch`](Self::ArtifactMismatch).
    pub fn mismatch(artifact: impl Into<String>, reason: impl Into<String>) -> Self {
        PreprocessingError::ArtifactMismatch {
            artifact: artifact.into(),
            reason: reason.into(),
        }
    }

    /// Get a stable error code for diagnostics.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::WrongColumnType { .. } => "WRONG_COLUMN_TYPE",
            Self::ArtifactMismatch { .. } => "ARTIFACT_MISMATCH",
            Self::IncompatibleArtifactVersion { .. } => "INCOMPATIBLE_ARTIFACT_VERSION",
            Self::ArtifactNotFound { .. } => "ARTIFACT_NOT_FOUND",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::NoFeaturesSelected(_) => "NO_FEATURES_SELECTED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error means the dataset schema is not what a stage expects.
    pub fn is_schema_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::WrongColumnType { .. } => true,
            Self::WithContext { source, .. } => source.is_schema_error(),
            _ => false,
        }
    }

    /// Check if this error means a fitted artifact cannot be used as-is.
    pub fn is_artifact_error(&self) -> bool {
        match self {
            Self::ArtifactMismatch { .. }
            | Self::IncompatibleArtifactVersion { .. }
            | Self::ArtifactNotFound { .. } => true,
            Self::WithContext { source, .. } => source.is_artifact_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for preprocessing operations.
pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PreprocessingError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            PreprocessingError::ColumnNotFound("epc".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PreprocessingError::mismatch("onehotencoder", "missing 'city'").error_code(),
            "ARTIFACT_MISMATCH"
        );
    }

    #[test]
    fn test_is_schema_error() {
        assert!(PreprocessingError::ColumnNotFound("epc".to_string()).is_schema_error());
        assert!(
            PreprocessingError::WrongColumnType {
                column: "area".to_string(),
                expected: "numeric".to_string(),
                found: "str".to_string(),
            }
            .is_schema_error()
        );
        assert!(!PreprocessingError::NoValidValues("area".to_string()).is_schema_error());
    }

    #[test]
    fn test_is_artifact_error_through_context() {
        let error = PreprocessingError::IncompatibleArtifactVersion {
            artifact: "num_imputer".to_string(),
            found: 0,
            expected: 1,
        }
        .with_context("Loading artifacts");
        assert!(error.is_artifact_error());
        assert!(!error.is_schema_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = PreprocessingError::ColumnNotFound("state_building".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("state_building"));
    }

    #[test]
    fn test_with_context() {
        let error = PreprocessingError::ColumnNotFound("epc".to_string()).with_context("cleaning");
        assert!(error.to_string().contains("cleaning"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND"); // Preserves original code
        assert!(error.is_schema_error());
    }
}
