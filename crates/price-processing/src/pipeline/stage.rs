use serde::{Deserialize, Serialize};

/// Stages of the preprocessing pipeline, in execution order.
///
/// Used to label log lines and to attach the failing stage to errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingStage {
    /// Structural drop, missing-value fill and domain encoding
    Cleaning,
    /// Seeded train/holdout partition
    Splitting,
    /// Giving prediction data the training-time column types
    Conforming,
    /// One-hot encoding of categorical columns
    Encoding,
    /// Correlation-based column selection
    Selection,
    /// Reindexing to the retained column set
    Alignment,
    /// Filling numeric gaps with training statistics
    Imputation,
}

impl PreprocessingStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cleaning => "Cleaning Data",
            Self::Splitting => "Splitting Data",
            Self::Conforming => "Conforming Schema",
            Self::Encoding => "Encoding Categories",
            Self::Selection => "Selecting Features",
            Self::Alignment => "Aligning Columns",
            Self::Imputation => "Imputing Values",
        }
    }

    /// Context string attached to errors raised inside the stage.
    pub fn context(&self) -> String {
        format!("{} stage", self.display_name().to_lowercase())
    }
}

impl std::fmt::Display for PreprocessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_context() {
        assert_eq!(PreprocessingStage::Imputation.context(), "imputing values stage");
        assert_eq!(PreprocessingStage::Encoding.to_string(), "Encoding Categories");
    }

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&PreprocessingStage::Selection).unwrap();
        assert_eq!(json, "\"selection\"");
    }
}
