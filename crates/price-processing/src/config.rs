//! Configuration types for the preprocessing pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup. The configuration is
//! serde-serializable so it can be loaded from a JSON file.

use serde::{Deserialize, Serialize};

/// Strategy for computing the numeric imputation statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumericImputation {
    /// Use the mean of non-null training values
    Mean,
    /// Use the median of non-null training values
    #[default]
    Median,
}

impl NumericImputation {
    /// Returns the lowercase name used in logs and artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericImputation::Mean => "mean",
            NumericImputation::Median => "median",
        }
    }
}

/// How the two domain-knowledge fields (`state_building`, `epc`) are encoded
/// during cleaning.
///
/// The choice is recorded in the preprocessing manifest and replayed at
/// prediction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DomainEncoding {
    /// Map the labels onto fixed ordinal scales (numeric features).
    #[default]
    Ordinal,
    /// Normalise the labels and leave them categorical for one-hot encoding.
    Indicator,
}

/// What a cleaning rule does when a column it requires is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingColumnPolicy {
    /// Fail with a schema error
    #[default]
    Fail,
    /// Log a warning and skip the rule
    Skip,
}

/// Correlation criterion used to pick the retained feature columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionCriterion {
    /// Keep columns whose absolute correlation with the target exceeds the value
    Threshold(f64),
    /// Keep the K columns with the highest absolute correlation
    TopK(usize),
}

impl Default for SelectionCriterion {
    fn default() -> Self {
        SelectionCriterion::Threshold(0.1)
    }
}

/// Configuration for the preprocessing pipeline.
///
/// Use [`PipelineConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use price_processing::config::{PipelineConfig, DomainEncoding};
///
/// let config = PipelineConfig::builder()
///     .target_column("price")
///     .domain_encoding(DomainEncoding::Indicator)
///     .test_size(0.25)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Name of the column to predict.
    /// Default: "price"
    pub target_column: String,

    /// Known-irrelevant columns removed during cleaning.
    /// Default: ["id"]
    pub drop_columns: Vec<String>,

    /// Label substituted for missing text values during cleaning.
    /// Default: "MISSING"
    pub text_fill_value: String,

    /// Numeric flag columns where a missing value means "absent" (filled with 0).
    /// Default: empty
    pub zero_fill_columns: Vec<String>,

    /// Encoding of the `state_building` and `epc` fields.
    /// Default: Ordinal
    pub domain_encoding: DomainEncoding,

    /// Behaviour when a column required by a cleaning rule is absent.
    /// Default: Fail
    pub missing_column_policy: MissingColumnPolicy,

    /// Fraction of rows held out for evaluation (0.0 - 1.0, exclusive).
    /// Default: 0.2
    pub test_size: f64,

    /// Seed for the train/holdout shuffle.
    /// Default: 42
    pub random_seed: u64,

    /// Feature selection criterion.
    /// Default: Threshold(0.1)
    pub selection: SelectionCriterion,

    /// Statistic used by the numeric imputer.
    /// Default: Median
    pub numeric_imputation: NumericImputation,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_column: "price".to_string(),
            drop_columns: vec!["id".to_string()],
            text_fill_value: "MISSING".to_string(),
            zero_fill_columns: Vec::new(),
            domain_encoding: DomainEncoding::default(),
            missing_column_policy: MissingColumnPolicy::default(),
            test_size: 0.2,
            random_seed: 42,
            selection: SelectionCriterion::default(),
            numeric_imputation: NumericImputation::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTargetColumn);
        }

        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(ConfigValidationError::InvalidTestSize(self.test_size));
        }

        match self.selection {
            SelectionCriterion::Threshold(t) if !(0.0..1.0).contains(&t) => {
                return Err(ConfigValidationError::InvalidThreshold(t));
            }
            SelectionCriterion::TopK(0) => {
                return Err(ConfigValidationError::InvalidTopK(0));
            }
            _ => {}
        }

        if self.drop_columns.iter().any(|c| c == &self.target_column) {
            return Err(ConfigValidationError::TargetDropped(
                self.target_column.clone(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Target column name must not be empty")]
    EmptyTargetColumn,

    #[error("Invalid test size: {0} (must be strictly between 0.0 and 1.0)")]
    InvalidTestSize(f64),

    #[error("Invalid correlation threshold: {0} (must be in [0.0, 1.0))")]
    InvalidThreshold(f64),

    #[error("Invalid top-k: {0} (must be at least 1)")]
    InvalidTopK(usize),

    #[error("Target column '{0}' is listed in drop_columns")]
    TargetDropped(String),
}

impl From<ConfigValidationError> for crate::error::PreprocessingError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::PreprocessingError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    target_column: Option<String>,
    drop_columns: Option<Vec<String>>,
    text_fill_value: Option<String>,
    zero_fill_columns: Option<Vec<String>>,
    domain_encoding: Option<DomainEncoding>,
    missing_column_policy: Option<MissingColumnPolicy>,
    test_size: Option<f64>,
    random_seed: Option<u64>,
    selection: Option<SelectionCriterion>,
    numeric_imputation: Option<NumericImputation>,
}

impl PipelineConfigBuilder {
    /// Set the column to predict.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the known-irrelevant columns dropped during cleaning.
    pub fn drop_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.drop_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Set the label used for missing text values.
    pub fn text_fill_value(mut self, value: impl Into<String>) -> Self {
        self.text_fill_value = Some(value.into());
        self
    }

    /// Set the numeric flag columns whose missing values mean 0.
    pub fn zero_fill_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zero_fill_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Choose how `state_building` and `epc` are encoded.
    pub fn domain_encoding(mut self, encoding: DomainEncoding) -> Self {
        self.domain_encoding = Some(encoding);
        self
    }

    /// Choose what happens when a column required by a cleaning rule is absent.
    pub fn missing_column_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_column_policy = Some(policy);
        self
    }

    /// Set the holdout fraction.
    ///
    /// # Arguments
    /// * `size` - Value strictly between 0.0 and 1.0 (e.g., 0.2 = 20%)
    pub fn test_size(mut self, size: f64) -> Self {
        self.test_size = Some(size);
        self
    }

    /// Set the seed of the train/holdout shuffle.
    pub fn random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Set the feature selection criterion.
    pub fn selection(mut self, criterion: SelectionCriterion) -> Self {
        self.selection = Some(criterion);
        self
    }

    /// Set the numeric imputation statistic.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            target_column: self.target_column.unwrap_or(defaults.target_column),
            drop_columns: self.drop_columns.unwrap_or(defaults.drop_columns),
            text_fill_value: self.text_fill_value.unwrap_or(defaults.text_fill_value),
            zero_fill_columns: self.zero_fill_columns.unwrap_or_default(),
            domain_encoding: self.domain_encoding.unwrap_or_default(),
            missing_column_policy: self.missing_column_policy.unwrap_or_default(),
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_seed: self.random_seed.unwrap_or(defaults.random_seed),
            selection: self.selection.unwrap_or_default(),
            numeric_imputation: self.numeric_imputation.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
