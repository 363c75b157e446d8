//! Data cleaning stage.
//!
//! Cleaning is a list of [`CleaningStep`]s, each a pure function from one
//! DataFrame snapshot to the next. The steps touch disjoint concerns:
//! - structural drop of known-irrelevant columns
//! - missing values (constant text label, zero for flag columns)
//! - domain encoding of `state_building` and `epc`
//!
//! so the cleaned result does not depend on the order they run in. Cleaning
//! never reads a fitted artifact.

mod domain;

pub use domain::{EPC_SCALE, OrdinalScale, STATE_BUILDING_SCALE, domain_scales};

use crate::config::{DomainEncoding, MissingColumnPolicy, PipelineConfig};
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::utils::{fill_numeric_nulls, fill_string_nulls, is_text_dtype, require_numeric};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One cleaning operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CleaningStep {
    /// Remove known-irrelevant columns. Absent columns are ignored.
    DropColumns(Vec<String>),
    /// Replace nulls in every text column with a constant label.
    FillMissingText(String),
    /// Replace nulls in the listed numeric columns with 0.
    FillMissingZero(Vec<String>),
    /// Map a field onto its ordinal scale.
    EncodeOrdinal(&'static OrdinalScale),
    /// Normalise a field's labels and keep it categorical.
    NormalizeLabels { column: String, fill: String },
}

impl CleaningStep {
    /// Short name used in logs and error context.
    pub fn name(&self) -> &'static str {
        match self {
            Self::DropColumns(_) => "drop_columns",
            Self::FillMissingText(_) => "fill_missing_text",
            Self::FillMissingZero(_) => "fill_missing_zero",
            Self::EncodeOrdinal(_) => "encode_ordinal",
            Self::NormalizeLabels { .. } => "normalize_labels",
        }
    }

    /// Apply the step to a snapshot and return the next snapshot.
    pub fn apply(&self, df: &DataFrame, policy: MissingColumnPolicy) -> Result<DataFrame> {
        match self {
            Self::DropColumns(columns) => Ok(drop_columns(df, columns)),
            Self::FillMissingText(fill) => fill_missing_text(df, fill),
            Self::FillMissingZero(columns) => fill_missing_zero(df, columns, policy),
            Self::EncodeOrdinal(scale) => {
                replace_required(df, scale.column, policy, |s| domain::encode_ordinal(s, scale))
            }
            Self::NormalizeLabels { column, fill } => {
                replace_required(df, column, policy, |s| domain::normalize_labels(s, fill))
            }
        }
    }
}

/// The cleaning settings of a training run.
///
/// Recorded in the preprocessing manifest so prediction cleans new data with
/// exactly the rules the model was trained with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningPlan {
    pub drop_columns: Vec<String>,
    pub text_fill_value: String,
    pub zero_fill_columns: Vec<String>,
    pub domain_encoding: DomainEncoding,
}

impl CleaningPlan {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            drop_columns: config.drop_columns.clone(),
            text_fill_value: config.text_fill_value.clone(),
            zero_fill_columns: config.zero_fill_columns.clone(),
            domain_encoding: config.domain_encoding,
        }
    }

    /// Whether cleaning reads `column` as text and derives its type itself.
    pub fn reads_text(&self, column: &str) -> bool {
        domain_scales().iter().any(|scale| scale.column == column)
    }

    /// Expand the plan into its cleaning steps.
    pub fn steps(&self) -> Vec<CleaningStep> {
        let mut steps = vec![
            CleaningStep::DropColumns(self.drop_columns.clone()),
            CleaningStep::FillMissingText(self.text_fill_value.clone()),
        ];

        if !self.zero_fill_columns.is_empty() {
            steps.push(CleaningStep::FillMissingZero(self.zero_fill_columns.clone()));
        }

        for scale in domain_scales() {
            steps.push(match self.domain_encoding {
                DomainEncoding::Ordinal => CleaningStep::EncodeOrdinal(scale),
                DomainEncoding::Indicator => CleaningStep::NormalizeLabels {
                    column: scale.column.to_string(),
                    fill: self.text_fill_value.clone(),
                },
            });
        }

        steps
    }
}

/// Build the cleaning steps described by a configuration.
pub fn steps_for(config: &PipelineConfig) -> Vec<CleaningStep> {
    CleaningPlan::from_config(config).steps()
}

/// Runs cleaning steps in sequence.
pub struct Cleaner;

impl Cleaner {
    /// Run every step on the input and return the cleaned dataset.
    ///
    /// Fails with the step name attached as context.
    pub fn clean(
        df: &DataFrame,
        steps: &[CleaningStep],
        policy: MissingColumnPolicy,
    ) -> Result<DataFrame> {
        info!("Cleaning dataset {:?} with {} steps", df.shape(), steps.len());

        let mut current = df.clone();
        for step in steps {
            current = step
                .apply(&current, policy)
                .context(format!("cleaning step '{}'", step.name()))?;
            debug!("After {}: {:?}", step.name(), current.shape());
        }

        Ok(current)
    }
}

fn drop_columns(df: &DataFrame, columns: &[String]) -> DataFrame {
    let present: Vec<PlSmallStr> = columns
        .iter()
        .filter(|c| df.column(c).is_ok())
        .map(|c| c.as_str().into())
        .collect();

    if present.is_empty() {
        return df.clone();
    }

    debug!("Dropping columns: {:?}", present);
    df.drop_many(present)
}

fn fill_missing_text(df: &DataFrame, fill: &str) -> Result<DataFrame> {
    let mut out = df.clone();
    for col in df.get_columns() {
        if !is_text_dtype(col.dtype()) || col.null_count() == 0 {
            continue;
        }
        let series = col.as_materialized_series();
        debug!("Filling {} missing labels in '{}'", series.null_count(), series.name());
        out.replace(series.name().as_str(), fill_string_nulls(series, fill)?)?;
    }
    Ok(out)
}

fn fill_missing_zero(
    df: &DataFrame,
    columns: &[String],
    policy: MissingColumnPolicy,
) -> Result<DataFrame> {
    let mut out = df.clone();
    for name in columns {
        let Some(series) = required_series(df, name, policy)? else {
            continue;
        };
        require_numeric(series)?;
        out.replace(name, fill_numeric_nulls(series, 0.0)?)?;
    }
    Ok(out)
}

fn replace_required<F>(
    df: &DataFrame,
    name: &str,
    policy: MissingColumnPolicy,
    transform: F,
) -> Result<DataFrame>
where
    F: FnOnce(&Series) -> Result<Series>,
{
    let Some(series) = required_series(df, name, policy)? else {
        return Ok(df.clone());
    };
    let replacement = transform(series)?;
    let mut out = df.clone();
    out.replace(name, replacement)?;
    Ok(out)
}

/// Look up a column a rule depends on, honouring the missing-column policy.
fn required_series<'a>(
    df: &'a DataFrame,
    name: &str,
    policy: MissingColumnPolicy,
) -> Result<Option<&'a Series>> {
    match df.column(name) {
        Ok(col) => Ok(Some(col.as_materialized_series())),
        Err(_) => match policy {
            MissingColumnPolicy::Fail => Err(PreprocessingError::ColumnNotFound(name.to_string())),
            MissingColumnPolicy::Skip => {
                warn!("Column '{}' not found; skipping its cleaning rule", name);
                Ok(None)
            }
        },
    }
}
