//! Preprocessing manifest: the cleaned schema recorded at training time.
//!
//! The manifest remembers which columns the cleaned training data had, the
//! semantic kind of each (numeric or categorical), the target column and the
//! cleaning plan used. Prediction uses it to clean new data the same way and
//! to give every column its training-time type before encoding.

use crate::artifacts::{ARTIFACT_SCHEMA_VERSION, Artifact};
use crate::cleaner::CleaningPlan;
use crate::config::DomainEncoding;
use crate::error::{PreprocessingError, Result};
use crate::utils::{is_numeric_like, is_text_dtype};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Semantic type of a cleaned column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

/// Name and kind of one cleaned feature column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// Cleaned training schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingManifest {
    schema_version: u32,
    run_id: String,
    target_column: String,
    cleaning: CleaningPlan,
    columns: Vec<ColumnSchema>,
    created_at: DateTime<Utc>,
}

static_assertions::assert_impl_all!(PreprocessingManifest: Send, Sync);

impl Artifact for PreprocessingManifest {
    const KIND: &'static str = "preprocessing_manifest";

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl PreprocessingManifest {
    /// Record the feature schema of a cleaned training dataset.
    ///
    /// The target column is left out; columns that are neither numeric nor
    /// text are rejected.
    pub fn from_cleaned(
        cleaned: &DataFrame,
        target_column: &str,
        cleaning: CleaningPlan,
    ) -> Result<Self> {
        let mut columns = Vec::new();
        for col in cleaned.get_columns() {
            let name = col.name().to_string();
            if name == target_column {
                continue;
            }
            let kind = if is_numeric_like(col.dtype()) {
                ColumnKind::Numeric
            } else if is_text_dtype(col.dtype()) {
                ColumnKind::Categorical
            } else {
                return Err(PreprocessingError::WrongColumnType {
                    column: name,
                    expected: "numeric or text".to_string(),
                    found: col.dtype().to_string(),
                });
            };
            columns.push(ColumnSchema { name, kind });
        }

        Ok(Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            run_id: String::new(),
            target_column: target_column.to_string(),
            cleaning,
            columns,
            created_at: Utc::now(),
        })
    }

    pub(crate) fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn cleaning(&self) -> &CleaningPlan {
        &self.cleaning
    }

    pub fn domain_encoding(&self) -> DomainEncoding {
        self.cleaning.domain_encoding
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Retype numeric columns that arrive with no values at all.
    ///
    /// A CSV column with every cell empty carries no type information and is
    /// read as text. Cast such columns to `Float64` when the training data
    /// knew them as numeric, so cleaning leaves them alone and the imputer
    /// fills them. Columns cleaning encodes from text are left as they are.
    pub fn retype_empty_columns(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        for schema in &self.columns {
            if schema.kind != ColumnKind::Numeric || self.cleaning.reads_text(&schema.name) {
                continue;
            }
            let Ok(col) = df.column(&schema.name) else {
                continue;
            };
            if is_numeric_like(col.dtype()) || col.null_count() < col.len() {
                continue;
            }
            debug!("Column '{}' has no values; typing it as numeric", schema.name);
            let empty = Series::full_null(schema.name.as_str().into(), col.len(), &DataType::Float64);
            out.replace(&schema.name, empty)?;
        }
        Ok(out)
    }

    /// Give a cleaned prediction dataset the training-time column types.
    ///
    /// - numeric columns are cast to `Float64`; a value that cannot be read
    ///   as a number is a schema error
    /// - categorical columns are cast to text
    /// - columns absent from the new data are added as all-null, so the
    ///   encoder treats them as unseen and the imputer fills them
    /// - columns the manifest does not know are kept for alignment to drop
    pub fn conform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();
        let height = df.height();

        for schema in &self.columns {
            let name = schema.name.as_str();
            match df.column(name) {
                Ok(col) => {
                    let series = col.as_materialized_series();
                    let conformed = match schema.kind {
                        ColumnKind::Numeric => to_numeric(series)?,
                        ColumnKind::Categorical => series.cast(&DataType::String)?,
                    };
                    out.replace(name, conformed)?;
                }
                Err(_) => {
                    warn!("Column '{}' absent from new data; treated as missing", name);
                    let filler = match schema.kind {
                        ColumnKind::Numeric => Series::full_null(name.into(), height, &DataType::Float64),
                        ColumnKind::Categorical => Series::full_null(name.into(), height, &DataType::String),
                    };
                    out.with_column(filler)?;
                }
            }
        }

        debug!("Conformed dataset to manifest: {:?}", out.shape());
        Ok(out)
    }
}

fn to_numeric(series: &Series) -> Result<Series> {
    if is_numeric_like(series.dtype()) {
        return Ok(series.cast(&DataType::Float64)?);
    }

    let cast = series.cast(&DataType::Float64)?;
    if cast.null_count() > series.null_count() {
        return Err(PreprocessingError::WrongColumnType {
            column: series.name().to_string(),
            expected: "numeric".to_string(),
            found: series.dtype().to_string(),
        });
    }
    Ok(cast)
}
