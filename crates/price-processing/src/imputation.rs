//! Fitted numeric imputation.
//!
//! Statistics are computed once from training features. Applying the imputer
//! to any other dataset only reads the stored statistics, never the data
//! being imputed.

use crate::artifacts::{ARTIFACT_SCHEMA_VERSION, Artifact};
use crate::config::NumericImputation;
use crate::error::{PreprocessingError, Result};
use crate::utils::{fill_numeric_nulls, is_numeric_like, mean, median, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Fill value for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistic {
    pub column: String,
    pub value: f64,
}

/// Fitted numeric imputer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericImputer {
    schema_version: u32,
    run_id: String,
    strategy: NumericImputation,
    statistics: Vec<ColumnStatistic>,
}

static_assertions::assert_impl_all!(NumericImputer: Send, Sync);

impl Artifact for NumericImputer {
    const KIND: &'static str = "num_imputer";

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl NumericImputer {
    /// Compute one statistic per numeric column of the training features.
    pub fn fit(train: &DataFrame, strategy: NumericImputation) -> Result<Self> {
        let mut statistics = Vec::new();

        for col in train.get_columns() {
            if !is_numeric_like(col.dtype()) {
                continue;
            }
            let name = col.name().to_string();
            let values = numeric_values(col.as_materialized_series())?;
            let value = match strategy {
                NumericImputation::Median => median(&values),
                NumericImputation::Mean => mean(&values),
            }
            .ok_or_else(|| PreprocessingError::NoValidValues(name.clone()))?;

            debug!("{} of '{}' = {:.4}", strategy.as_str(), name, value);
            statistics.push(ColumnStatistic {
                column: name,
                value,
            });
        }

        info!(
            "Fitted {} imputer on {} numeric columns",
            strategy.as_str(),
            statistics.len()
        );

        Ok(Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            run_id: String::new(),
            strategy,
            statistics,
        })
    }

    pub(crate) fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn strategy(&self) -> NumericImputation {
        self.strategy
    }

    pub fn statistics(&self) -> &[ColumnStatistic] {
        &self.statistics
    }

    /// Stored statistic for a column.
    pub fn statistic(&self, column: &str) -> Option<f64> {
        self.statistics
            .iter()
            .find(|s| s.column == column)
            .map(|s| s.value)
    }

    /// Fill missing values of every fitted column with its stored statistic.
    ///
    /// Fitted columns come back as `Float64`; other columns are untouched.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut out = df.clone();

        for stat in &self.statistics {
            let series = df
                .column(&stat.column)
                .map_err(|_| {
                    PreprocessingError::mismatch(
                        Self::KIND,
                        format!("fitted column '{}' is absent", stat.column),
                    )
                })?
                .as_materialized_series();

            if !is_numeric_like(series.dtype()) {
                return Err(PreprocessingError::mismatch(
                    Self::KIND,
                    format!("column '{}' is {}, not numeric", stat.column, series.dtype()),
                ));
            }

            let missing = series.null_count();
            if missing > 0 {
                debug!(
                    "Filling {} missing values in '{}' with {:.4}",
                    missing, stat.column, stat.value
                );
            }
            out.replace(&stat.column, fill_numeric_nulls(series, stat.value)?)?;
        }

        Ok(out)
    }
}
