//! One-hot encoding of categorical columns.
//!
//! [`OneHotEncoder::fit`] is only ever called on training features. The
//! returned encoder is immutable: [`OneHotEncoder::transform`] applies the
//! stored vocabularies verbatim to any later dataset (holdout, prediction
//! input), so the indicator layout never depends on the data being encoded.
//! Unseen or missing labels produce an all-zero indicator block.

use crate::artifacts::{ARTIFACT_SCHEMA_VERSION, Artifact};
use crate::error::{PreprocessingError, Result};
use crate::utils::{column_names, is_text_dtype, text_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// Fitted labels of one categorical column, in indicator order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalVocabulary {
    column: String,
    categories: Vec<String>,
}

impl CategoricalVocabulary {
    /// Source column name.
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Known labels, sorted.
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Names of the indicator columns this vocabulary expands into.
    pub fn indicator_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|category| indicator_name(&self.column, category))
            .collect()
    }
}

/// Name of the indicator column for one label.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Fitted one-hot encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    schema_version: u32,
    run_id: String,
    vocabularies: Vec<CategoricalVocabulary>,
}

static_assertions::assert_impl_all!(OneHotEncoder: Send, Sync);

impl Artifact for OneHotEncoder {
    const KIND: &'static str = "onehotencoder";

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl OneHotEncoder {
    /// Learn the vocabulary of every text column in the training features.
    pub fn fit(train: &DataFrame) -> Result<Self> {
        let mut vocabularies = Vec::new();

        for col in train.get_columns() {
            if !is_text_dtype(col.dtype()) {
                continue;
            }
            let series = col.as_materialized_series();
            let categories: BTreeSet<String> =
                text_values(series)?.into_iter().flatten().collect();

            debug!(
                "Vocabulary for '{}': {} categories",
                series.name(),
                categories.len()
            );
            vocabularies.push(CategoricalVocabulary {
                column: series.name().to_string(),
                categories: categories.into_iter().collect(),
            });
        }

        check_output_names(train, &vocabularies)?;
        info!(
            "Fitted one-hot encoder on {} categorical columns",
            vocabularies.len()
        );

        Ok(Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            run_id: String::new(),
            vocabularies,
        })
    }

    pub(crate) fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    /// Fitted vocabularies in column order.
    pub fn vocabularies(&self) -> &[CategoricalVocabulary] {
        &self.vocabularies
    }

    /// Names of the source categorical columns.
    pub fn categorical_columns(&self) -> Vec<&str> {
        self.vocabularies.iter().map(|v| v.column()).collect()
    }

    /// Every indicator column name, in output order.
    pub fn indicator_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| v.indicator_names())
            .collect()
    }

    /// Replace fitted categorical columns with their indicator columns.
    ///
    /// Other columns keep their position; indicator columns are appended in
    /// vocabulary order.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let encoded: HashSet<&str> = self.categorical_columns().into_iter().collect();

        for column in &encoded {
            if df.column(column).is_err() {
                return Err(PreprocessingError::mismatch(
                    Self::KIND,
                    format!("fitted categorical column '{}' is absent", column),
                ));
            }
        }

        let mut columns: Vec<Column> = df
            .get_columns()
            .iter()
            .filter(|col| !encoded.contains(col.name().as_str()))
            .cloned()
            .collect();

        for vocabulary in &self.vocabularies {
            let series = df.column(vocabulary.column())?.as_materialized_series();
            let labels = text_values(series)?;

            let mut unseen = 0usize;
            for label in labels.iter().flatten() {
                if vocabulary.categories.binary_search(label).is_err() {
                    unseen += 1;
                }
            }
            if unseen > 0 {
                debug!(
                    "'{}': {} rows with unseen categories encoded as all-zero",
                    vocabulary.column(),
                    unseen
                );
            }

            for category in &vocabulary.categories {
                let indicator: Vec<f64> = labels
                    .iter()
                    .map(|label| match label {
                        Some(l) if l == category => 1.0,
                        _ => 0.0,
                    })
                    .collect();
                columns.push(
                    Series::new(indicator_name(vocabulary.column(), category).into(), indicator)
                        .into(),
                );
            }
        }

        let out = DataFrame::new(columns)?;
        debug!(
            "Encoded {:?} -> {:?} ({} input columns)",
            df.shape(),
            out.shape(),
            column_names(df).len()
        );
        Ok(out)
    }
}

/// Every output column name must come from exactly one source.
fn check_output_names(train: &DataFrame, vocabularies: &[CategoricalVocabulary]) -> Result<()> {
    let encoded: HashSet<&str> = vocabularies.iter().map(|v| v.column()).collect();
    let mut sources: HashMap<String, String> = HashMap::new();

    for col in train.get_columns() {
        let name = col.name().as_str();
        if !encoded.contains(name) {
            sources.insert(name.to_string(), format!("column '{}'", name));
        }
    }

    for vocabulary in vocabularies {
        for category in vocabulary.categories() {
            let name = indicator_name(vocabulary.column(), category);
            let source = format!("'{}' = '{}'", vocabulary.column(), category);
            if let Some(existing) = sources.get(&name) {
                return Err(PreprocessingError::InvalidData(format!(
                    "indicator column '{}' for {} collides with {}",
                    name, source, existing
                )));
            }
            sources.insert(name, source);
        }
    }
    Ok(())
}
