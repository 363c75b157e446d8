//! Prediction-time schema alignment.
//!
//! A prediction dataset encoded with the training encoder may still differ
//! from the training schema: categories seen in training can be absent (their
//! indicator columns are all zero anyway) and extra numeric columns can be
//! present. Alignment reindexes the columns to the retained set: extra
//! columns are dropped, absent ones are added as `0.0`, and the order is the
//! retained order.

use crate::artifacts::Artifact;
use crate::error::{PreprocessingError, Result};
use crate::selection::RetainedColumns;
use crate::utils::{column_names, is_numeric_like};
use polars::prelude::*;
use tracing::{debug, warn};

/// Reindex a dataset's columns to exactly the retained set.
///
/// Aligning an already aligned dataset returns an equal dataset.
pub fn align_to(df: &DataFrame, retained: &RetainedColumns) -> Result<DataFrame> {
    let height = df.height();
    let mut columns: Vec<Column> = Vec::with_capacity(retained.len());
    let mut padded = Vec::new();

    for name in retained.columns() {
        match df.column(name) {
            Ok(col) if is_numeric_like(col.dtype()) => columns.push(col.clone()),
            // An all-null column read from CSV has no numeric type yet
            Ok(col) if col.null_count() == col.len() => {
                columns.push(col.cast(&DataType::Float64)?);
            }
            Ok(col) => {
                return Err(PreprocessingError::mismatch(
                    RetainedColumns::KIND,
                    format!("retained column '{}' is {}, not numeric", name, col.dtype()),
                ));
            }
            Err(_) => {
                padded.push(name.as_str());
                columns.push(Series::new(name.as_str().into(), vec![0.0f64; height]).into());
            }
        }
    }

    let dropped: Vec<String> = column_names(df)
        .into_iter()
        .filter(|c| !retained.contains(c))
        .collect();

    if !padded.is_empty() {
        debug!("Padded {} absent columns with 0: {:?}", padded.len(), padded);
    }
    if !dropped.is_empty() {
        warn!(
            "Dropped {} columns unknown to the trained model: {:?}",
            dropped.len(),
            dropped
        );
    }

    Ok(DataFrame::new(columns)?)
}
