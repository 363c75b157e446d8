//! Shared utilities for the preprocessing pipeline.
//!
//! This module contains the column helpers used across stages so that every
//! stage extracts, fills and rebuilds columns the same way.

use crate::error::{PreprocessingError, Result};
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for preprocessing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Boolean type (treated as 0/1)
    Boolean,
    /// String/categorical text
    Text,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds text labels.
#[inline]
pub fn is_text_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if is_text_dtype(dtype) {
        DtypeCategory::Text
    } else {
        DtypeCategory::Other
    }
}

/// Whether a column can be fed to an estimator as numbers.
#[inline]
pub fn is_numeric_like(dtype: &DataType) -> bool {
    matches!(
        get_dtype_category(dtype),
        DtypeCategory::Numeric | DtypeCategory::Boolean
    )
}

/// Owned column names of a DataFrame, in order.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Fetch a column as a Series, mapping absence to a schema error.
pub fn require_series<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| PreprocessingError::ColumnNotFound(name.to_string()))
}

// =============================================================================
// Value Extraction
// =============================================================================

/// Extract a numeric-like Series as `f64` values (nulls preserved).
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Extract a Series as owned strings (nulls preserved).
pub fn text_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Extract a numeric column, failing with a schema error for text columns.
pub fn require_numeric(series: &Series) -> Result<Vec<Option<f64>>> {
    if !is_numeric_like(series.dtype()) {
        return Err(PreprocessingError::WrongColumnType {
            column: series.name().to_string(),
            expected: "numeric".to_string(),
            found: series.dtype().to_string(),
        });
    }
    Ok(numeric_values(series)?)
}

// =============================================================================
// Statistics
// =============================================================================

/// Median of the observed (non-null, non-NaN) values.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    observed.sort_by(|a, b| a.total_cmp(b));
    let mid = observed.len() / 2;
    if observed.len() % 2 == 0 {
        Some((observed[mid - 1] + observed[mid]) / 2.0)
    } else {
        Some(observed[mid])
    }
}

/// Mean of the observed (non-null, non-NaN) values.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let observed: Vec<f64> = values.iter().flatten().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }
    Some(observed.iter().sum::<f64>() / observed.len() as f64)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = numeric_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a string Series with a specific value.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = text_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Label Normalisation
// =============================================================================

static LABEL_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\-]+").expect("static regex is valid"));

/// Normalise a categorical label: trim, upper-case, and collapse runs of
/// whitespace or dashes into a single underscore.
///
/// ```rust,ignore
/// assert_eq!(normalize_label(" as new "), "AS_NEW");
/// assert_eq!(normalize_label("to-be done  up"), "TO_BE_DONE_UP");
/// ```
pub fn normalize_label(raw: &str) -> String {
    LABEL_SEPARATORS
        .replace_all(raw.trim(), "_")
        .to_ascii_uppercase()
}

// =============================================================================
// Tests
// =============================================================================
