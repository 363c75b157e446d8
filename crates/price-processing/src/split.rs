//! Reproducible train/holdout split.
//!
//! Rows are shuffled with a seeded [`StdRng`], so the same input and seed
//! always give the same partition. The target column is separated from the
//! feature matrices and returned as plain `f64` vectors aligned row by row.

use crate::error::{PreprocessingError, Result};
use crate::utils::{numeric_values, require_series};
use polars::prelude::*;
use rand::prelude::*;
use tracing::{info, warn};

/// Result of splitting a cleaned dataset.
#[derive(Debug, Clone)]
pub struct SplitData {
    /// Training features (target removed).
    pub x_train: DataFrame,
    /// Holdout features (target removed).
    pub x_test: DataFrame,
    /// Training targets, aligned with `x_train` rows.
    pub y_train: Vec<f64>,
    /// Holdout targets, aligned with `x_test` rows.
    pub y_test: Vec<f64>,
    /// Row positions (in the input, after dropping null targets) of the training rows.
    pub train_rows: Vec<usize>,
    /// Row positions of the holdout rows.
    pub test_rows: Vec<usize>,
}

/// Shuffled row positions split into (train, test).
///
/// The first `ceil(n_rows * test_size)` shuffled positions go to the holdout
/// set; both sides keep at least one row.
pub fn shuffled_partition(n_rows: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n_rows as f64) * test_size).ceil() as usize;
    let n_test = n_test.clamp(1, n_rows.saturating_sub(1));

    let train = indices.split_off(n_test);
    (train, indices)
}

/// Split a cleaned dataset into training and holdout subsets.
///
/// Rows whose target is missing cannot be learned from or scored and are
/// dropped before shuffling.
pub fn train_test_split(
    df: &DataFrame,
    target: &str,
    test_size: f64,
    seed: u64,
) -> Result<SplitData> {
    let target_series = require_series(df, target)?;
    if !crate::utils::is_numeric_like(target_series.dtype()) {
        return Err(PreprocessingError::WrongColumnType {
            column: target.to_string(),
            expected: "numeric".to_string(),
            found: target_series.dtype().to_string(),
        });
    }

    let df = if target_series.null_count() > 0 {
        warn!(
            "Dropping {} rows with missing '{}'",
            target_series.null_count(),
            target
        );
        df.filter(&target_series.is_not_null())?
    } else {
        df.clone()
    };

    let n_rows = df.height();
    if n_rows < 2 {
        return Err(PreprocessingError::InvalidData(format!(
            "need at least 2 rows with a known '{}' to split, found {}",
            target, n_rows
        )));
    }

    let targets: Vec<f64> = numeric_values(require_series(&df, target)?)?
        .into_iter()
        .flatten()
        .collect();
    let features = df.drop(target)?;

    let (train_rows, test_rows) = shuffled_partition(n_rows, test_size, seed);

    let x_train = take_rows(&features, &train_rows)?;
    let x_test = take_rows(&features, &test_rows)?;
    let y_train = train_rows.iter().map(|&i| targets[i]).collect();
    let y_test = test_rows.iter().map(|&i| targets[i]).collect();

    info!(
        "Split {} rows into {} train / {} holdout (seed {})",
        n_rows,
        train_rows.len(),
        test_rows.len(),
        seed
    );

    Ok(SplitData {
        x_train,
        x_test,
        y_train,
        y_test,
        train_rows,
        test_rows,
    })
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        rows.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx)
}
