//! Correlation-based feature selection.
//!
//! The retained column set is computed once from the training split and is
//! the canonical schema every later feature matrix must match.

use crate::artifacts::{ARTIFACT_SCHEMA_VERSION, Artifact};
use crate::config::SelectionCriterion;
use crate::error::{PreprocessingError, Result};
use crate::utils::{is_numeric_like, numeric_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Ordered list of feature columns the model is trained against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetainedColumns {
    schema_version: u32,
    run_id: String,
    columns: Vec<String>,
}

static_assertions::assert_impl_all!(RetainedColumns: Send, Sync);

impl Artifact for RetainedColumns {
    const KIND: &'static str = "columns_to_keep";

    fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn run_id(&self) -> &str {
        &self.run_id
    }
}

impl RetainedColumns {
    /// Build a retained set from explicit column names.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            run_id: String::new(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub(crate) fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    /// Column names in canonical order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Select exactly the retained columns, in order.
    ///
    /// Used on the training and holdout splits, which come from the same
    /// encoder and therefore must already contain every retained column.
    pub fn restrict(&self, df: &DataFrame) -> Result<DataFrame> {
        if let Some(missing) = self.columns.iter().find(|c| df.column(c).is_err()) {
            return Err(PreprocessingError::mismatch(
                Self::KIND,
                format!("retained column '{}' is absent", missing),
            ));
        }
        Ok(df.select(self.columns.iter().map(|c| c.as_str()))?)
    }
}

/// Pearson correlation over rows where both values are observed.
///
/// Returns `None` when fewer than two pairs exist or either side is constant.
pub fn pearson(x: &[Option<f64>], y: &[f64]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(xv, yv)| xv.filter(|v| v.is_finite()).map(|v| (v, *yv)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}

/// Picks the retained column set from training data.
pub struct FeatureSelector;

impl FeatureSelector {
    /// Score every numeric column against the target and keep the relevant ones.
    ///
    /// The target column itself is never retained, even if a caller left it
    /// in the feature matrix.
    pub fn select(
        x_train: &DataFrame,
        y_train: &[f64],
        target: &str,
        criterion: SelectionCriterion,
    ) -> Result<RetainedColumns> {
        if x_train.height() != y_train.len() {
            return Err(PreprocessingError::InvalidData(format!(
                "feature rows ({}) and target rows ({}) differ",
                x_train.height(),
                y_train.len()
            )));
        }

        let mut scored: Vec<(usize, String, f64)> = Vec::new();
        for (position, col) in x_train.get_columns().iter().enumerate() {
            let name = col.name().to_string();
            if name == target || !is_numeric_like(col.dtype()) {
                continue;
            }
            let values = numeric_values(col.as_materialized_series())?;
            match pearson(&values, y_train) {
                Some(r) => {
                    debug!("corr('{}', '{}') = {:.4}", name, target, r);
                    scored.push((position, name, r.abs()));
                }
                None => debug!("'{}' has no defined correlation; skipped", name),
            }
        }

        let mut kept: Vec<(usize, String, f64)> = match criterion {
            SelectionCriterion::Threshold(threshold) => scored
                .into_iter()
                .filter(|(_, _, score)| *score > threshold)
                .collect(),
            SelectionCriterion::TopK(k) => {
                scored.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));
                scored.truncate(k);
                scored
            }
        };
        kept.sort_by_key(|(position, _, _)| *position);

        if kept.is_empty() {
            return Err(PreprocessingError::NoFeaturesSelected(format!(
                "{:?}",
                criterion
            )));
        }

        let retained = RetainedColumns::new(kept.into_iter().map(|(_, name, _)| name));
        info!(
            "Retained {} of {} columns: {:?}",
            retained.len(),
            x_train.width(),
            retained.columns()
        );
        Ok(retained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn features() -> (DataFrame, Vec<f64>) {
        let df = df![
            "area" => [50.0, 80.0, 100.0, 120.0, 150.0, 200.0],
            "noise" => [1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
            "constant" => [3.0, 3.0, 3.0, 3.0, 3.0, 3.0],
            "city_Gent" => [0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            "label" => ["a", "b", "c", "d", "e", "f"],
        ]
        .unwrap();
        let y = vec![100.0, 160.0, 205.0, 240.0, 300.0, 410.0];
        (df, y)
    }

    #[test]
    fn test_pearson_perfect_and_undefined() {
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        assert!((pearson(&x, &[2.0, 4.0, 6.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &[6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(pearson(&[Some(1.0), Some(1.0)], &[1.0, 2.0]), None);
        assert_eq!(pearson(&[Some(1.0), None], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_threshold_keeps_relevant_columns_in_order() {
        let (df, y) = features();
        let retained =
            FeatureSelector::select(&df, &y, "price", SelectionCriterion::Threshold(0.5)).unwrap();
        assert_eq!(retained.columns(), &["area", "city_Gent"]);
    }

    #[test]
    fn test_top_k_keeps_best_columns_in_original_order() {
        let (df, y) = features();
        let retained =
            FeatureSelector::select(&df, &y, "price", SelectionCriterion::TopK(1)).unwrap();
        assert_eq!(retained.columns(), &["area"]);
    }

    #[test]
    fn test_target_is_never_retained() {
        let (mut df, y) = features();
        df.with_column(Series::new("price".into(), y.clone())).unwrap();
        let retained =
            FeatureSelector::select(&df, &y, "price", SelectionCriterion::Threshold(0.0)).unwrap();
        assert!(!retained.contains("price"));
    }

    #[test]
    fn test_empty_selection_is_error() {
        let (df, y) = features();
        let df = df.select(["noise", "constant"]).unwrap();
        let err = FeatureSelector::select(&df, &y, "price", SelectionCriterion::Threshold(0.9))
            .unwrap_err();
        assert!(matches!(err, PreprocessingError::NoFeaturesSelected(_)));
    }

    #[test]
    fn test_restrict_selects_exact_schema() {
        let (df, _) = features();
        let retained = RetainedColumns::new(["city_Gent", "area"]);
        let restricted = retained.restrict(&df).unwrap();
        assert_eq!(crate::utils::column_names(&restricted), vec!["city_Gent", "area"]);

        let missing = RetainedColumns::new(["area", "city_Brugge"]);
        assert!(missing.restrict(&df).unwrap_err().is_artifact_error());
    }
}
