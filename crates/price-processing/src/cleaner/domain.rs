//! Domain-knowledge encodings for the building state and energy label fields.
//!
//! Both fields carry a natural order (a new building is better than one to
//! renovate, an `A+` label is better than `G`), so the ordinal path maps them
//! onto fixed scales. The indicator path only normalises their labels.

use crate::error::{PreprocessingError, Result};
use crate::utils::{is_text_dtype, normalize_label, text_values};
use polars::prelude::*;

/// A fixed label → rank mapping for one categorical field.
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalScale {
    /// Column the scale applies to.
    pub column: &'static str,
    /// Normalised labels and their rank.
    pub levels: &'static [(&'static str, f64)],
    /// Rank used for missing and unrecognised labels.
    pub missing_code: f64,
}

impl OrdinalScale {
    /// Rank of a raw label (normalised before lookup).
    pub fn rank(&self, raw: Option<&str>) -> f64 {
        raw.map(normalize_label)
            .and_then(|label| {
                self.levels
                    .iter()
                    .find(|(level, _)| *level == label)
                    .map(|(_, rank)| *rank)
            })
            .unwrap_or(self.missing_code)
    }
}

/// Condition of the building, worst to best.
pub static STATE_BUILDING_SCALE: OrdinalScale = OrdinalScale {
    column: "state_building",
    levels: &[
        ("TO_REBUILD", 1.0),
        ("TO_RESTORE", 2.0),
        ("TO_RENOVATE", 3.0),
        ("TO_BE_DONE_UP", 4.0),
        ("GOOD", 5.0),
        ("JUST_RENOVATED", 6.0),
        ("AS_NEW", 7.0),
    ],
    missing_code: 0.0,
};

/// Energy performance certificate, worst to best.
pub static EPC_SCALE: OrdinalScale = OrdinalScale {
    column: "epc",
    levels: &[
        ("G", 1.0),
        ("F", 2.0),
        ("E", 3.0),
        ("D", 4.0),
        ("C", 5.0),
        ("B", 6.0),
        ("A", 7.0),
        ("A+", 8.0),
        ("A++", 9.0),
    ],
    missing_code: 0.0,
};

/// The fields covered by domain encoding.
pub fn domain_scales() -> [&'static OrdinalScale; 2] {
    [&STATE_BUILDING_SCALE, &EPC_SCALE]
}

fn ensure_text(series: &Series) -> Result<()> {
    if series.null_count() == series.len() || is_text_dtype(series.dtype()) {
        return Ok(());
    }
    Err(PreprocessingError::WrongColumnType {
        column: series.name().to_string(),
        expected: "text".to_string(),
        found: series.dtype().to_string(),
    })
}

/// Replace the scale's column with its `Float64` ranks.
pub(crate) fn encode_ordinal(series: &Series, scale: &OrdinalScale) -> Result<Series> {
    ensure_text(series)?;
    let ranks: Vec<f64> = text_values(series)?
        .iter()
        .map(|v| scale.rank(v.as_deref()))
        .collect();
    Ok(Series::new(series.name().clone(), ranks))
}

/// Normalise labels of a categorical column, filling nulls with `fill`.
pub(crate) fn normalize_labels(series: &Series, fill: &str) -> Result<Series> {
    ensure_text(series)?;
    let fill = normalize_label(fill);
    let labels: Vec<String> = text_values(series)?
        .iter()
        .map(|v| match v {
            Some(raw) => normalize_label(raw),
            None => fill.clone(),
        })
        .collect();
    Ok(Series::new(series.name().clone(), labels))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_normalises_labels() {
        assert_eq!(STATE_BUILDING_SCALE.rank(Some("as new")), 7.0);
        assert_eq!(STATE_BUILDING_SCALE.rank(Some("To-Renovate")), 3.0);
        assert_eq!(EPC_SCALE.rank(Some(" a+ ")), 8.0);
    }

    #[test]
    fn test_rank_missing_and_unknown() {
        assert_eq!(EPC_SCALE.rank(None), 0.0);
        assert_eq!(EPC_SCALE.rank(Some("MISSING")), 0.0);
        assert_eq!(EPC_SCALE.rank(Some("Z")), 0.0);
    }

    #[test]
    fn test_encode_ordinal_outputs_float_without_nulls() {
        let series = Series::new("epc".into(), &[Some("B"), None, Some("a++")]);
        let encoded = encode_ordinal(&series, &EPC_SCALE).unwrap();

        assert_eq!(encoded.dtype(), &DataType::Float64);
        assert_eq!(encoded.null_count(), 0);
        let values: Vec<f64> = encoded.f64().unwrap().into_no_null_iter().collect();
        assert_eq!(values, vec![6.0, 0.0, 9.0]);
    }

    #[test]
    fn test_encode_ordinal_rejects_numeric_column() {
        let series = Series::new("epc".into(), &[1.0, 2.0]);
        let err = encode_ordinal(&series, &EPC_SCALE).unwrap_err();
        assert!(err.is_schema_error());
    }

    #[test]
    fn test_normalize_labels_fills_nulls() {
        let series = Series::new("state_building".into(), &[Some("good"), None]);
        let normalized = normalize_labels(&series, "missing").unwrap();
        let values = text_values(&normalized).unwrap();
        assert_eq!(
            values,
            vec![Some("GOOD".to_string()), Some("MISSING".to_string())]
        );
    }
}
