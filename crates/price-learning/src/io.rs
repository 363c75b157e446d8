//! CSV input and prediction output.

use crate::error::{LearningError, Result};
use polars::io::csv::read::{CsvParseOptions, CsvReadOptions};
use polars::prelude::*;
use price_processing::artifacts::write_atomically;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Header of the single column written by [`write_predictions`].
pub const PREDICTION_COLUMN: &str = "PredictedPrice";

/// Read a CSV file with a header row.
///
/// Retries without quote handling if the first parse fails.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(LearningError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input file not found: {}", path.display()),
        )));
    }

    let quoted = CsvReadOptions::default()
        .with_infer_schema_length(Some(1000))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish();

    let df = match quoted {
        Ok(df) => df,
        Err(e) => {
            debug!("Standard CSV parse failed, retrying without quotes: {}", e);
            CsvReadOptions::default()
                .with_infer_schema_length(Some(1000))
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_quote_char(None))
                .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
                .finish()?
        }
    };

    info!("Loaded {} with shape {:?}", path.display(), df.shape());
    Ok(df)
}

/// Write predictions as a one-column CSV with a header.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failure never leaves a partial output file.
pub fn write_predictions(path: impl AsRef<Path>, predictions: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let mut df = DataFrame::new(vec![Column::new(PREDICTION_COLUMN.into(), predictions)])?;

    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;

    write_atomically(path, &buffer)?;
    info!(
        "Predictions for {} rows saved to {}",
        predictions.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_write_predictions_single_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/predictions.csv");

        write_predictions(&path, &[250000.0, 199500.5]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "PredictedPrice");
        assert_eq!(lines.len(), 3);
        assert!(!dir.path().join("out/predictions.csv.tmp").exists());

        let df = read_csv(&path).unwrap();
        assert_eq!(df.shape(), (2, 1));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_csv("does/not/exist.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_read_csv_with_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "area,city\n100,Gent\n,\"Leuven\"\n").unwrap();

        let df = read_csv(&path).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("area").unwrap().null_count(), 1);
    }
}
