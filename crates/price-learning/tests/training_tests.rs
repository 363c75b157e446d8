//! End-to-end tests: train on a synthetic property dataset, persist the
//! artifacts and predict on new listings from disk.

use polars::prelude::*;
use price_learning::{
    Algorithm, LearningError, MissingColumnPolicy, PredictionDriver, TrainedPipeline,
    TrainingConfig, TrainingDriver, read_csv, write_predictions,
};
use price_processing::{DomainEncoding, PipelineConfig};
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const CITIES: [&str; 4] = ["Gent", "Leuven", "Antwerpen", "Brugge"];
const EPC: [&str; 6] = ["A", "B", "C", "D", "E", "F"];
const STATES: [&str; 4] = ["GOOD", "AS_NEW", "TO_RENOVATE", "JUST_RENOVATED"];

/// 100 listings; every 20th row (5%) has an unknown city and no area.
fn synthetic_properties() -> DataFrame {
    let n = 100;
    let mut id = Vec::with_capacity(n);
    let mut area = Vec::with_capacity(n);
    let mut city = Vec::with_capacity(n);
    let mut epc = Vec::with_capacity(n);
    let mut state = Vec::with_capacity(n);
    let mut price = Vec::with_capacity(n);

    for i in 0..n {
        let unknown = i % 20 == 7;
        let a = 50.0 + ((i * 53) % 250) as f64;
        let c = if unknown { "Unknown" } else { CITIES[i % 4] };
        let e = (i * 7) % 6;
        let noise = (((i * 37) % 11) as f64 - 5.0) * 1000.0;
        let city_bonus = match c {
            "Gent" => 30_000.0,
            "Leuven" => 40_000.0,
            "Antwerpen" => 20_000.0,
            _ => 0.0,
        };

        id.push(i as i64);
        area.push(if unknown { None } else { Some(a) });
        city.push(c);
        epc.push(EPC[e]);
        state.push(STATES[(i / 3) % 4]);
        price.push(1500.0 * a + city_bonus + (6 - e) as f64 * 5_000.0 + noise);
    }

    df![
        "id" => id,
        "area" => area,
        "city" => city,
        "state_building" => state,
        "epc" => epc,
        "price" => price,
    ]
    .unwrap()
}

fn new_listings() -> DataFrame {
    df![
        "id" => [1001i64, 1002, 1003],
        "area" => [Some(120.0), None, Some(210.0)],
        "city" => ["Gent", "Namur", "Leuven"],
        "state_building" => ["good", "as new", "To renovate"],
        "epc" => ["B", "A", "G"],
        "price" => [0.0, 0.0, 0.0],
    ]
    .unwrap()
}

fn config(algorithm: Algorithm, dir: &TempDir, encoding: DomainEncoding) -> TrainingConfig {
    TrainingConfig::builder()
        .algorithm(algorithm)
        .n_estimators(30)
        .preprocessing(
            PipelineConfig::builder()
                .domain_encoding(encoding)
                .build()
                .unwrap(),
        )
        .preprocessing_dir(dir.path().join("preprocessing"))
        .models_dir(dir.path().join("saved_models"))
        .build()
        .unwrap()
}

fn json_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|x| x == "json"))
                .count()
        })
        .unwrap_or(0)
}

// ============================================================================
// Training
// ============================================================================

#[test]
fn test_random_forest_train_and_predict() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(Algorithm::RandomForest, &dir, DomainEncoding::Ordinal);
    let report = TrainingDriver::new(config).run(&synthetic_properties()).unwrap();

    assert_eq!(report.model_name, "random_forest_model");
    assert_eq!(report.n_train + report.n_test, 100);
    assert_eq!(report.n_test, 20);
    assert!(report.metrics.mse.is_finite() && report.metrics.mse >= 0.0);
    assert!(report.metrics.r2.is_finite());
    assert!(report.features.iter().any(|f| f == "area"));
    assert!(!report.features.iter().any(|f| f == "price" || f == "id"));

    assert_eq!(report.artifacts.len(), 5);
    assert!(report.artifacts.iter().all(|p| p.exists()));
    assert_eq!(json_files(&dir.path().join("preprocessing")), 4);
    assert!(dir.path().join("saved_models/random_forest_model.json").exists());

    let driver = PredictionDriver::new(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "random_forest_model",
    );
    let predictions = driver.run(&new_listings()).unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions.iter().all(|p| p.is_finite() && *p > 0.0));
}

#[test]
fn test_gradient_boosting_learns_the_signal() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(Algorithm::GradientBoosting, &dir, DomainEncoding::Ordinal);
    let report = TrainingDriver::new(config).run(&synthetic_properties()).unwrap();

    assert_eq!(report.model_name, "gradient_boosting_model");
    assert!(report.metrics.r2 > 0.0, "r2 = {}", report.metrics.r2);
    assert!(report.metrics.rmse <= report.metrics.mse.sqrt() + 1e-9);
    assert!(report.metrics.mae <= report.metrics.rmse + 1e-9);

    let pipeline = TrainedPipeline::load(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "gradient_boosting_model",
    )
    .unwrap();
    assert_eq!(pipeline.model().algorithm(), Algorithm::GradientBoosting);
    assert_eq!(
        pipeline.model().feature_names(),
        pipeline.preprocessor().retained().columns()
    );
}

#[test]
fn test_training_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let driver = TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Ordinal,
    ));
    let df = synthetic_properties();

    let a = driver.fit(&df).unwrap();
    let b = driver.fit(&df).unwrap();
    let listings = new_listings();
    assert_eq!(
        a.pipeline.predict(&listings, MissingColumnPolicy::Fail).unwrap(),
        b.pipeline.predict(&listings, MissingColumnPolicy::Fail).unwrap()
    );
    assert!(!dir.path().join("preprocessing").exists());
}

#[test]
fn test_missing_target_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let df = synthetic_properties().drop("price").unwrap();
    let err = TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&df)
    .unwrap_err();

    assert!(matches!(err, LearningError::TargetNotFound(ref t) if t == "price"));
    assert!(!dir.path().join("preprocessing").exists());
    assert!(!dir.path().join("saved_models").exists());
}

#[test]
fn test_preprocessing_failure_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let df = synthetic_properties().drop("epc").unwrap();
    let err = TrainingDriver::new(config(
        Algorithm::GradientBoosting,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&df)
    .unwrap_err();

    assert!(err.is_schema_error());
    assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    assert_eq!(json_files(&dir.path().join("preprocessing")), 0);
    assert_eq!(json_files(&dir.path().join("saved_models")), 0);
}

#[test]
fn test_invalid_config_is_rejected_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(Algorithm::RandomForest, &dir, DomainEncoding::Ordinal);
    config.n_estimators = 0;

    let err = TrainingDriver::new(config)
        .run(&synthetic_properties())
        .unwrap_err();
    assert!(matches!(err, LearningError::InvalidConfig(_)));
}

// ============================================================================
// Prediction
// ============================================================================

#[test]
fn test_prediction_replays_indicator_encoding() {
    let dir = tempfile::tempdir().unwrap();
    TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Indicator,
    ))
    .run(&synthetic_properties())
    .unwrap();

    let pipeline = TrainedPipeline::load(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "random_forest_model",
    )
    .unwrap();
    assert_eq!(
        pipeline.preprocessor().manifest().domain_encoding(),
        DomainEncoding::Indicator
    );

    let predictions = pipeline
        .predict(&new_listings(), MissingColumnPolicy::Fail)
        .unwrap();
    assert_eq!(predictions.len(), 3);
}

#[test]
fn test_prediction_without_target_matches_with_target() {
    let dir = tempfile::tempdir().unwrap();
    let run = TrainingDriver::new(config(
        Algorithm::GradientBoosting,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .fit(&synthetic_properties())
    .unwrap();

    let with_target = new_listings();
    let without_target = with_target.drop("price").unwrap();
    assert_eq!(
        run.pipeline
            .predict(&with_target, MissingColumnPolicy::Fail)
            .unwrap(),
        run.pipeline
            .predict(&without_target, MissingColumnPolicy::Fail)
            .unwrap()
    );
}

#[test]
fn test_missing_column_policy_at_prediction() {
    let dir = tempfile::tempdir().unwrap();
    TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&synthetic_properties())
    .unwrap();

    let listings = new_listings().drop("epc").unwrap();
    let driver = PredictionDriver::new(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "random_forest_model",
    );

    let err = driver.run(&listings).unwrap_err();
    assert!(err.is_schema_error());

    let predictions = driver
        .missing_column_policy(MissingColumnPolicy::Skip)
        .run(&listings)
        .unwrap();
    assert_eq!(predictions.len(), 3);
}

#[test]
fn test_retraining_another_algorithm_invalidates_the_older_model() {
    let dir = tempfile::tempdir().unwrap();
    let df = synthetic_properties();
    TrainingDriver::new(config(Algorithm::RandomForest, &dir, DomainEncoding::Ordinal))
        .run(&df)
        .unwrap();
    TrainingDriver::new(config(
        Algorithm::GradientBoosting,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&df)
    .unwrap();

    let preprocessing = dir.path().join("preprocessing");
    let models = dir.path().join("saved_models");

    // The shared preprocessing artifacts now belong to the boosting run
    let err = PredictionDriver::new(&preprocessing, &models, "random_forest_model")
        .run(&new_listings())
        .unwrap_err();
    assert_eq!(err.error_code(), "ARTIFACT_MISMATCH");
    assert!(err.is_schema_error());
    assert!(err.to_string().contains("random_forest_model"));

    let predictions = PredictionDriver::new(&preprocessing, &models, "gradient_boosting_model")
        .run(&new_listings())
        .unwrap();
    assert_eq!(predictions.len(), 3);
}

#[test]
fn test_prediction_without_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let err = PredictionDriver::new(dir.path(), dir.path(), "random_forest_model")
        .run(&new_listings())
        .unwrap_err();
    assert_eq!(err.error_code(), "ARTIFACT_NOT_FOUND");
    assert!(err.is_schema_error());
}

#[test]
fn test_predictions_csv_from_csv_input() {
    let dir = tempfile::tempdir().unwrap();
    TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&synthetic_properties())
    .unwrap();

    let input = dir.path().join("newdata.csv");
    std::fs::write(
        &input,
        "id,area,city,state_building,epc\n\
         1,95,Gent,GOOD,C\n\
         2,,Mons,,\n",
    )
    .unwrap();

    let df = read_csv(&input).unwrap();
    let predictions = PredictionDriver::new(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "random_forest_model",
    )
    .run(&df)
    .unwrap();

    let output = dir.path().join("output_data/predictions.csv");
    write_predictions(&output, &predictions).unwrap();

    let written = read_csv(&output).unwrap();
    assert_eq!(written.shape(), (2, 1));
    assert_eq!(written.get_column_names()[0].as_str(), "PredictedPrice");
}

#[test]
fn test_csv_batch_with_an_empty_numeric_column() {
    let dir = tempfile::tempdir().unwrap();
    TrainingDriver::new(config(
        Algorithm::RandomForest,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&synthetic_properties())
    .unwrap();

    // Nobody filled in `area`, so the CSV reader cannot tell it is numeric
    let input = dir.path().join("newdata.csv");
    std::fs::write(
        &input,
        "area,city,state_building,epc\n\
         ,Gent,GOOD,A\n\
         ,Leuven,GOOD,B\n",
    )
    .unwrap();
    let from_csv = read_csv(&input).unwrap();

    let typed = df![
        "area" => [Option::<f64>::None, None],
        "city" => ["Gent", "Leuven"],
        "state_building" => ["GOOD", "GOOD"],
        "epc" => ["A", "B"],
    ]
    .unwrap();

    let pipeline = TrainedPipeline::load(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "random_forest_model",
    )
    .unwrap();
    let predictions = pipeline
        .predict(&from_csv, MissingColumnPolicy::Fail)
        .unwrap();

    assert_eq!(predictions.len(), 2);
    assert!(predictions.iter().all(|p| p.is_finite()));
    assert_eq!(
        predictions,
        pipeline.predict(&typed, MissingColumnPolicy::Fail).unwrap()
    );
}

#[test]
fn test_single_row_csv_with_empty_cells() {
    let dir = tempfile::tempdir().unwrap();
    TrainingDriver::new(config(
        Algorithm::GradientBoosting,
        &dir,
        DomainEncoding::Ordinal,
    ))
    .run(&synthetic_properties())
    .unwrap();

    let input = dir.path().join("newdata.csv");
    std::fs::write(&input, "id,area,city,state_building,epc\n7,,Brugge,,\n").unwrap();

    let predictions = PredictionDriver::new(
        dir.path().join("preprocessing"),
        dir.path().join("saved_models"),
        "gradient_boosting_model",
    )
    .run(&read_csv(&input).unwrap())
    .unwrap();

    assert_eq!(predictions.len(), 1);
    assert!(predictions[0].is_finite());
}
