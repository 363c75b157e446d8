//! Fit-once, apply-many preprocessing.
//!
//! [`FittedPreprocessor::fit`] runs cleaning, the split, encoder fitting,
//! feature selection and imputer fitting on a training dataset and returns the
//! fitted artifacts together with the ready-to-train matrices.
//! [`FittedPreprocessor::transform`] replays the same artifacts on new data
//! without refitting anything.

use super::PreprocessingStage;
use crate::alignment::align_to;
use crate::artifacts::{Artifact, ArtifactStore, new_run_id};
use crate::cleaner::{CleaningPlan, Cleaner};
use crate::config::{MissingColumnPolicy, PipelineConfig};
use crate::encoding::OneHotEncoder;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputation::NumericImputer;
use crate::manifest::PreprocessingManifest;
use crate::selection::{FeatureSelector, RetainedColumns};
use crate::split::train_test_split;
use polars::prelude::*;
use tracing::info;

/// Model-ready training and holdout data.
#[derive(Debug, Clone)]
pub struct PreparedData {
    /// Training features, columns exactly the retained set, no missing values.
    pub x_train: DataFrame,
    /// Holdout features, same columns as `x_train`.
    pub x_test: DataFrame,
    pub y_train: Vec<f64>,
    pub y_test: Vec<f64>,
}

/// Every artifact a training run fits, bundled for saving and replay.
#[derive(Debug, Clone)]
pub struct FittedPreprocessor {
    manifest: PreprocessingManifest,
    encoder: OneHotEncoder,
    retained: RetainedColumns,
    imputer: NumericImputer,
}

static_assertions::assert_impl_all!(FittedPreprocessor: Send, Sync);

impl FittedPreprocessor {
    /// Fit all preprocessing artifacts on a raw training dataset.
    ///
    /// Encoder, selection and imputer only ever see the training split; the
    /// holdout split is transformed with the fitted artifacts.
    pub fn fit(df: &DataFrame, config: &PipelineConfig) -> Result<(Self, PreparedData)> {
        config.validate()?;
        let target = config.target_column.as_str();
        info!("Fitting preprocessing on {:?}", df.shape());

        let plan = CleaningPlan::from_config(config);
        info!("Step 1: {}", PreprocessingStage::Cleaning);
        let cleaned = Cleaner::clean(df, &plan.steps(), config.missing_column_policy)
            .context(PreprocessingStage::Cleaning.context())?;
        let manifest = PreprocessingManifest::from_cleaned(&cleaned, target, plan)
            .context(PreprocessingStage::Cleaning.context())?;

        info!("Step 2: {}", PreprocessingStage::Splitting);
        let split = train_test_split(&cleaned, target, config.test_size, config.random_seed)
            .context(PreprocessingStage::Splitting.context())?;

        info!("Step 3: {}", PreprocessingStage::Encoding);
        let encoder =
            OneHotEncoder::fit(&split.x_train).context(PreprocessingStage::Encoding.context())?;
        let x_train = encoder
            .transform(&split.x_train)
            .context(PreprocessingStage::Encoding.context())?;
        let x_test = encoder
            .transform(&split.x_test)
            .context(PreprocessingStage::Encoding.context())?;

        info!("Step 4: {}", PreprocessingStage::Selection);
        let retained = FeatureSelector::select(&x_train, &split.y_train, target, config.selection)
            .context(PreprocessingStage::Selection.context())?;
        let x_train = retained
            .restrict(&x_train)
            .context(PreprocessingStage::Selection.context())?;
        let x_test = retained
            .restrict(&x_test)
            .context(PreprocessingStage::Selection.context())?;

        info!("Step 5: {}", PreprocessingStage::Imputation);
        let imputer = NumericImputer::fit(&x_train, config.numeric_imputation)
            .context(PreprocessingStage::Imputation.context())?;
        let x_train = imputer
            .transform(&x_train)
            .context(PreprocessingStage::Imputation.context())?;
        let x_test = imputer
            .transform(&x_test)
            .context(PreprocessingStage::Imputation.context())?;

        info!(
            "Preprocessing fitted: train {:?}, holdout {:?}",
            x_train.shape(),
            x_test.shape()
        );

        let run_id = new_run_id();
        info!("Preprocessing run {}", run_id);
        let fitted = Self {
            manifest: manifest.with_run_id(&run_id),
            encoder: encoder.with_run_id(&run_id),
            retained: retained.with_run_id(&run_id),
            imputer: imputer.with_run_id(&run_id),
        };
        let data = PreparedData {
            x_train,
            x_test,
            y_train: split.y_train,
            y_test: split.y_test,
        };
        Ok((fitted, data))
    }

    /// Load every preprocessing artifact from a store.
    ///
    /// All four must come from the same training run.
    pub fn load<S: ArtifactStore>(store: &S) -> Result<Self> {
        let fitted = Self {
            manifest: store.load(PreprocessingManifest::KIND)?,
            encoder: store.load(OneHotEncoder::KIND)?,
            retained: store.load(RetainedColumns::KIND)?,
            imputer: store.load(NumericImputer::KIND)?,
        };

        let run_id = fitted.run_id();
        for (kind, other) in [
            (OneHotEncoder::KIND, fitted.encoder.run_id()),
            (RetainedColumns::KIND, fitted.retained.run_id()),
            (NumericImputer::KIND, fitted.imputer.run_id()),
        ] {
            if other != run_id {
                return Err(PreprocessingError::mismatch(
                    kind,
                    format!(
                        "written by training run '{}' but the manifest is from run '{}'",
                        other, run_id
                    ),
                ));
            }
        }
        Ok(fitted)
    }

    /// Persist every preprocessing artifact under its standard key.
    ///
    /// The manifest is written last.
    pub fn save<S: ArtifactStore>(&self, store: &S) -> Result<()> {
        store.save(OneHotEncoder::KIND, &self.encoder)?;
        store.save(RetainedColumns::KIND, &self.retained)?;
        store.save(NumericImputer::KIND, &self.imputer)?;
        store.save(PreprocessingManifest::KIND, &self.manifest)?;
        Ok(())
    }

    /// Training run shared by every artifact.
    pub fn run_id(&self) -> &str {
        self.manifest.run_id()
    }

    pub fn manifest(&self) -> &PreprocessingManifest {
        &self.manifest
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn retained(&self) -> &RetainedColumns {
        &self.retained
    }

    pub fn imputer(&self) -> &NumericImputer {
        &self.imputer
    }

    /// Turn a raw dataset into a model-ready matrix with the fitted artifacts.
    ///
    /// The target column is dropped if present. Cleaning follows the plan
    /// recorded at training time; `policy` only decides what happens when a
    /// column a cleaning rule needs is absent.
    pub fn transform(&self, df: &DataFrame, policy: MissingColumnPolicy) -> Result<DataFrame> {
        let target = self.manifest.target_column();
        let df = if df.column(target).is_ok() {
            info!("Dropping target column '{}' from new data", target);
            df.drop(target)?
        } else {
            df.clone()
        };

        let df = self
            .manifest
            .retype_empty_columns(&df)
            .context(PreprocessingStage::Conforming.context())?;
        let cleaned = Cleaner::clean(&df, &self.manifest.cleaning().steps(), policy)
            .context(PreprocessingStage::Cleaning.context())?;
        let conformed = self
            .manifest
            .conform(&cleaned)
            .context(PreprocessingStage::Conforming.context())?;
        let encoded = self
            .encoder
            .transform(&conformed)
            .context(PreprocessingStage::Encoding.context())?;
        let aligned =
            align_to(&encoded, &self.retained).context(PreprocessingStage::Alignment.context())?;
        let imputed = self
            .imputer
            .transform(&aligned)
            .context(PreprocessingStage::Imputation.context())?;

        info!("Transformed {:?} -> {:?}", df.shape(), imputed.shape());
        Ok(imputed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::FsArtifactStore;
    use crate::utils::{column_names, numeric_values};
    use pretty_assertions::assert_eq;

    fn training_data() -> DataFrame {
        let n = 20;
        let area: Vec<Option<f64>> = (0..n)
            .map(|i| if i == 3 { None } else { Some(60.0 + 10.0 * i as f64) })
            .collect();
        let city: Vec<&str> = (0..n).map(|i| if i % 2 == 0 { "Gent" } else { "Leuven" }).collect();
        let epc: Vec<&str> = (0..n).map(|i| ["A", "B", "C", "D"][i % 4]).collect();
        let state: Vec<&str> = (0..n).map(|_| "GOOD").collect();
        let price: Vec<f64> = (0..n)
            .map(|i| 100_000.0 + 2_000.0 * i as f64 + if i % 2 == 0 { 50_000.0 } else { 0.0 })
            .collect();
        let id: Vec<i64> = (0..n as i64).collect();

        df![
            "id" => id,
            "area" => area,
            "city" => city,
            "epc" => epc,
            "state_building" => state,
            "price" => price,
        ]
        .unwrap()
    }

    #[test]
    fn test_fit_produces_model_ready_matrices() {
        let config = PipelineConfig::default();
        let (fitted, data) = FittedPreprocessor::fit(&training_data(), &config).unwrap();

        let retained = fitted.retained().columns().to_vec();
        assert!(!retained.contains(&"price".to_string()));
        assert!(!retained.contains(&"id".to_string()));
        assert_eq!(column_names(&data.x_train), retained);
        assert_eq!(column_names(&data.x_test), retained);
        assert_eq!(data.x_train.height(), data.y_train.len());
        assert_eq!(data.x_test.height(), data.y_test.len());
        assert_eq!(data.x_train.height() + data.x_test.height(), 20);

        for col in data.x_train.get_columns() {
            assert_eq!(col.null_count(), 0, "column {} has nulls", col.name());
        }
    }

    #[test]
    fn test_transform_matches_retained_schema() {
        let config = PipelineConfig::default();
        let (fitted, _) = FittedPreprocessor::fit(&training_data(), &config).unwrap();

        let new_data = df![
            "area" => [Some(95.0), None],
            "city" => ["Brugge", "Gent"],
            "epc" => ["a", "Z"],
            "state_building" => ["good", "good"],
            "garage" => [1.0, 0.0],
        ]
        .unwrap();

        let x = fitted.transform(&new_data, MissingColumnPolicy::Fail).unwrap();
        assert_eq!(column_names(&x), fitted.retained().columns().to_vec());
        for col in x.get_columns() {
            assert_eq!(col.null_count(), 0);
        }

        if fitted.retained().contains("city_Gent") {
            let gent =
                numeric_values(x.column("city_Gent").unwrap().as_materialized_series()).unwrap();
            assert_eq!(gent, vec![Some(0.0), Some(1.0)]);
        }
        if fitted.retained().contains("area") {
            let area = numeric_values(x.column("area").unwrap().as_materialized_series()).unwrap();
            assert_eq!(area[1], fitted.imputer().statistic("area"));
        }
    }

    #[test]
    fn test_transform_drops_target_column() {
        let config = PipelineConfig::default();
        let data = training_data();
        let (fitted, _) = FittedPreprocessor::fit(&data, &config).unwrap();

        let with_target = fitted.transform(&data, MissingColumnPolicy::Fail).unwrap();
        let without_target = fitted
            .transform(&data.drop("price").unwrap(), MissingColumnPolicy::Fail)
            .unwrap();

        assert!(with_target.equals_missing(&without_target));
    }

    #[test]
    fn test_save_and_load_replays_identically() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let config = PipelineConfig::default();
        let data = training_data();

        let (fitted, _) = FittedPreprocessor::fit(&data, &config).unwrap();
        fitted.save(&store).unwrap();
        let loaded = FittedPreprocessor::load(&store).unwrap();

        let a = fitted.transform(&data, MissingColumnPolicy::Fail).unwrap();
        let b = loaded.transform(&data, MissingColumnPolicy::Fail).unwrap();
        assert!(a.equals_missing(&b));
        assert_eq!(loaded.manifest(), fitted.manifest());
    }

    #[test]
    fn test_all_artifacts_share_the_run_id() {
        let (fitted, _) =
            FittedPreprocessor::fit(&training_data(), &PipelineConfig::default()).unwrap();

        assert!(!fitted.run_id().is_empty());
        assert_eq!(fitted.encoder().run_id(), fitted.run_id());
        assert_eq!(fitted.retained().run_id(), fitted.run_id());
        assert_eq!(fitted.imputer().run_id(), fitted.run_id());
    }

    #[test]
    fn test_load_rejects_artifacts_from_different_runs() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let data = training_data();

        let (first, _) = FittedPreprocessor::fit(&data, &PipelineConfig::default()).unwrap();
        let (second, _) = FittedPreprocessor::fit(&data, &PipelineConfig::default()).unwrap();
        assert_ne!(first.run_id(), second.run_id());

        first.save(&store).unwrap();
        store.save(NumericImputer::KIND, second.imputer()).unwrap();

        let err = FittedPreprocessor::load(&store).unwrap_err();
        assert_eq!(err.error_code(), "ARTIFACT_MISMATCH");
        assert!(err.to_string().contains(NumericImputer::KIND));
    }

    #[test]
    fn test_transform_fills_numeric_column_read_as_empty_text() {
        let config = PipelineConfig::default();
        let (fitted, _) = FittedPreprocessor::fit(&training_data(), &config).unwrap();

        // CSV readers type a column with no values as text
        let new_data = df![
            "area" => [Option::<&str>::None, None],
            "city" => ["Gent", "Leuven"],
            "epc" => ["A", "B"],
            "state_building" => ["GOOD", "GOOD"],
        ]
        .unwrap();

        let x = fitted.transform(&new_data, MissingColumnPolicy::Fail).unwrap();
        assert_eq!(column_names(&x), fitted.retained().columns().to_vec());
        if fitted.retained().contains("area") {
            let area = numeric_values(x.column("area").unwrap().as_materialized_series()).unwrap();
            let median = fitted.imputer().statistic("area");
            assert_eq!(area, vec![median, median]);
        }
    }

    #[test]
    fn test_transform_missing_required_column_is_schema_error() {
        let config = PipelineConfig::default();
        let (fitted, _) = FittedPreprocessor::fit(&training_data(), &config).unwrap();

        let new_data = df![
            "area" => [95.0],
            "city" => ["Gent"],
            "state_building" => ["GOOD"],
        ]
        .unwrap();

        let err = fitted
            .transform(&new_data, MissingColumnPolicy::Fail)
            .unwrap_err();
        assert!(err.is_schema_error());
        assert!(err.to_string().contains("cleaning data stage"));
    }
}
