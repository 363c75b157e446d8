//! Property Price Preprocessing Library
//!
//! Train/predict-consistent preprocessing for tabular property data, built
//! with Rust and Polars.
//!
//! # Overview
//!
//! Every transformation that learns something from data is split into a
//! `fit` step, run once on the training split, and an immutable artifact that
//! is replayed on any later dataset:
//!
//! - **Cleaning**: structural drops, missing-value fill and domain encoding
//!   of `state_building` and `epc`, as a list of pure [`CleaningStep`]s
//! - **Split**: seeded, reproducible train/holdout partition
//! - **Encoding**: one-hot indicators from a fitted [`OneHotEncoder`]; unseen
//!   categories become all-zero rows
//! - **Selection**: correlation-based [`RetainedColumns`]
//! - **Imputation**: training-time statistics in a [`NumericImputer`]
//! - **Alignment**: [`align_to`] reindexes any dataset to the retained set
//! - **Artifacts**: versioned JSON documents in an [`ArtifactStore`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use price_processing::{FittedPreprocessor, FsArtifactStore, PipelineConfig};
//! use price_processing::config::MissingColumnPolicy;
//!
//! // Training
//! let config = PipelineConfig::builder()
//!     .target_column("price")
//!     .test_size(0.2)
//!     .build()?;
//! let (fitted, data) = FittedPreprocessor::fit(&properties, &config)?;
//! fitted.save(&FsArtifactStore::new("preprocessing"))?;
//!
//! // Prediction, possibly in another process
//! let fitted = FittedPreprocessor::load(&FsArtifactStore::new("preprocessing"))?;
//! let x_new = fitted.transform(&new_data, MissingColumnPolicy::Fail)?;
//! assert_eq!(x_new.width(), data.x_train.width());
//! ```
//!
//! # Configuration
//!
//! Use [`PipelineConfig`] to customize preprocessing behavior:
//!
//! ```rust,ignore
//! use price_processing::config::*;
//!
//! let config = PipelineConfig::builder()
//!     .drop_columns(["id", "listing_url"])
//!     .zero_fill_columns(["fl_terrace", "fl_garden", "fl_swimming_pool"])
//!     .domain_encoding(DomainEncoding::Indicator)
//!     .selection(SelectionCriterion::TopK(20))
//!     .numeric_imputation(NumericImputation::Mean)
//!     .build()?;
//! ```

pub mod alignment;
pub mod artifacts;
pub mod cleaner;
pub mod config;
pub mod encoding;
pub mod error;
pub mod imputation;
pub mod manifest;
pub mod pipeline;
pub mod selection;
pub mod split;
pub mod utils;

// Re-exports for convenient access
pub use alignment::align_to;
pub use artifacts::{ARTIFACT_SCHEMA_VERSION, Artifact, ArtifactStore, FsArtifactStore};
pub use cleaner::{Cleaner, CleaningPlan, CleaningStep, OrdinalScale};
pub use config::{
    ConfigValidationError, DomainEncoding, MissingColumnPolicy, NumericImputation,
    PipelineConfig, PipelineConfigBuilder, SelectionCriterion,
};
pub use encoding::OneHotEncoder;
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputation::NumericImputer;
pub use manifest::{ColumnKind, ColumnSchema, PreprocessingManifest};
pub use pipeline::{FittedPreprocessor, PreparedData, PreprocessingStage};
pub use selection::{FeatureSelector, RetainedColumns};
pub use split::{SplitData, train_test_split};
