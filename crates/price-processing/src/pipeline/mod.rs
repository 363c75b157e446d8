//! Pipeline module.
//!
//! Composes the preprocessing stages into the two paths a model needs: fitting
//! every artifact on a training dataset, and replaying the fitted artifacts on
//! new data.

mod preprocessor;
mod stage;

pub use preprocessor::{FittedPreprocessor, PreparedData};
pub use stage::PreprocessingStage;
