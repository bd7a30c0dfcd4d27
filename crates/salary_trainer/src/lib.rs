//! Salarium trainer - deterministic salary regressors
//!
//! Fits the four supported regressors on a cleaned dataset, scores them on
//! a seeded hold-out split and serves predictions from cached artifacts.
//! Identical data, configuration and seed always give identical models.

pub mod cache;
pub mod cart;
pub mod deterministic;
pub mod errors;
pub mod forest;
pub mod gbdt;
pub mod hist_gbdt;
pub mod linear;
pub mod pipeline;
pub mod regressor;
pub mod service;
pub mod split;

use salarium_core::{SalariumConfig, SalaryDataset, TrainedArtifacts};
use std::path::Path;

pub use cache::{ArtifactCache, CacheStats};
pub use deterministic::{LcgRng, SplitTieBreaker};
pub use errors::{Result, TrainerError};
pub use forest::ForestTrainer;
pub use gbdt::GbdtTrainer;
pub use hist_gbdt::{BinCuts, HistGbdtTrainer};
pub use linear::LinearTrainer;
pub use pipeline::{rescore, TrainingPipeline};
pub use regressor::{regressor_for, Regressor};
pub use service::{PredictionResponse, SalaryInsights};
pub use split::{train_test_split, TrainTestSplit};

/// Load a CSV dataset and train every model with the given configuration.
pub fn train_from_csv(path: &Path, config: SalariumConfig) -> Result<TrainedArtifacts> {
    let dataset = SalaryDataset::from_csv(path, config.dataset.max_salary)?;
    TrainingPipeline::new(config)?.train(&dataset)
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
