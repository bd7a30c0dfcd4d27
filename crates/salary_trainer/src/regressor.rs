//! Common fitting interface for the four regressors

use salarium_core::{ModelKind, SalariumConfig, TrainedModel};

use crate::errors::Result;
use crate::forest::ForestTrainer;
use crate::gbdt::GbdtTrainer;
use crate::hist_gbdt::HistGbdtTrainer;
use crate::linear::LinearTrainer;

/// A trainer that turns a feature matrix and targets into a fitted model
pub trait Regressor {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedModel>;
}

/// Trainer for `kind`, configured from the matching config section
pub fn regressor_for(kind: ModelKind, config: &SalariumConfig) -> Box<dyn Regressor> {
    let seed = config.training.seed;
    match kind {
        ModelKind::RandomForest => Box::new(ForestTrainer::new(config.forest.clone(), seed)),
        ModelKind::HistGradientBoosting => Box::new(HistGbdtTrainer::new(config.hist_gbdt.clone())),
        ModelKind::GradientBoosting => Box::new(GbdtTrainer::new(config.gbdt.clone())),
        ModelKind::LinearRegression => Box::new(LinearTrainer::new(config.linear.clone())),
    }
}
