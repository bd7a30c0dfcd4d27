//! Random forest regressor
//!
//! Each tree sees a bootstrap sample drawn with its own seed
//! (`seed + tree index`), so the ensemble is reproducible tree by tree.

use salarium_core::config::ForestConfig;
use salarium_core::models::normalize_importances;
use salarium_core::{ForestModel, TrainedModel};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{check_shapes, Result, TrainerError};
use crate::regressor::Regressor;

/// Bagged CART ensemble trainer
pub struct ForestTrainer {
    config: ForestConfig,
    seed: u64,
}

impl ForestTrainer {
    pub fn new(config: ForestConfig, seed: u64) -> Self {
        Self { config, seed }
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: self.config.min_samples_split,
            min_samples_leaf: self.config.min_samples_leaf,
            min_child_weight: 0.0,
            lambda: 0.0,
            min_split_gain: 0.0,
            max_features: self.config.max_features,
        }
    }

    pub fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<ForestModel> {
        check_shapes(features, targets)?;
        if self.config.n_estimators == 0 {
            return Err(TrainerError::Training(
                "random forest needs at least one tree".to_string(),
            ));
        }

        let n_samples = features.len();
        // Squared-error trees: leaf = mean target, gain = variance reduction
        let gradients: Vec<f64> = targets.iter().map(|y| -y).collect();
        let hessians = vec![1.0; n_samples];
        let builder = CartBuilder::new(features, &gradients, &hessians, self.tree_config())?;

        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut total_gains = vec![0.0; features[0].len()];

        for tree_idx in 0..self.config.n_estimators {
            let mut rng = LcgRng::new(self.seed.wrapping_add(tree_idx as u64));
            let indices: Vec<usize> = if self.config.bootstrap {
                (0..n_samples).map(|_| rng.next_range(n_samples)).collect()
            } else {
                (0..n_samples).collect()
            };

            let grown = builder.build_on(indices, &mut rng);
            for (total, gain) in total_gains.iter_mut().zip(&grown.split_gains) {
                *total += gain;
            }
            debug!(
                tree = tree_idx + 1,
                leaves = grown.tree.leaf_count(),
                "Grew forest tree"
            );
            trees.push(grown.tree);
        }

        Ok(ForestModel {
            trees,
            feature_importances: normalize_importances(&total_gains),
        })
    }
}

impl Regressor for ForestTrainer {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedModel> {
        self.train(features, targets).map(TrainedModel::Forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 10) as f64, (i % 3) as f64])
            .collect();
        let targets: Vec<f64> = features
            .iter()
            .map(|row| if row[0] < 5.0 { 50_000.0 } else { 120_000.0 })
            .collect();
        (features, targets)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_forest_learns_step() {
        let (features, targets) = step_data();
        let model = ForestTrainer::new(small_config(), 42)
            .train(&features, &targets)
            .unwrap();

        assert_eq!(model.trees.len(), 10);
        assert!((model.predict_row(&[1.0, 0.0]) - 50_000.0).abs() < 1.0);
        assert!((model.predict_row(&[8.0, 0.0]) - 120_000.0).abs() < 1.0);
    }

    #[test]
    fn test_importances_favor_informative_feature() {
        let (features, targets) = step_data();
        let model = ForestTrainer::new(small_config(), 42)
            .train(&features, &targets)
            .unwrap();

        let total: f64 = model.feature_importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(model.feature_importances[0] > model.feature_importances[1]);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let (features, targets) = step_data();
        let a = ForestTrainer::new(small_config(), 7).train(&features, &targets).unwrap();
        let b = ForestTrainer::new(small_config(), 7).train(&features, &targets).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_row() {
        let model = ForestTrainer::new(small_config(), 1)
            .train(&[vec![1.0, 2.0]], &[90_000.0])
            .unwrap();
        assert_eq!(model.predict_row(&[5.0, 5.0]), 90_000.0);
    }
}
