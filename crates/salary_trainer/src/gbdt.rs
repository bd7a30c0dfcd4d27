//! Gradient Boosted Decision Tree (GBDT) trainer
//!
//! Reference boosting: depth-wise trees with exact-greedy splits, second
//! order leaf weights and L2 regularization on squared-error loss.

use salarium_core::config::GbdtConfig;
use salarium_core::models::normalize_importances;
use salarium_core::{BoostedModel, TrainedModel, Tree};
use tracing::debug;

use crate::cart::{CartBuilder, TreeConfig};
use crate::deterministic::LcgRng;
use crate::errors::{check_shapes, Result};
use crate::regressor::Regressor;

/// GBDT trainer
pub struct GbdtTrainer {
    config: GbdtConfig,
}

impl GbdtTrainer {
    pub fn new(config: GbdtConfig) -> Self {
        Self { config }
    }

    /// Train a boosted model on the given rows
    pub fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<BoostedModel> {
        check_shapes(features, targets)?;

        let base_score = calculate_bias(targets);
        let mut predictions = vec![base_score; targets.len()];
        let hessians = vec![1.0; targets.len()];
        let mut total_gains = vec![0.0; features[0].len()];

        let tree_config = TreeConfig {
            max_depth: Some(self.config.max_depth),
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: self.config.min_child_weight,
            lambda: self.config.reg_lambda,
            min_split_gain: self.config.min_split_gain,
            max_features: None,
        };
        // No feature sampling, so the generator is never advanced
        let mut rng = LcgRng::new(0);

        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for tree_idx in 0..self.config.n_estimators {
            let gradients = calculate_gradients(targets, &predictions);

            let builder = CartBuilder::new(features, &gradients, &hessians, tree_config.clone())?;
            let grown = builder.build(&mut rng);

            for (total, gain) in total_gains.iter_mut().zip(&grown.split_gains) {
                *total += gain;
            }
            self.update_predictions(&grown.tree, features, &mut predictions);

            debug!(
                tree = tree_idx + 1,
                total = self.config.n_estimators,
                leaves = grown.tree.leaf_count(),
                "Boosting round complete"
            );
            trees.push(grown.tree);
        }

        Ok(BoostedModel {
            base_score,
            learning_rate: self.config.learning_rate,
            trees,
            feature_importances: normalize_importances(&total_gains),
        })
    }

    /// Add the tree output, shrunk by the learning rate
    fn update_predictions(&self, tree: &Tree, features: &[Vec<f64>], predictions: &mut [f64]) {
        for (pred, row) in predictions.iter_mut().zip(features) {
            *pred += self.config.learning_rate * tree.evaluate(row);
        }
    }
}

impl Regressor for GbdtTrainer {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedModel> {
        self.train(features, targets).map(TrainedModel::Boosted)
    }
}

/// Initial prediction: mean of targets
pub(crate) fn calculate_bias(targets: &[f64]) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }
    targets.iter().sum::<f64>() / targets.len() as f64
}

/// Squared-error gradients `prediction - target` (hessian is constant 1)
pub(crate) fn calculate_gradients(targets: &[f64], predictions: &[f64]) -> Vec<f64> {
    predictions
        .iter()
        .zip(targets)
        .map(|(pred, target)| pred - target)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features = vec![
            vec![1.0, 2.0],
            vec![2.0, 3.0],
            vec![3.0, 4.0],
            vec![4.0, 5.0],
        ];
        let targets = vec![100_000.0, 200_000.0, 300_000.0, 400_000.0];
        (features, targets)
    }

    fn config(rounds: usize) -> GbdtConfig {
        GbdtConfig {
            n_estimators: rounds,
            learning_rate: 0.3,
            max_depth: 2,
            min_child_weight: 0.0,
            reg_lambda: 0.0,
            min_split_gain: 0.0,
        }
    }

    #[test]
    fn test_train_simple_model() {
        let (features, targets) = simple_data();
        let model = GbdtTrainer::new(config(4)).train(&features, &targets).unwrap();

        assert_eq!(model.trees.len(), 4);
        assert_eq!(model.base_score, 250_000.0);
        assert_eq!(model.learning_rate, 0.3);
    }

    #[test]
    fn test_training_error_decreases() {
        let (features, targets) = simple_data();
        let sse = |rounds: usize| -> f64 {
            let model = GbdtTrainer::new(config(rounds)).train(&features, &targets).unwrap();
            features
                .iter()
                .zip(&targets)
                .map(|(row, y)| (model.predict_row(row) - y).powi(2))
                .sum()
        };

        assert!(sse(20) < sse(2));
        assert!(sse(50) < 1.0);
    }

    #[test]
    fn test_bias_calculation() {
        assert_eq!(calculate_bias(&[1.0, 2.0, 3.0]), 2.0);
        assert_eq!(calculate_bias(&[]), 0.0);
        assert_eq!(calculate_gradients(&[1.0, 5.0], &[2.0, 2.0]), vec![1.0, -3.0]);
    }

    #[test]
    fn test_determinism() {
        let (features, targets) = simple_data();
        let model1 = GbdtTrainer::new(config(3)).train(&features, &targets).unwrap();
        let model2 = GbdtTrainer::new(config(3)).train(&features, &targets).unwrap();

        assert_eq!(model1, model2);
    }

    #[test]
    fn test_zero_rounds_predicts_mean() {
        let (features, targets) = simple_data();
        let model = GbdtTrainer::new(config(0)).train(&features, &targets).unwrap();
        assert!(model.trees.is_empty());
        assert_eq!(model.predict_row(&[9.0, 9.0]), 250_000.0);
    }
}
