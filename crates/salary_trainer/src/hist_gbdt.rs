//! Histogram-based gradient boosting
//!
//! Features are quantized into at most `max_bins` bins once, up front.
//! Trees grow leaf-wise: the leaf with the largest histogram gain is split
//! next until `max_leaves` is reached. Split thresholds are stored in raw
//! feature space, so fitted trees evaluate unbinned rows directly.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use salarium_core::config::HistGbdtConfig;
use salarium_core::models::normalize_importances;
use salarium_core::{BoostedModel, Node, TrainedModel, Tree};
use tracing::debug;

use crate::cart::midpoint;
use crate::deterministic::{is_better_split, SplitTieBreaker};
use crate::errors::{check_shapes, Result};
use crate::gbdt::{calculate_bias, calculate_gradients};
use crate::regressor::Regressor;

/// Per-feature bin boundaries.
///
/// Bin `b` holds values in `(cuts[b-1], cuts[b]]`; the last bin is open
/// above.
#[derive(Debug, Clone, PartialEq)]
pub struct BinCuts {
    cuts: Vec<Vec<f64>>,
}

impl BinCuts {
    pub fn fit(features: &[Vec<f64>], max_bins: usize) -> Self {
        let n_features = features.first().map_or(0, Vec::len);
        let max_bins = max_bins.clamp(2, u16::MAX as usize);

        let cuts = (0..n_features)
            .map(|feature| {
                let mut values: Vec<f64> = features.iter().map(|row| row[feature]).collect();
                values.sort_by(f64::total_cmp);
                feature_cuts(&values, max_bins)
            })
            .collect();

        Self { cuts }
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.cuts[feature].len() + 1
    }

    pub fn bin(&self, feature: usize, value: f64) -> u16 {
        self.cuts[feature].partition_point(|&c| c < value) as u16
    }

    /// Raw-space threshold equivalent to `bin <= b`
    pub fn threshold(&self, feature: usize, bin: u16) -> f64 {
        self.cuts[feature][bin as usize]
    }

    /// Column-major bin matrix: `result[feature][row]`
    pub fn bin_matrix(&self, features: &[Vec<f64>]) -> Vec<Vec<u16>> {
        (0..self.cuts.len())
            .map(|feature| {
                features
                    .iter()
                    .map(|row| self.bin(feature, row[feature]))
                    .collect()
            })
            .collect()
    }
}

/// Cut points for one sorted column
fn feature_cuts(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct = sorted.to_vec();
    distinct.dedup();

    if distinct.len() <= max_bins {
        return distinct.windows(2).map(|w| midpoint(w[0], w[1])).collect();
    }

    let n = sorted.len();
    let last = sorted[n - 1];
    let mut cuts: Vec<f64> = (1..max_bins)
        .map(|k| sorted[k * n / max_bins])
        .filter(|&c| c < last)
        .collect();
    cuts.dedup();
    cuts
}

/// Best split found for a leaf
#[derive(Debug, Clone, Copy)]
struct HistSplit {
    feature: usize,
    bin: u16,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

/// A leaf waiting to be split, ordered by gain (ties go to the older node)
struct PendingSplit {
    node: usize,
    depth: usize,
    indices: Vec<usize>,
    split: HistSplit,
}

impl PartialEq for PendingSplit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PendingSplit {}

impl PartialOrd for PendingSplit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingSplit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.split
            .gain
            .total_cmp(&other.split.gain)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Gradient/count sums for one bin
#[derive(Debug, Clone, Copy, Default)]
struct BinStats {
    gradient: f64,
    count: usize,
}

/// Leaf-wise histogram GBDT trainer
pub struct HistGbdtTrainer {
    config: HistGbdtConfig,
}

impl HistGbdtTrainer {
    pub fn new(config: HistGbdtConfig) -> Self {
        Self { config }
    }

    pub fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<BoostedModel> {
        check_shapes(features, targets)?;

        let cuts = BinCuts::fit(features, self.config.max_bins);
        let binned = cuts.bin_matrix(features);
        let base_score = calculate_bias(targets);
        let mut predictions = vec![base_score; targets.len()];
        let mut total_gains = vec![0.0; features[0].len()];
        let mut trees = Vec::with_capacity(self.config.n_estimators);

        for round in 0..self.config.n_estimators {
            let gradients = calculate_gradients(targets, &predictions);
            let (tree, gains) = self.grow_tree(&cuts, &binned, &gradients);

            for (total, gain) in total_gains.iter_mut().zip(&gains) {
                *total += gain;
            }
            for (pred, row) in predictions.iter_mut().zip(features) {
                *pred += self.config.learning_rate * tree.evaluate(row);
            }

            debug!(
                round = round + 1,
                leaves = tree.leaf_count(),
                "Histogram boosting round complete"
            );
            trees.push(tree);
        }

        Ok(BoostedModel {
            base_score,
            learning_rate: self.config.learning_rate,
            trees,
            feature_importances: normalize_importances(&total_gains),
        })
    }

    /// Grow one tree leaf-wise; returns the tree and per-feature gains
    fn grow_tree(
        &self,
        cuts: &BinCuts,
        binned: &[Vec<u16>],
        gradients: &[f64],
    ) -> (Tree, Vec<f64>) {
        let all: Vec<usize> = (0..gradients.len()).collect();
        let mut nodes = vec![Node::leaf(self.leaf_weight(gradients, &all))];
        let mut gains = vec![0.0; binned.len()];
        let mut heap = BinaryHeap::new();
        let mut leaves = 1;

        if let Some(split) = self.find_split(cuts, binned, gradients, &all, 0, 0) {
            heap.push(PendingSplit {
                node: 0,
                depth: 0,
                indices: all,
                split,
            });
        }

        while leaves < self.config.max_leaves {
            let Some(pending) = heap.pop() else {
                break;
            };
            let HistSplit { feature, bin, gain, .. } = pending.split;

            let (left, right): (Vec<usize>, Vec<usize>) = pending
                .indices
                .into_iter()
                .partition(|&idx| binned[feature][idx] <= bin);

            let left_id = nodes.len();
            let right_id = left_id + 1;
            nodes.push(Node::leaf(self.leaf_weight(gradients, &left)));
            nodes.push(Node::leaf(self.leaf_weight(gradients, &right)));
            nodes[pending.node] = Node::internal(
                feature as i32,
                cuts.threshold(feature, bin),
                left_id as i32,
                right_id as i32,
            );
            gains[feature] += gain;
            leaves += 1;

            let depth = pending.depth + 1;
            for (node, indices) in [(left_id, left), (right_id, right)] {
                let split = self.find_split(cuts, binned, gradients, &indices, node, depth);
                if let Some(split) = split {
                    heap.push(PendingSplit {
                        node,
                        depth,
                        indices,
                        split,
                    });
                }
            }
        }

        (Tree::new(nodes), gains)
    }

    /// Best histogram split for one leaf
    fn find_split(
        &self,
        cuts: &BinCuts,
        binned: &[Vec<u16>],
        gradients: &[f64],
        indices: &[usize],
        node: usize,
        depth: usize,
    ) -> Option<HistSplit> {
        let min_leaf = self.config.min_samples_leaf.max(1);
        if self.config.max_depth.is_some_and(|max| depth >= max) || indices.len() < 2 * min_leaf {
            return None;
        }

        let sum_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
        let count = indices.len();
        let parent_score = self.score(sum_g, count);
        let mut best: Option<HistSplit> = None;

        for (feature, column) in binned.iter().enumerate() {
            let n_bins = cuts.n_bins(feature);
            if n_bins < 2 {
                continue;
            }

            let mut histogram = vec![BinStats::default(); n_bins];
            for &idx in indices {
                let stats = &mut histogram[column[idx] as usize];
                stats.gradient += gradients[idx];
                stats.count += 1;
            }

            let mut g_left = 0.0;
            let mut c_left = 0;
            for (bin, stats) in histogram.iter().enumerate().take(n_bins - 1) {
                g_left += stats.gradient;
                c_left += stats.count;
                if stats.count == 0 || c_left < min_leaf || count - c_left < min_leaf {
                    continue;
                }

                let gain = 0.5
                    * (self.score(g_left, c_left) + self.score(sum_g - g_left, count - c_left)
                        - parent_score);
                let tie = SplitTieBreaker::new(feature, cuts.threshold(feature, bin as u16), node);

                let better = match &best {
                    None => true,
                    Some(current) => is_better_split(gain, &tie, current.gain, &current.tie_breaker),
                };
                if better {
                    best = Some(HistSplit {
                        feature,
                        bin: bin as u16,
                        gain,
                        tie_breaker: tie,
                    });
                }
            }
        }

        let tolerance = 1e-12 * parent_score.abs().max(1.0);
        best.filter(|s| s.gain > tolerance)
    }

    /// G²/(n+λ) for squared error, where each hessian is 1
    fn score(&self, g: f64, count: usize) -> f64 {
        let denom = count as f64 + self.config.l2_regularization;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    fn leaf_weight(&self, gradients: &[f64], indices: &[usize]) -> f64 {
        let sum_g: f64 = indices.iter().map(|&i| gradients[i]).sum();
        let denom = indices.len() as f64 + self.config.l2_regularization;
        if denom > 0.0 {
            -sum_g / denom
        } else {
            0.0
        }
    }
}

impl Regressor for HistGbdtTrainer {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedModel> {
        self.train(features, targets).map(TrainedModel::Boosted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> HistGbdtConfig {
        HistGbdtConfig {
            n_estimators: 30,
            learning_rate: 0.3,
            max_leaves: 4,
            max_depth: None,
            min_samples_leaf: 2,
            max_bins: 16,
            l2_regularization: 0.0,
        }
    }

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 8) as f64, (i % 3) as f64]).collect();
        let targets = features
            .iter()
            .map(|row| if row[0] < 4.0 { 60_000.0 } else { 140_000.0 })
            .collect();
        (features, targets)
    }

    #[test]
    fn test_cuts_on_few_distinct_values() {
        let features = vec![vec![1.0], vec![2.0], vec![2.0], vec![4.0]];
        let cuts = BinCuts::fit(&features, 255);

        assert_eq!(cuts.n_bins(0), 3);
        assert_eq!(cuts.threshold(0, 0), 1.5);
        assert_eq!(cuts.threshold(0, 1), 3.0);
        assert_eq!(cuts.bin(0, 1.0), 0);
        assert_eq!(cuts.bin(0, 2.0), 1);
        assert_eq!(cuts.bin(0, 4.0), 2);
        assert_eq!(cuts.bin(0, 100.0), 2);
    }

    #[test]
    fn test_cuts_respect_max_bins() {
        let features: Vec<Vec<f64>> = (0..1000).map(|i| vec![i as f64]).collect();
        let cuts = BinCuts::fit(&features, 10);
        assert!(cuts.n_bins(0) <= 10);
        assert!(cuts.n_bins(0) >= 2);
    }

    #[test]
    fn test_bins_agree_with_thresholds() {
        let features: Vec<Vec<f64>> = (0..300).map(|i| vec![((i * 7919) % 501) as f64]).collect();
        let cuts = BinCuts::fit(&features, 20);
        for b in 0..(cuts.n_bins(0) - 1) as u16 {
            let t = cuts.threshold(0, b);
            for row in &features {
                assert_eq!(cuts.bin(0, row[0]) <= b, row[0] <= t);
            }
        }
    }

    #[test]
    fn test_learns_step_function() {
        let (features, targets) = step_data();
        let model = HistGbdtTrainer::new(config()).train(&features, &targets).unwrap();

        assert!((model.predict_row(&[1.0, 0.0]) - 60_000.0).abs() < 100.0);
        assert!((model.predict_row(&[6.0, 0.0]) - 140_000.0).abs() < 100.0);
        assert!(model.feature_importances[0] > model.feature_importances[1]);
    }

    #[test]
    fn test_max_leaves_respected() {
        let features: Vec<Vec<f64>> = (0..100).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..100).map(|i| (i * i) as f64).collect();
        let model = HistGbdtTrainer::new(config()).train(&features, &targets).unwrap();

        for tree in &model.trees {
            assert!(tree.leaf_count() <= 4);
            assert!(tree.validate().is_ok());
        }
    }

    #[test]
    fn test_min_samples_leaf_blocks_small_data() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let targets = vec![10.0, 20.0, 30.0];
        let mut cfg = config();
        cfg.min_samples_leaf = 20;
        let model = HistGbdtTrainer::new(cfg).train(&features, &targets).unwrap();

        assert!(model.trees.iter().all(|t| t.leaf_count() == 1));
        assert!((model.predict_row(&[1.0]) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_determinism() {
        let (features, targets) = step_data();
        let a = HistGbdtTrainer::new(config()).train(&features, &targets).unwrap();
        let b = HistGbdtTrainer::new(config()).train(&features, &targets).unwrap();
        assert_eq!(a, b);
    }
}
