//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression tree construction over gradient/hessian
//! statistics. With `g = -y`, `h = 1` and no regularization this is a
//! plain variance-reduction tree; with residual gradients it is one round
//! of second-order gradient boosting.

use salarium_core::{Node, Tree};

use crate::deterministic::{is_better_split, LcgRng, SplitTieBreaker};
use crate::errors::{Result, TrainerError};

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    /// `None` grows until another limit stops it
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    pub min_split_gain: f64,
    /// Features drawn per node; `None` considers all of them
    pub max_features: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(6),
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_child_weight: 0.0,
            lambda: 0.0,
            min_split_gain: 0.0,
            max_features: None,
        }
    }
}

/// A fitted tree plus the split gain it accumulated per feature
#[derive(Debug, Clone)]
pub struct GrownTree {
    pub tree: Tree,
    pub split_gains: Vec<f64>,
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: f64, gain: f64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            gain,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold, node_id),
        }
    }
}

struct Growth<'r> {
    nodes: Vec<Node>,
    split_gains: Vec<f64>,
    rng: &'r mut LcgRng,
}

/// Build a regression tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Result<Self> {
        if features.len() != gradients.len() || features.len() != hessians.len() {
            return Err(TrainerError::Training(format!(
                "tree inputs disagree: {} rows, {} gradients, {} hessians",
                features.len(),
                gradients.len(),
                hessians.len()
            )));
        }

        let feature_count = features.first().map_or(0, Vec::len);

        Ok(Self {
            config,
            features,
            gradients,
            hessians,
            feature_count,
        })
    }

    /// Build a tree over all rows
    pub fn build(&self, rng: &mut LcgRng) -> GrownTree {
        let indices: Vec<usize> = (0..self.features.len()).collect();
        self.build_on(indices, rng)
    }

    /// Build a tree over the given row indices (duplicates allowed)
    pub fn build_on(&self, indices: Vec<usize>, rng: &mut LcgRng) -> GrownTree {
        let mut growth = Growth {
            nodes: Vec::new(),
            split_gains: vec![0.0; self.feature_count],
            rng,
        };

        if indices.is_empty() {
            growth.nodes.push(Node::leaf(0.0));
        } else {
            self.build_node(indices, 0, &mut growth);
        }

        GrownTree {
            tree: Tree::new(growth.nodes),
            split_gains: growth.split_gains,
        }
    }

    /// Recursively build tree nodes; children always land after their parent
    fn build_node(&self, indices: Vec<usize>, depth: usize, growth: &mut Growth<'_>) -> i32 {
        let current_idx = growth.nodes.len();
        let (sum_g, sum_h) = self.sum_gradients_hessians(&indices);
        let leaf_value = self.leaf_weight(sum_g, sum_h);

        if self.should_stop(indices.len(), depth) {
            growth.nodes.push(Node::leaf(leaf_value));
            return current_idx as i32;
        }

        let split = match self.find_best_split(
            &indices,
            sum_g,
            sum_h,
            current_idx,
            &mut *growth.rng,
        ) {
            Some(s) => s,
            None => {
                growth.nodes.push(Node::leaf(leaf_value));
                return current_idx as i32;
            }
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&idx| self.features[idx][split.feature_idx] <= split.threshold);

        // Reserve the slot, children are patched in below
        growth.nodes.push(Node::internal(
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
        ));
        growth.split_gains[split.feature_idx] += split.gain;

        let left_idx = self.build_node(left_indices, depth + 1, growth);
        let right_idx = self.build_node(right_indices, depth + 1, growth);

        growth.nodes[current_idx].left = left_idx;
        growth.nodes[current_idx].right = right_idx;

        current_idx as i32
    }

    fn should_stop(&self, n_samples: usize, depth: usize) -> bool {
        self.config.max_depth.is_some_and(|max| depth >= max)
            || n_samples < self.config.min_samples_split.max(2)
            || n_samples < 2 * self.config.min_samples_leaf.max(1)
    }

    /// Candidate features for one node
    fn candidate_features(&self, rng: &mut LcgRng) -> Vec<usize> {
        match self.config.max_features {
            Some(k) if k > 0 && k < self.feature_count => {
                rng.sample_without_replacement(self.feature_count, k)
            }
            _ => (0..self.feature_count).collect(),
        }
    }

    /// Find best split by sweeping each feature in sorted order
    fn find_best_split(
        &self,
        indices: &[usize],
        sum_g: f64,
        sum_h: f64,
        node_id: usize,
        rng: &mut LcgRng,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let parent_score = self.score(sum_g, sum_h);
        let mut best_split: Option<SplitCandidate> = None;

        for feature_idx in self.candidate_features(rng) {
            let mut column: Vec<(f64, f64, f64)> = indices
                .iter()
                .map(|&idx| {
                    (
                        self.features[idx][feature_idx],
                        self.gradients[idx],
                        self.hessians[idx],
                    )
                })
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut g_left = 0.0;
            let mut h_left = 0.0;

            for i in 0..n - 1 {
                g_left += column[i].1;
                h_left += column[i].2;

                let value = column[i].0;
                let next = column[i + 1].0;
                if value == next {
                    continue;
                }

                let left_count = i + 1;
                if left_count < min_leaf || n - left_count < min_leaf {
                    continue;
                }

                let g_right = sum_g - g_left;
                let h_right = sum_h - h_left;
                if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight
                {
                    continue;
                }

                let gain = 0.5
                    * (self.score(g_left, h_left) + self.score(g_right, h_right) - parent_score);
                let threshold = midpoint(value, next);
                let candidate = SplitCandidate::new(feature_idx, threshold, gain, node_id);

                best_split = match best_split {
                    None => Some(candidate),
                    Some(current) => {
                        if is_better_split(
                            candidate.gain,
                            &candidate.tie_breaker,
                            current.gain,
                            &current.tie_breaker,
                        ) {
                            Some(candidate)
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }

        // Rounding on large targets produces tiny spurious gains on pure nodes
        let tolerance = 1e-12 * parent_score.abs().max(1.0);
        best_split.filter(|s| s.gain > self.config.min_split_gain && s.gain > tolerance)
    }

    /// Structure score G²/(H+λ)
    fn score(&self, g: f64, h: f64) -> f64 {
        let denom = h + self.config.lambda;
        if denom > 0.0 {
            g * g / denom
        } else {
            0.0
        }
    }

    fn sum_gradients_hessians(&self, indices: &[usize]) -> (f64, f64) {
        indices.iter().fold((0.0, 0.0), |(g, h), &idx| {
            (g + self.gradients[idx], h + self.hessians[idx])
        })
    }

    /// Optimal leaf value: -G/(H+λ)
    fn leaf_weight(&self, sum_g: f64, sum_h: f64) -> f64 {
        let denom = sum_h + self.config.lambda;
        if denom > 0.0 {
            -sum_g / denom
        } else {
            0.0
        }
    }
}

/// Threshold between two distinct sorted values, kept strictly below `hi`
pub(crate) fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid < hi {
        mid
    } else {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regression_inputs(targets: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (
            targets.iter().map(|y| -y).collect(),
            vec![1.0; targets.len()],
        )
    }

    #[test]
    fn test_simple_tree() {
        let features = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0], vec![4.0, 5.0]];
        let (gradients, hessians) = regression_inputs(&[10.0, 10.0, 20.0, 20.0]);

        let config = TreeConfig {
            max_depth: Some(1),
            ..TreeConfig::default()
        };

        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let grown = builder.build(&mut LcgRng::new(1));

        assert_eq!(grown.tree.nodes.len(), 3);
        assert_eq!(grown.tree.nodes[0].feature_idx, 0);
        assert_eq!(grown.tree.nodes[0].threshold, 2.5);
        assert_eq!(grown.tree.evaluate(&[1.5, 5.0]), 10.0);
        assert_eq!(grown.tree.evaluate(&[3.5, 5.0]), 20.0);
        assert!(grown.split_gains[0] > 0.0);
        assert_eq!(grown.split_gains[1], 0.0);
        assert!(grown.tree.validate().is_ok());
    }

    #[test]
    fn test_leaf_only_tree() {
        let features = vec![vec![100.0]];
        let (gradients, hessians) = regression_inputs(&[42.0]);

        let builder =
            CartBuilder::new(&features, &gradients, &hessians, TreeConfig::default()).unwrap();
        let grown = builder.build(&mut LcgRng::new(1));

        assert_eq!(grown.tree.nodes.len(), 1);
        assert_eq!(grown.tree.nodes[0].leaf, Some(42.0));
    }

    #[test]
    fn test_pure_node_is_not_split() {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let (gradients, hessians) = regression_inputs(&[250_000.0; 3]);

        let builder =
            CartBuilder::new(&features, &gradients, &hessians, TreeConfig::default()).unwrap();
        let grown = builder.build(&mut LcgRng::new(1));

        assert_eq!(grown.tree.leaf_count(), 1);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let features: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..10).map(|i| if i == 0 { 100.0 } else { 0.0 }).collect();
        let (gradients, hessians) = regression_inputs(&targets);

        let config = TreeConfig {
            max_depth: Some(1),
            min_samples_leaf: 3,
            ..TreeConfig::default()
        };
        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let grown = builder.build(&mut LcgRng::new(1));

        // The isolating split at 0.5 is too small; 2.5 is the first legal one
        assert_eq!(grown.tree.nodes[0].threshold, 2.5);
    }

    #[test]
    fn test_lambda_shrinks_leaves() {
        let features = vec![vec![1.0], vec![2.0]];
        let (gradients, hessians) = regression_inputs(&[10.0, 10.0]);

        let config = TreeConfig {
            lambda: 2.0,
            ..TreeConfig::default()
        };
        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let grown = builder.build(&mut LcgRng::new(1));

        assert_eq!(grown.tree.evaluate(&[1.0]), 5.0);
    }

    #[test]
    fn test_determinism_with_feature_sampling() {
        let features: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i % 7) as f64, (i % 5) as f64, i as f64])
            .collect();
        let targets: Vec<f64> = (0..40).map(|i| (i * 37 % 11) as f64).collect();
        let (gradients, hessians) = regression_inputs(&targets);
        let config = TreeConfig {
            max_features: Some(1),
            ..TreeConfig::default()
        };

        let builder = CartBuilder::new(&features, &gradients, &hessians, config).unwrap();
        let a = builder.build(&mut LcgRng::new(9));
        let b = builder.build(&mut LcgRng::new(9));

        assert_eq!(a.tree, b.tree);
        assert_eq!(a.split_gains, b.split_gains);
        assert!(a.tree.validate().is_ok());
    }

    #[test]
    fn test_mismatched_inputs_rejected() {
        let features = vec![vec![1.0], vec![2.0]];
        let result = CartBuilder::new(&features, &[1.0], &[1.0, 1.0], TreeConfig::default());
        assert!(matches!(result, Err(TrainerError::Training(_))));
    }
}
