//! Regression tree structure shared by all tree ensembles
//!
//! Nodes live in a flat vector with node 0 as the root. Split rule is
//! `feature <= threshold` goes left.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes `feature_idx >= 0` and `left`/`right` index into the
/// node vector. Leaves have `feature_idx == -1` and carry `leaf`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub left: i32,
    pub right: i32,
    pub feature_idx: i32,
    pub threshold: f64,
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(value: f64) -> Self {
        Self {
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on a feature vector.
    ///
    /// Malformed trees (dangling child, out-of-range feature) evaluate to 0.
    pub fn evaluate(&self, features: &[f64]) -> f64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0.0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0.0);
            }

            let Some(&value) = features.get(node.feature_idx as usize) else {
                return 0.0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            if next < 0 {
                return 0.0;
            }
            idx = next as usize;
        }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure
    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }

            // Children must point forward to keep traversal acyclic
            for child in [node.left, node.right] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("Node {} has invalid child: {}", i, child));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        Tree::new(vec![
            Node::internal(0, 50.0, 1, 2),
            Node::leaf(100.0),
            Node::leaf(200.0),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(3, 12.5, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(-234.0);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf, Some(-234.0));
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30.0]), 100.0);
        assert_eq!(tree.evaluate(&[50.0]), 100.0); // Equal goes left
        assert_eq!(tree.evaluate(&[60.0]), 200.0);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn test_malformed_tree_evaluates_to_zero() {
        let tree = Tree::new(vec![Node::internal(4, 50.0, 1, 2), Node::leaf(1.0), Node::leaf(2.0)]);
        assert_eq!(tree.evaluate(&[1.0]), 0.0);
        assert_eq!(Tree::new(Vec::new()).evaluate(&[1.0]), 0.0);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate().is_ok());

        let invalid = Tree::new(vec![Node::internal(0, 50.0, 5, 2), Node::leaf(1.0), Node::leaf(2.0)]);
        assert!(invalid.validate().is_err());

        let cyclic = Tree::new(vec![Node::internal(0, 50.0, 0, 1), Node::leaf(1.0)]);
        assert!(cyclic.validate().is_err());
    }
}
