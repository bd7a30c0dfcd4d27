//! Everything produced by one training run
//!
//! Artifacts are immutable once built and are shared behind `Arc` by the
//! cache; prediction only ever reads them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::encoder::EncoderTable;
use crate::errors::{CoreError, Result};
use crate::fingerprint::{hash_canonical_hex, to_canonical_json};
use crate::metrics::ModelMetrics;
use crate::models::{ModelKind, TrainedModel};
use crate::scaler::StandardScaler;

/// Held-out rows kept for re-scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EvaluationSplit {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

/// Provenance of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub version: String,
    /// Unix seconds
    pub created_at: i64,
    /// Content key of the dataset the artifacts were trained on
    pub dataset_fingerprint: String,
    pub seed: u64,
    pub train_rows: usize,
    pub eval_rows: usize,
}

/// Encoder, scaler, fitted models and their held-out metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedArtifacts {
    pub metadata: ArtifactMetadata,
    pub encoder: EncoderTable,
    pub scaler: StandardScaler,
    pub models: BTreeMap<ModelKind, TrainedModel>,
    pub metrics: BTreeMap<ModelKind, ModelMetrics>,
    pub evaluation: EvaluationSplit,
}

impl TrainedArtifacts {
    pub fn model(&self, kind: ModelKind) -> Result<&TrainedModel> {
        self.models
            .get(&kind)
            .ok_or_else(|| CoreError::InvalidRequest(format!("model {kind} was not trained")))
    }

    pub fn metrics(&self, kind: ModelKind) -> Option<&ModelMetrics> {
        self.metrics.get(&kind)
    }

    /// Model with the highest held-out R²
    pub fn best_model(&self) -> Option<ModelKind> {
        self.metrics
            .iter()
            .filter(|(_, m)| m.r2.is_finite())
            .max_by(|a, b| a.1.r2.total_cmp(&b.1.r2))
            .map(|(kind, _)| *kind)
    }

    /// Structural check of every stored tree, for artifacts read from disk
    pub fn validate(&self) -> Result<()> {
        for (kind, model) in &self.models {
            for (idx, tree) in model.trees().iter().enumerate() {
                tree.validate().map_err(|msg| {
                    CoreError::InvalidArtifacts(format!("{kind} tree {idx}: {msg}"))
                })?;
            }
        }
        Ok(())
    }

    pub fn to_canonical_json(&self) -> Result<String> {
        to_canonical_json(self)
    }

    /// Blake3 hex digest of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String> {
        hash_canonical_hex(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::EncoderTable;
    use crate::models::ForestModel;
    use crate::tree::{Node, Tree};

    fn artifacts(tree: Tree) -> TrainedArtifacts {
        let mut models = BTreeMap::new();
        models.insert(
            ModelKind::RandomForest,
            TrainedModel::Forest(ForestModel {
                trees: vec![tree],
                feature_importances: Vec::new(),
            }),
        );
        TrainedArtifacts {
            metadata: ArtifactMetadata {
                version: "test".to_string(),
                created_at: 0,
                dataset_fingerprint: String::new(),
                seed: 42,
                train_rows: 0,
                eval_rows: 0,
            },
            encoder: EncoderTable::fit(&[]),
            scaler: StandardScaler::fit(&[]),
            models,
            metrics: BTreeMap::new(),
            evaluation: EvaluationSplit::default(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_trees() {
        let tree = Tree::new(vec![
            Node::internal(0, 2021.5, 1, 2),
            Node::leaf(90_000.0),
            Node::leaf(110_000.0),
        ]);
        assert!(artifacts(tree).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let tree = Tree::new(vec![Node::internal(0, 2021.5, 1, 7), Node::leaf(90_000.0)]);
        match artifacts(tree).validate() {
            Err(CoreError::InvalidArtifacts(msg)) => assert!(msg.contains("random-forest tree 0")),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
