//! Fitted regressors and the closed set of model kinds
//!
//! Every kind evaluates through [`TrainedModel::predict_row`]; adding a kind
//! means adding one variant here and one trainer in `salarium-trainer`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::CoreError;
use crate::schema::FEATURE_SCHEMA;
use crate::tree::Tree;

/// The four supported regressors
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    /// Bagged ensemble of decision trees
    RandomForest,
    /// Histogram-binned, leaf-wise gradient boosting
    HistGradientBoosting,
    /// Exact-greedy, depth-wise gradient boosting
    GradientBoosting,
    /// Ordinary least squares on standardized features
    LinearRegression,
}

impl ModelKind {
    pub const ALL: [ModelKind; 4] = [
        ModelKind::RandomForest,
        ModelKind::HistGradientBoosting,
        ModelKind::GradientBoosting,
        ModelKind::LinearRegression,
    ];

    /// Stable identifier used on the command line and in artifacts
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random-forest",
            ModelKind::HistGradientBoosting => "hist-gradient-boosting",
            ModelKind::GradientBoosting => "gradient-boosting",
            ModelKind::LinearRegression => "linear-regression",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "Random Forest",
            ModelKind::HistGradientBoosting => "Histogram Gradient Boosting",
            ModelKind::GradientBoosting => "Gradient Boosting",
            ModelKind::LinearRegression => "Linear Regression",
        }
    }

    /// Whether the model consumes standardized features
    pub fn uses_scaled_features(&self) -> bool {
        matches!(self, ModelKind::LinearRegression)
    }

    pub fn is_tree_based(&self) -> bool {
        !self.uses_scaled_features()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::InvalidRequest(format!("unknown model: {s}")))
    }
}

/// Averaged tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<Tree>,
    pub feature_importances: Vec<f64>,
}

impl ForestModel {
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        sum / self.trees.len() as f64
    }
}

/// Additive boosted ensemble: `base_score + learning_rate * sum(trees)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub base_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
    pub feature_importances: Vec<f64>,
}

impl BoostedModel {
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|t| t.evaluate(features)).sum();
        self.base_score + self.learning_rate * boost
    }
}

/// Linear model over standardized features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearModel {
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(w, x)| w * x)
                .sum::<f64>()
    }
}

/// One fitted regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainedModel {
    Forest(ForestModel),
    Boosted(BoostedModel),
    Linear(LinearModel),
}

impl TrainedModel {
    /// Raw model output; callers apply scaling before and clamping after
    pub fn predict_row(&self, features: &[f64]) -> f64 {
        match self {
            TrainedModel::Forest(m) => m.predict_row(features),
            TrainedModel::Boosted(m) => m.predict_row(features),
            TrainedModel::Linear(m) => m.predict_row(features),
        }
    }

    /// Trees of the ensemble; empty for the linear model
    pub fn trees(&self) -> &[Tree] {
        match self {
            TrainedModel::Forest(m) => &m.trees,
            TrainedModel::Boosted(m) => &m.trees,
            TrainedModel::Linear(_) => &[],
        }
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_row(row)).collect()
    }

    /// Normalized split-gain importances; tree models only
    pub fn feature_importances(&self) -> Option<&[f64]> {
        match self {
            TrainedModel::Forest(m) => Some(&m.feature_importances),
            TrainedModel::Boosted(m) => Some(&m.feature_importances),
            TrainedModel::Linear(_) => None,
        }
    }

    /// Importances paired with feature names, highest first
    pub fn ranked_importances(&self) -> Option<Vec<FeatureImportance>> {
        let scores = self.feature_importances()?;
        let mut ranked: Vec<FeatureImportance> = FEATURE_SCHEMA
            .iter()
            .zip(scores)
            .map(|(spec, &importance)| FeatureImportance {
                feature: spec.name.to_string(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.importance
                .total_cmp(&a.importance)
                .then_with(|| a.feature.cmp(&b.feature))
        });
        Some(ranked)
    }
}

/// Importance score of one feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Scale raw gain totals so they sum to 1 (all zeros stay zeros)
pub fn normalize_importances(gains: &[f64]) -> Vec<f64> {
    let total: f64 = gains.iter().sum();
    if total <= 0.0 {
        return vec![0.0; gains.len()];
    }
    gains.iter().map(|g| g / total).collect()
}
