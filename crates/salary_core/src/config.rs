//! Configuration for loading, training and logging
//!
//! Defaults are usable as-is. A TOML file may override any subset of
//! fields, and `SALARIUM_*` environment variables override the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::dataset::DEFAULT_MAX_SALARY;
use crate::errors::{CoreError, Result};

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SalariumConfig {
    pub dataset: DatasetConfig,
    pub training: TrainingConfig,
    pub forest: ForestConfig,
    pub hist_gbdt: HistGbdtConfig,
    pub gbdt: GbdtConfig,
    pub linear: LinearConfig,
    pub logging: LoggingConfig,
}

/// Dataset loading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Records with a higher salary_in_usd are dropped at load
    pub max_salary: f64,
}

/// Train/evaluation split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Seed for the split and every stochastic trainer
    pub seed: u64,
    /// Share of records held out for evaluation
    pub test_fraction: f64,
}

/// Bagged decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all
    pub max_features: Option<usize>,
    pub bootstrap: bool,
}

/// Histogram gradient boosting (leaf-wise growth)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistGbdtConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub max_bins: usize,
    pub l2_regularization: f64,
}

/// Reference gradient boosting (exact greedy, depth-wise growth)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbdtConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_child_weight: f64,
    pub reg_lambda: f64,
    pub min_split_gain: f64,
}

/// Least squares
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearConfig {
    /// Relative ridge term added only when the normal equations are singular
    pub singular_ridge: f64,
}

/// Logging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset
    pub level: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            max_salary: DEFAULT_MAX_SALARY,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(16),
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
        }
    }
}

impl Default for HistGbdtConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_leaves: 31,
            max_depth: None,
            min_samples_leaf: 20,
            max_bins: 255,
            l2_regularization: 0.0,
        }
    }
}

impl Default for GbdtConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_child_weight: 1.0,
            reg_lambda: 1.0,
            min_split_gain: 0.0,
        }
    }
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            singular_ridge: 1e-8,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl SalariumConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Apply `SALARIUM_*` environment overrides
    pub fn load_from_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test fixtures)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("SALARIUM_SEED") {
            self.training.seed = parse_override("SALARIUM_SEED", &val)?;
        }
        if let Some(val) = lookup("SALARIUM_TEST_FRACTION") {
            self.training.test_fraction = parse_override("SALARIUM_TEST_FRACTION", &val)?;
        }
        if let Some(val) = lookup("SALARIUM_MAX_SALARY") {
            self.dataset.max_salary = parse_override("SALARIUM_MAX_SALARY", &val)?;
        }
        if let Some(val) = lookup("SALARIUM_FOREST_TREES") {
            self.forest.n_estimators = parse_override("SALARIUM_FOREST_TREES", &val)?;
        }
        if let Some(val) = lookup("SALARIUM_BOOSTING_ROUNDS") {
            let rounds = parse_override("SALARIUM_BOOSTING_ROUNDS", &val)?;
            self.hist_gbdt.n_estimators = rounds;
            self.gbdt.n_estimators = rounds;
        }
        if let Some(val) = lookup("SALARIUM_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Reject values the trainers cannot work with
    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        if !(self.dataset.max_salary > 0.0) {
            problems.push("dataset.max_salary must be positive".to_string());
        }
        if !(self.training.test_fraction > 0.0 && self.training.test_fraction < 1.0) {
            problems.push("training.test_fraction must be in (0, 1)".to_string());
        }
        if self.forest.n_estimators == 0 {
            problems.push("forest.n_estimators must be at least 1".to_string());
        }
        if self.forest.min_samples_leaf == 0 || self.forest.min_samples_split < 2 {
            problems.push("forest leaf/split minimums are too small".to_string());
        }
        if self.forest.max_features == Some(0) {
            problems.push("forest.max_features must be at least 1".to_string());
        }
        if self.hist_gbdt.n_estimators == 0 || self.gbdt.n_estimators == 0 {
            problems.push("boosting n_estimators must be at least 1".to_string());
        }
        if !(self.hist_gbdt.learning_rate > 0.0) || !(self.gbdt.learning_rate > 0.0) {
            problems.push("boosting learning_rate must be positive".to_string());
        }
        if self.hist_gbdt.max_leaves < 2 {
            problems.push("hist_gbdt.max_leaves must be at least 2".to_string());
        }
        if !(2..=256).contains(&self.hist_gbdt.max_bins) {
            problems.push("hist_gbdt.max_bins must be in [2, 256]".to_string());
        }
        if self.hist_gbdt.min_samples_leaf == 0 {
            problems.push("hist_gbdt.min_samples_leaf must be at least 1".to_string());
        }
        if self.hist_gbdt.l2_regularization < 0.0 || self.gbdt.reg_lambda < 0.0 {
            problems.push("regularization must be non-negative".to_string());
        }
        if self.linear.singular_ridge <= 0.0 {
            problems.push("linear.singular_ridge must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Config(problems.join("; ")))
        }
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {}", path.display());
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{key}: cannot parse {value:?}")))
}
