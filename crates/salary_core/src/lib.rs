//! Salary prediction core
//!
//! Data model, feature encoding, model inference and market comparison for
//! the salary predictor. Training lives in `salarium-trainer`; everything
//! here is read-only once artifacts exist.
//!
//! Modules:
//! - `schema`: ordered feature schema shared by encoder, trainers, predictor
//! - `dataset`: historical records and CSV loading
//! - `encoder`: categorical code tables and feature vector assembly
//! - `scaler`: z-score scaling for the linear model
//! - `tree`, `models`: fitted regressors behind one prediction interface
//! - `metrics`: MAE / RMSE / R² on the evaluation split
//! - `artifacts`: the immutable output of one training run
//! - `predictor`: single-point prediction with a ±15% band
//! - `comparison`: percentile and summary against comparable records
//! - `labels`: display names for coded columns
//! - `config`: TOML + environment configuration
//! - `fingerprint`: canonical JSON and blake3 content hashes

pub mod artifacts;
pub mod comparison;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod errors;
pub mod fingerprint;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod scaler;
pub mod schema;
pub mod tree;

pub use artifacts::{ArtifactMetadata, EvaluationSplit, TrainedArtifacts};
pub use comparison::{compare_to_market, percentile_rank, ComparisonOutcome, MarketComparison, SalarySummary};
pub use config::SalariumConfig;
pub use dataset::{Record, SalaryDataset, DEFAULT_MAX_SALARY};
pub use encoder::{encode_dataset, CategoryCodes, EncodedDataset, EncoderTable, FeatureSource};
pub use errors::{CoreError, Result};
pub use metrics::ModelMetrics;
pub use models::{BoostedModel, FeatureImportance, ForestModel, LinearModel, ModelKind, TrainedModel};
pub use predictor::{ConfidenceBand, PredictionRequest, PredictionResult, Predictor};
pub use scaler::StandardScaler;
pub use schema::{FeatureKind, FeatureSpec, FEATURE_COUNT, FEATURE_SCHEMA};
pub use tree::{Node, Tree};

/// Crate version string for artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
