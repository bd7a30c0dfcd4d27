//! End-to-end training run
//!
//! encode -> split -> scale -> fit all four regressors -> score each on
//! the held-out rows -> bundle everything into [`TrainedArtifacts`].

use std::collections::BTreeMap;

use salarium_core::{
    encode_dataset, ArtifactMetadata, EvaluationSplit, ModelKind, ModelMetrics, SalariumConfig,
    SalaryDataset, StandardScaler, TrainedArtifacts, VERSION,
};
use tracing::{debug, info};

use crate::errors::Result;
use crate::regressor::regressor_for;
use crate::split::train_test_split;

/// Deterministic training pipeline for all supported model kinds
#[derive(Debug, Clone)]
pub struct TrainingPipeline {
    config: SalariumConfig,
}

impl TrainingPipeline {
    /// Create a pipeline; rejects configurations the trainers cannot use
    pub fn new(config: SalariumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SalariumConfig {
        &self.config
    }

    /// Train every model on `dataset`
    pub fn train(&self, dataset: &SalaryDataset) -> Result<TrainedArtifacts> {
        let fingerprint = dataset.fingerprint()?;
        self.train_with_fingerprint(dataset, fingerprint)
    }

    pub(crate) fn train_with_fingerprint(
        &self,
        dataset: &SalaryDataset,
        fingerprint: String,
    ) -> Result<TrainedArtifacts> {
        let seed = self.config.training.seed;
        info!(
            records = dataset.len(),
            seed,
            fingerprint = %fingerprint,
            "Starting training run"
        );

        let (encoder, encoded) = encode_dataset(dataset)?;
        let split = train_test_split(&encoded, self.config.training.test_fraction, seed);
        info!(
            train_rows = split.train.len(),
            eval_rows = split.eval.len(),
            "Split dataset"
        );

        let scaler = StandardScaler::fit(&split.train.features);
        let scaled_train = scaler.transform(&split.train.features);
        let scaled_eval = scaler.transform(&split.eval.features);

        let mut models = BTreeMap::new();
        let mut metrics = BTreeMap::new();

        for kind in ModelKind::ALL {
            let (x_train, x_eval) = if kind.uses_scaled_features() {
                (&scaled_train, &scaled_eval)
            } else {
                (&split.train.features, &split.eval.features)
            };

            debug!(model = %kind, "Fitting model");
            let model = regressor_for(kind, &self.config).fit(x_train, &split.train.targets)?;
            let scores = ModelMetrics::evaluate(&split.eval.targets, &model.predict(x_eval));
            info!(
                model = %kind,
                mae = scores.mae,
                rmse = scores.rmse,
                r2 = scores.r2,
                "Model trained"
            );

            models.insert(kind, model);
            metrics.insert(kind, scores);
        }

        let metadata = ArtifactMetadata {
            version: VERSION.to_string(),
            created_at: chrono::Utc::now().timestamp(),
            dataset_fingerprint: fingerprint,
            seed,
            train_rows: split.train.len(),
            eval_rows: split.eval.len(),
        };

        Ok(TrainedArtifacts {
            metadata,
            encoder,
            scaler,
            models,
            metrics,
            evaluation: EvaluationSplit {
                features: split.eval.features,
                targets: split.eval.targets,
            },
        })
    }
}

/// Recompute a model's metrics from the held-out rows stored in `artifacts`
pub fn rescore(artifacts: &TrainedArtifacts, kind: ModelKind) -> Result<ModelMetrics> {
    let model = artifacts.model(kind)?;
    let rows = if kind.uses_scaled_features() {
        artifacts.scaler.transform(&artifacts.evaluation.features)
    } else {
        artifacts.evaluation.features.clone()
    };
    Ok(ModelMetrics::evaluate(
        &artifacts.evaluation.targets,
        &model.predict(&rows),
    ))
}
