//! Single-point salary prediction
//!
//! The predictor only reads the artifacts it is given, so any number of
//! predictors can share one `Arc<TrainedArtifacts>` across threads.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::artifacts::TrainedArtifacts;
use crate::encoder::FeatureSource;
use crate::errors::{CoreError, Result};
use crate::models::ModelKind;
use crate::schema::{self, REMOTE_RATIOS};

/// Lower band multiplier (estimate - 15%)
pub const BAND_LOWER: f64 = 0.85;
/// Upper band multiplier (estimate + 15%)
pub const BAND_UPPER: f64 = 1.15;

/// Candidate feature values plus the model to evaluate them with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub work_year: i32,
    pub experience_level: String,
    pub employment_type: String,
    pub job_title: String,
    pub company_location: String,
    pub company_size: String,
    pub remote_ratio: u8,
    pub model: ModelKind,
}

impl PredictionRequest {
    /// Check numeric fields that have a closed domain
    pub fn validate(&self) -> Result<()> {
        if !REMOTE_RATIOS.contains(&self.remote_ratio) {
            return Err(CoreError::InvalidRequest(format!(
                "remote_ratio must be one of {:?}, got {}",
                REMOTE_RATIOS, self.remote_ratio
            )));
        }
        Ok(())
    }
}

impl FeatureSource for PredictionRequest {
    fn categorical(&self, feature: &str) -> Option<&str> {
        match feature {
            schema::EXPERIENCE_LEVEL => Some(&self.experience_level),
            schema::EMPLOYMENT_TYPE => Some(&self.employment_type),
            schema::JOB_TITLE => Some(&self.job_title),
            schema::COMPANY_LOCATION => Some(&self.company_location),
            schema::COMPANY_SIZE => Some(&self.company_size),
            _ => None,
        }
    }

    fn numeric(&self, feature: &str) -> Option<f64> {
        match feature {
            schema::WORK_YEAR => Some(self.work_year as f64),
            schema::REMOTE_RATIO => Some(self.remote_ratio as f64),
            _ => None,
        }
    }
}

/// Symmetric ±15% band around an estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceBand {
    pub fn around(estimate: f64) -> Self {
        Self {
            lower: estimate * BAND_LOWER,
            upper: estimate * BAND_UPPER,
        }
    }
}

/// Point estimate and band for one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub model: ModelKind,
    pub estimate: f64,
    pub band: ConfidenceBand,
}

/// Salaries cannot be negative; NaN also maps to 0
pub fn clamp_non_negative(raw: f64) -> f64 {
    raw.max(0.0)
}

/// Read-only view over trained artifacts
#[derive(Debug, Clone, Copy)]
pub struct Predictor<'a> {
    artifacts: &'a TrainedArtifacts,
}

impl<'a> Predictor<'a> {
    pub fn new(artifacts: &'a TrainedArtifacts) -> Self {
        Self { artifacts }
    }

    /// Model input for a request: encoded, and standardized for linear models
    pub fn feature_vector(&self, request: &PredictionRequest) -> Result<Vec<f64>> {
        request.validate()?;
        self.artifacts.encoder.check_year(request.work_year)?;
        let row = self.artifacts.encoder.encode_row(request)?;
        if request.model.uses_scaled_features() {
            Ok(self.artifacts.scaler.transform_row(&row))
        } else {
            Ok(row)
        }
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let model = self.artifacts.model(request.model)?;
        let features = self.feature_vector(request)?;
        let raw = model.predict_row(&features);
        let estimate = clamp_non_negative(raw);
        debug!(model = %request.model, raw, estimate, "Predicted salary");

        Ok(PredictionResult {
            model: request.model,
            estimate,
            band: ConfidenceBand::around(estimate),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArtifactMetadata, EvaluationSplit};
    use crate::dataset::Record;
    use crate::encoder::EncoderTable;
    use crate::models::{LinearModel, TrainedModel};
    use crate::scaler::StandardScaler;
    use crate::schema::FEATURE_COUNT;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn request(model: ModelKind) -> PredictionRequest {
        PredictionRequest {
            work_year: 2023,
            experience_level: "SE".to_string(),
            employment_type: "FT".to_string(),
            job_title: "Data Scientist".to_string(),
            company_location: "US".to_string(),
            company_size: "M".to_string(),
            remote_ratio: 50,
            model,
        }
    }

    /// Artifacts holding a single linear model with the given intercept
    fn linear_artifacts(intercept: f64) -> TrainedArtifacts {
        let record = Record {
            work_year: 2023,
            experience_level: "SE".to_string(),
            employment_type: "FT".to_string(),
            job_title: "Data Scientist".to_string(),
            employee_residence: "US".to_string(),
            company_location: "US".to_string(),
            company_size: "M".to_string(),
            remote_ratio: 50,
            salary_in_usd: 150_000.0,
        };
        let encoder = EncoderTable::fit(std::slice::from_ref(&record));
        let row = encoder.encode_row(&record).unwrap();

        let mut models = BTreeMap::new();
        models.insert(
            ModelKind::LinearRegression,
            TrainedModel::Linear(LinearModel {
                coefficients: vec![0.0; FEATURE_COUNT],
                intercept,
            }),
        );

        TrainedArtifacts {
            metadata: ArtifactMetadata {
                version: "test".to_string(),
                created_at: 0,
                dataset_fingerprint: String::new(),
                seed: 42,
                train_rows: 1,
                eval_rows: 0,
            },
            encoder,
            scaler: StandardScaler::fit(&[row]),
            models,
            metrics: BTreeMap::new(),
            evaluation: EvaluationSplit::default(),
        }
    }

    #[test]
    fn test_band_is_fifteen_percent() {
        let band = ConfidenceBand::around(100_000.0);
        assert_eq!(band.lower, 100_000.0 * 0.85);
        assert_eq!(band.upper, 100_000.0 * 1.15);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_non_negative(-5.0), 0.0);
        assert_eq!(clamp_non_negative(12.5), 12.5);
        assert_eq!(clamp_non_negative(f64::NAN), 0.0);
    }

    #[test]
    fn test_negative_model_output_is_clamped() {
        let artifacts = linear_artifacts(-1.0e6);
        let result = Predictor::new(&artifacts)
            .predict(&request(ModelKind::LinearRegression))
            .unwrap();

        assert_eq!(result.estimate, 0.0);
        assert_eq!(result.band.lower, 0.0);
        assert_eq!(result.band.upper, 0.0);
    }

    #[test]
    fn test_positive_model_output_passes_through() {
        let artifacts = linear_artifacts(90_000.0);
        let result = Predictor::new(&artifacts)
            .predict(&request(ModelKind::LinearRegression))
            .unwrap();
        assert_eq!(result.estimate, 90_000.0);
    }

    #[test]
    fn test_unseen_work_year_rejected() {
        let artifacts = linear_artifacts(90_000.0);
        let mut req = request(ModelKind::LinearRegression);
        req.work_year = 1850;

        match Predictor::new(&artifacts).predict(&req) {
            Err(CoreError::InvalidRequest(msg)) => assert!(msg.contains("1850")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_remote_ratio_validation() {
        let mut request = request(ModelKind::RandomForest);
        assert!(request.validate().is_ok());

        request.remote_ratio = 75;
        assert!(matches!(request.validate(), Err(CoreError::InvalidRequest(_))));
    }

    proptest! {
        #[test]
        fn band_matches_multipliers(p in 0.0f64..1.0e7) {
            let band = ConfidenceBand::around(p);
            prop_assert_eq!(band.lower, p * 0.85);
            prop_assert_eq!(band.upper, p * 1.15);
            prop_assert!(band.lower <= p && p <= band.upper);
        }

        #[test]
        fn clamp_is_never_negative(raw in proptest::num::f64::ANY) {
            prop_assert!(clamp_non_negative(raw) >= 0.0);
        }
    }
}
