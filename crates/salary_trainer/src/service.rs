//! Prediction service: estimate, band, model quality and market context
//! for one request.

use std::sync::Arc;

use salarium_core::{
    compare_to_market, ComparisonOutcome, ConfidenceBand, FeatureImportance, ModelKind,
    PredictionRequest, Predictor, SalaryDataset, TrainedArtifacts,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cache::ArtifactCache;
use crate::errors::Result;

/// Everything shown for a single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub model: ModelKind,
    pub predicted_salary: f64,
    pub band: ConfidenceBand,
    /// Held-out R² of the chosen model
    pub r2: f64,
    /// Ranked importances; absent for the linear model
    pub feature_importances: Option<Vec<FeatureImportance>>,
    pub market: ComparisonOutcome,
}

/// Dataset plus the artifacts trained on it
#[derive(Debug, Clone)]
pub struct SalaryInsights {
    dataset: Arc<SalaryDataset>,
    artifacts: Arc<TrainedArtifacts>,
}

impl SalaryInsights {
    pub fn new(dataset: Arc<SalaryDataset>, artifacts: Arc<TrainedArtifacts>) -> Self {
        Self { dataset, artifacts }
    }

    /// Train (or reuse) artifacts for `dataset` through the cache
    pub fn from_cache(cache: &ArtifactCache, dataset: Arc<SalaryDataset>) -> Result<Self> {
        let artifacts = cache.get_or_train(&dataset)?;
        Ok(Self::new(dataset, artifacts))
    }

    pub fn dataset(&self) -> &SalaryDataset {
        &self.dataset
    }

    pub fn artifacts(&self) -> &TrainedArtifacts {
        &self.artifacts
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let result = Predictor::new(&self.artifacts).predict(request)?;
        let model = self.artifacts.model(request.model)?;
        let r2 = self
            .artifacts
            .metrics(request.model)
            .map_or(f64::NAN, |m| m.r2);
        let market = compare_to_market(self.dataset.records(), request, result.estimate);

        info!(
            model = %request.model,
            estimate = result.estimate,
            comparable = market.comparison().is_some(),
            "Prediction served"
        );

        Ok(PredictionResponse {
            model: request.model,
            predicted_salary: result.estimate,
            band: result.band,
            r2,
            feature_importances: model.ranked_importances(),
            market,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salarium_core::{CoreError, Record, SalariumConfig};

    use crate::errors::TrainerError;
    use crate::pipeline::TrainingPipeline;

    fn record(exp: &str, job: &str, salary: f64) -> Record {
        Record {
            work_year: 2023,
            experience_level: exp.to_string(),
            employment_type: "FT".to_string(),
            job_title: job.to_string(),
            employee_residence: "US".to_string(),
            company_location: "US".to_string(),
            company_size: "M".to_string(),
            remote_ratio: 0,
            salary_in_usd: salary,
        }
    }

    fn insights() -> SalaryInsights {
        let dataset = Arc::new(SalaryDataset::from_records(
            vec![
                record("EN", "Data Analyst", 70_000.0),
                record("EN", "Data Analyst", 75_000.0),
                record("EN", "Data Analyst", 80_000.0),
                record("SE", "Data Scientist", 160_000.0),
                record("SE", "Data Scientist", 170_000.0),
            ],
            800_000.0,
        ));
        let mut config = SalariumConfig::default();
        config.forest.n_estimators = 5;
        config.hist_gbdt.n_estimators = 5;
        config.gbdt.n_estimators = 5;
        let cache = ArtifactCache::new(TrainingPipeline::new(config).unwrap());
        SalaryInsights::from_cache(&cache, dataset).unwrap()
    }

    fn request(model: ModelKind) -> PredictionRequest {
        PredictionRequest {
            work_year: 2023,
            experience_level: "EN".to_string(),
            employment_type: "FT".to_string(),
            job_title: "Data Analyst".to_string(),
            company_location: "US".to_string(),
            company_size: "M".to_string(),
            remote_ratio: 0,
            model,
        }
    }

    #[test]
    fn test_response_for_every_model() {
        let insights = insights();
        for kind in ModelKind::ALL {
            let response = insights.predict(&request(kind)).unwrap();
            assert!(response.predicted_salary >= 0.0);
            assert_eq!(response.band, ConfidenceBand::around(response.predicted_salary));
            assert_eq!(response.feature_importances.is_some(), kind.is_tree_based());

            let market = response.market.comparison().unwrap();
            assert_eq!(market.sample_count, 3);
            assert_eq!(market.mean_salary, 75_000.0);
        }
    }

    #[test]
    fn test_unknown_title_rejected() {
        let mut req = request(ModelKind::RandomForest);
        req.job_title = "Astronaut".to_string();
        assert!(matches!(
            insights().predict(&req),
            Err(TrainerError::Core(CoreError::UnknownCategory { .. }))
        ));
    }

    #[test]
    fn test_no_comparable_records() {
        let mut req = request(ModelKind::GradientBoosting);
        req.experience_level = "SE".to_string();
        let response = insights().predict(&req).unwrap();
        assert_eq!(response.market, ComparisonOutcome::NoComparableData);
    }
}
