//! Artifact cache keyed by dataset content
//!
//! Holds at most one training result. A request for the same dataset
//! content returns the shared artifacts; new content retrains and replaces
//! the entry. Training runs under the lock so concurrent callers never
//! train the same dataset twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use salarium_core::{SalaryDataset, TrainedArtifacts};
use tracing::{debug, info};

use crate::errors::Result;
use crate::pipeline::TrainingPipeline;

#[derive(Debug)]
struct CacheEntry {
    fingerprint: String,
    artifacts: Arc<TrainedArtifacts>,
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Single-entry cache of trained artifacts
#[derive(Debug)]
pub struct ArtifactCache {
    pipeline: TrainingPipeline,
    entry: Mutex<Option<CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ArtifactCache {
    pub fn new(pipeline: TrainingPipeline) -> Self {
        Self {
            pipeline,
            entry: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn pipeline(&self) -> &TrainingPipeline {
        &self.pipeline
    }

    /// Artifacts for `dataset`, training only when its content is new
    pub fn get_or_train(&self, dataset: &SalaryDataset) -> Result<Arc<TrainedArtifacts>> {
        let fingerprint = dataset.fingerprint()?;
        let mut entry = self.entry.lock();

        if let Some(cached) = entry.as_ref() {
            if cached.fingerprint == fingerprint {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = %fingerprint, "Artifact cache hit");
                return Ok(Arc::clone(&cached.artifacts));
            }
            info!(
                old = %cached.fingerprint,
                new = %fingerprint,
                "Dataset changed, retraining"
            );
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let artifacts = Arc::new(
            self.pipeline
                .train_with_fingerprint(dataset, fingerprint.clone())?,
        );
        *entry = Some(CacheEntry {
            fingerprint,
            artifacts: Arc::clone(&artifacts),
        });

        Ok(artifacts)
    }

    /// Artifacts currently held, if any
    pub fn current(&self) -> Option<Arc<TrainedArtifacts>> {
        self.entry.lock().as_ref().map(|e| Arc::clone(&e.artifacts))
    }

    /// Drop the cached entry
    pub fn invalidate(&self) {
        *self.entry.lock() = None;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salarium_core::{Record, SalariumConfig};

    fn record(job: &str, salary: f64) -> Record {
        Record {
            work_year: 2023,
            experience_level: "MI".to_string(),
            employment_type: "FT".to_string(),
            job_title: job.to_string(),
            employee_residence: "DE".to_string(),
            company_location: "DE".to_string(),
            company_size: "S".to_string(),
            remote_ratio: 50,
            salary_in_usd: salary,
        }
    }

    fn cache() -> ArtifactCache {
        let mut config = SalariumConfig::default();
        config.forest.n_estimators = 3;
        config.hist_gbdt.n_estimators = 3;
        config.gbdt.n_estimators = 3;
        ArtifactCache::new(TrainingPipeline::new(config).unwrap())
    }

    fn dataset(extra: f64) -> SalaryDataset {
        SalaryDataset::from_records(
            vec![
                record("Data Engineer", 70_000.0),
                record("Data Engineer", 72_000.0),
                record("ML Engineer", 90_000.0 + extra),
                record("ML Engineer", 95_000.0),
            ],
            800_000.0,
        )
    }

    #[test]
    fn test_same_content_reuses_artifacts() {
        let cache = cache();
        let first = cache.get_or_train(&dataset(0.0)).unwrap();
        let second = cache.get_or_train(&dataset(0.0)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_changed_content_retrains() {
        let cache = cache();
        let first = cache.get_or_train(&dataset(0.0)).unwrap();
        let second = cache.get_or_train(&dataset(1.0)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_ne!(
            first.metadata.dataset_fingerprint,
            second.metadata.dataset_fingerprint
        );
        assert!(Arc::ptr_eq(&second, &cache.current().unwrap()));
        assert_eq!(cache.stats().misses, 2);
    }

    #[test]
    fn test_invalidate_forces_retrain() {
        let cache = cache();
        cache.get_or_train(&dataset(0.0)).unwrap();
        cache.invalidate();
        assert!(cache.current().is_none());
        cache.get_or_train(&dataset(0.0)).unwrap();
        assert_eq!(cache.stats().misses, 2);
    }
}
