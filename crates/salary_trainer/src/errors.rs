use salarium_core::CoreError;
use thiserror::Error;

/// Errors returned by the deterministic trainers.
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("training error: {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, TrainerError>;

/// Check that a feature matrix and its targets line up
pub(crate) fn check_shapes(features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
    if features.is_empty() {
        return Err(TrainerError::Training("no training rows".to_string()));
    }
    if features.len() != targets.len() {
        return Err(TrainerError::Training(format!(
            "{} feature rows but {} targets",
            features.len(),
            targets.len()
        )));
    }
    let width = features[0].len();
    if let Some(row) = features.iter().position(|r| r.len() != width) {
        return Err(TrainerError::Training(format!(
            "row {row} has {} features, expected {width}",
            features[row].len()
        )));
    }
    Ok(())
}
