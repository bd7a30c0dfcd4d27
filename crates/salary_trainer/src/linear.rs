//! Ordinary least squares on standardized features
//!
//! Solves the centered normal equations with a Cholesky factorization.
//! Singular systems (constant or collinear columns) are retried with a
//! small, growing ridge term instead of failing.

use salarium_core::config::LinearConfig;
use salarium_core::{LinearModel, TrainedModel};
use tracing::{debug, warn};

use crate::errors::{check_shapes, Result};
use crate::regressor::Regressor;

const MAX_RIDGE_ATTEMPTS: usize = 12;

/// Linear regression trainer
pub struct LinearTrainer {
    config: LinearConfig,
}

impl LinearTrainer {
    pub fn new(config: LinearConfig) -> Self {
        Self { config }
    }

    pub fn train(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<LinearModel> {
        check_shapes(features, targets)?;

        let n = features.len() as f64;
        let p = features[0].len();

        let mut x_mean = vec![0.0; p];
        for row in features {
            for (mean, x) in x_mean.iter_mut().zip(row) {
                *mean += x;
            }
        }
        for mean in &mut x_mean {
            *mean /= n;
        }
        let y_mean = targets.iter().sum::<f64>() / n;

        // X'X and X'y over centered columns
        let mut gram = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for (row, &y) in features.iter().zip(targets) {
            let centered: Vec<f64> = row.iter().zip(&x_mean).map(|(x, m)| x - m).collect();
            let dy = y - y_mean;
            for j in 0..p {
                xty[j] += centered[j] * dy;
                for k in 0..=j {
                    gram[j][k] += centered[j] * centered[k];
                }
            }
        }
        for j in 0..p {
            for k in 0..j {
                gram[k][j] = gram[j][k];
            }
        }

        let coefficients = self.solve(&gram, &xty);
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_mean)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        Ok(LinearModel {
            coefficients,
            intercept,
        })
    }

    /// Solve `gram * w = rhs`, adding ridge when the system is singular
    fn solve(&self, gram: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
        if let Some(w) = cholesky_solve(gram, rhs) {
            return w;
        }

        let max_diag = (0..gram.len()).map(|i| gram[i][i]).fold(1.0, f64::max);
        let mut ridge = self.config.singular_ridge.max(f64::EPSILON) * max_diag;

        for attempt in 1..=MAX_RIDGE_ATTEMPTS {
            let mut regularized = gram.to_vec();
            for (i, row) in regularized.iter_mut().enumerate() {
                row[i] += ridge;
            }
            if let Some(w) = cholesky_solve(&regularized, rhs) {
                debug!(ridge, attempt, "Solved singular normal equations with ridge");
                return w;
            }
            ridge *= 10.0;
        }

        warn!("Normal equations could not be solved; falling back to intercept-only model");
        vec![0.0; rhs.len()]
    }
}

impl Regressor for LinearTrainer {
    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<TrainedModel> {
        self.train(features, targets).map(TrainedModel::Linear)
    }
}

/// Solve a symmetric positive-definite system; `None` if it is not SPD
fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Option<Vec<f64>> {
    let n = a.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(1.0, f64::max);
    let mut l = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let pivot = a[i][i] - sum;
                if !(pivot > 1e-10 * scale) {
                    return None;
                }
                l[i][j] = pivot.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }

    // Forward: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[i][k] * z[k]).sum();
        z[i] = (b[i] - sum) / l[i][i];
    }

    // Backward: L' x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (z[i] - sum) / l[i][i];
    }

    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
