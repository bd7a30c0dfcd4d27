//! Held-out regression metrics

use serde::{Deserialize, Serialize};

/// MAE, RMSE and R² of one model on the evaluation split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
    /// Number of evaluation rows the figures were computed on
    pub samples: usize,
}

impl ModelMetrics {
    /// Compare predictions against targets.
    ///
    /// An empty evaluation split yields NaN figures. A constant target gives
    /// R² = 1 for a perfect fit and 0 otherwise.
    pub fn evaluate(targets: &[f64], predictions: &[f64]) -> Self {
        let n = targets.len().min(predictions.len());
        if n == 0 {
            return Self {
                mae: f64::NAN,
                rmse: f64::NAN,
                r2: f64::NAN,
                samples: 0,
            };
        }

        let pairs = targets.iter().zip(predictions).take(n);
        let (abs_sum, sq_sum) = pairs.fold((0.0, 0.0), |(abs, sq), (&y, &p)| {
            let err = y - p;
            (abs + err.abs(), sq + err * err)
        });

        let mean = targets[..n].iter().sum::<f64>() / n as f64;
        let ss_tot: f64 = targets[..n].iter().map(|&y| (y - mean) * (y - mean)).sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - sq_sum / ss_tot
        } else if sq_sum == 0.0 {
            1.0
        } else {
            0.0
        };

        Self {
            mae: abs_sum / n as f64,
            rmse: (sq_sum / n as f64).sqrt(),
            r2,
            samples: n,
        }
    }
}
