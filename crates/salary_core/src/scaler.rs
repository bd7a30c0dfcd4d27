//! Standard (z-score) feature scaling for the linear model

use serde::{Deserialize, Serialize};

/// Per-column mean and standard deviation fitted on the training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    /// Population standard deviations; constant columns store 1.0
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on a row-major matrix
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() {
            return Self {
                means: vec![0.0; n_features],
                scales: vec![1.0; n_features],
            };
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; n_features];
        for row in rows {
            for (mean, &value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n;
        }

        let mut scales = vec![0.0; n_features];
        for row in rows {
            for ((acc, &value), &mean) in scales.iter_mut().zip(row).zip(&means) {
                *acc += (value - mean) * (value - mean);
            }
        }
        for scale in &mut scales {
            let std = (*scale / n).sqrt();
            *scale = if std > f64::EPSILON { std } else { 1.0 };
        }

        Self { means, scales }
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(&value, (&mean, &scale))| (value - mean) / scale)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_transform_centers_and_scales() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
        let scaler = StandardScaler::fit(&rows);

        assert_eq!(scaler.means, vec![2.0, 10.0]);
        assert_eq!(scaler.scales, vec![1.0, 1.0]);
        assert_eq!(scaler.transform_row(&[3.0, 12.0]), vec![1.0, 2.0]);
    }

    #[test]
    fn test_scaled_columns_have_unit_variance() {
        let rows = vec![vec![2.0], vec![4.0], vec![4.0], vec![4.0], vec![5.0], vec![5.0], vec![7.0], vec![9.0]];
        let scaler = StandardScaler::fit(&rows);
        assert!((scaler.scales[0] - 2.0).abs() < 1e-12);

        let scaled = scaler.transform(&rows);
        let mean: f64 = scaled.iter().map(|r| r[0]).sum::<f64>() / scaled.len() as f64;
        let var: f64 = scaled.iter().map(|r| (r[0] - mean).powi(2)).sum::<f64>() / scaled.len() as f64;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_input() {
        let scaler = StandardScaler::fit(&[]);
        assert!(scaler.means.is_empty());
    }
}
