//! Seeded train/evaluation split

use salarium_core::EncodedDataset;

use crate::deterministic::LcgRng;

/// Rows assigned to training and to held-out evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: EncodedDataset,
    pub eval: EncodedDataset,
}

/// Number of held-out rows for `n` rows: `ceil(n * fraction)`, leaving at
/// least one training row.
pub fn eval_size(n: usize, test_fraction: f64) -> usize {
    if n < 2 {
        return n;
    }
    // Absorb rounding such as 60 * 0.2 = 12.000000000000002
    let raw = (n as f64 * test_fraction - 1e-9).ceil() as usize;
    raw.clamp(1, n - 1)
}

/// Shuffle rows with `seed` and hold out the first `eval_size` of them.
///
/// A single-row dataset is used for both training and evaluation.
pub fn train_test_split(data: &EncodedDataset, test_fraction: f64, seed: u64) -> TrainTestSplit {
    let n = data.len();
    if n < 2 {
        return TrainTestSplit {
            train: data.clone(),
            eval: data.clone(),
        };
    }

    let mut rng = LcgRng::new(seed);
    let order = rng.permutation(n);
    let n_eval = eval_size(n, test_fraction);

    let select = |indices: &[usize]| EncodedDataset {
        features: indices.iter().map(|&i| data.features[i].clone()).collect(),
        targets: indices.iter().map(|&i| data.targets[i]).collect(),
    };

    TrainTestSplit {
        eval: select(&order[..n_eval]),
        train: select(&order[n_eval..]),
    }
}
