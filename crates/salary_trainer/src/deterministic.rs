//! Deterministic utilities for reproducible training
//!
//! Seeded LCG, Fisher-Yates permutation and split tie-breaking, so that the
//! same data and seed always produce the same split and the same trees.

use std::cmp::Ordering;
use std::num::Wrapping;

/// 64-bit Linear Congruential Generator (Knuth MMIX constants)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<u64>,
}

impl LcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    pub fn new(seed: u64) -> Self {
        let mut rng = Self {
            state: Wrapping(seed),
        };
        // Discard the first output so nearby seeds diverge immediately
        rng.next_u32();
        rng
    }

    /// Next 32 random bits (taken from the high half of the state)
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        (self.state.0 >> 32) as u32
    }

    /// Uniform value in [0, max); 0 when `max == 0`
    pub fn next_range(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        ((self.next_u32() as u64 * max as u64) >> 32) as usize
    }

    /// Uniform value in [0.0, 1.0)
    pub fn next_unit(&mut self) -> f64 {
        self.next_u32() as f64 / (u32::MAX as f64 + 1.0)
    }

    /// In-place Fisher-Yates shuffle
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_range(i + 1);
            items.swap(i, j);
        }
    }

    /// Random permutation of `0..n`
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        self.shuffle(&mut indices);
        indices
    }

    /// `k` distinct values from `0..n`, in ascending order
    pub fn sample_without_replacement(&mut self, n: usize, k: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..n).collect();
        let k = k.min(n);
        for i in 0..k {
            let j = i + self.next_range(n - i);
            indices.swap(i, j);
        }
        indices.truncate(k);
        indices.sort_unstable();
        indices
    }
}

/// Deterministic tie-breaker for split selection.
///
/// Among equal gains the split with the lower (feature, threshold, node)
/// wins.
#[derive(Debug, Clone, Copy)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}

impl PartialEq for SplitTieBreaker {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SplitTieBreaker {}

impl PartialOrd for SplitTieBreaker {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SplitTieBreaker {
    fn cmp(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then_with(|| self.threshold.total_cmp(&other.threshold))
            .then_with(|| self.node_id.cmp(&other.node_id))
    }
}

/// Whether candidate (gain, tie) beats the current best
pub fn is_better_split(
    gain: f64,
    tie: &SplitTieBreaker,
    best_gain: f64,
    best_tie: &SplitTieBreaker,
) -> bool {
    match gain.total_cmp(&best_gain) {
        Ordering::Greater => true,
        Ordering::Equal => tie < best_tie,
        Ordering::Less => false,
    }
}
