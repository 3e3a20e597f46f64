//! Timing statistics over repeated runs.

use serde::{Deserialize, Serialize};

/// Aggregate of a set of millisecond durations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Arithmetic mean
    pub avg: f64,
    /// Smallest sample
    pub min: f64,
    /// Largest sample
    pub max: f64,
    /// Population standard deviation (divides by N)
    pub std_dev: f64,
    /// Median, nearest rank
    pub p50: f64,
    /// 95th percentile, nearest rank
    pub p95: f64,
    /// 99th percentile, nearest rank
    pub p99: f64,
}

impl Stats {
    /// Computes the statistics of `samples`. Returns `None` when there are no samples.
    pub fn from_samples(samples: &[f64]) -> Option<Stats> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let n = sorted.len() as f64;
        let avg = sorted.iter().sum::<f64>() / n;
        let variance = sorted.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / n;

        Some(Stats {
            avg,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            std_dev: variance.sqrt(),
            p50: percentile(&sorted, 50.0),
            p95: percentile(&sorted, 95.0),
            p99: percentile(&sorted, 99.0),
        })
    }
}

/// Nearest-rank percentile: `sorted[clamp(ceil(p/100 * n) - 1, 0, n - 1)]`.
///
/// `sorted` must be ascending and non-empty.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    // p * n first so that integer percentiles of integer counts stay exact
    let rank = (p * n as f64 / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted[index]
}
