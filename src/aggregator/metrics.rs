//! Stall duration statistics.
//!
//! A single pass over the accepted durations, independent of the graph.
//! Percentiles use the nearest-rank method.

use log::debug;
use serde::{Deserialize, Serialize};

/// Summary statistics over stall durations (milliseconds)
///
/// **Public** - returned from calculate_stall_distribution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StallDistribution {
    /// Number of stalls
    pub count: usize,

    /// Sum of all stall durations
    pub total: u64,

    pub min: u64,
    pub max: u64,

    /// Mean duration, rounded down
    pub mean: u64,

    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

/// Calculate duration statistics
///
/// **Public** - main entry point for the statistics summary
///
/// # Arguments
/// * `durations` - Durations of the stalls that were aggregated
///
/// # Returns
/// Distribution summary; all zeros for empty input
pub fn calculate_stall_distribution(durations: &[u64]) -> StallDistribution {
    if durations.is_empty() {
        return StallDistribution::default();
    }

    let mut sorted = durations.to_vec();
    sorted.sort_unstable();

    let count = sorted.len();
    let total = sorted.iter().fold(0u64, |acc, d| acc.saturating_add(*d));
    debug!("Computing stall distribution over {} durations", count);

    StallDistribution {
        count,
        total,
        min: sorted[0],
        max: sorted[count - 1],
        mean: total / count as u64,
        p50: percentile(&sorted, 50.0),
        p90: percentile(&sorted, 90.0),
        p99: percentile(&sorted, 99.0),
        p999: percentile(&sorted, 99.9),
    }
}

/// Nearest-rank percentile of a sorted, non-empty slice
///
/// **Private** - internal helper
fn percentile(sorted: &[u64], pct: f64) -> u64 {
    let rank = (pct / 100.0 * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

impl StallDistribution {
    /// Get human-readable summary
    ///
    /// **Public** - for logging and the `--summary` block
    pub fn summary(&self) -> String {
        format!(
            "Stalls: {} | Total: {} ms | Min: {} | Mean: {} | Max: {} | p50: {} | p90: {} | p99: {} | p99.9: {}",
            self.count,
            self.total,
            self.min,
            self.mean,
            self.max,
            self.p50,
            self.p90,
            self.p99,
            self.p999
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_empty() {
        let dist = calculate_stall_distribution(&[]);
        assert_eq!(dist, StallDistribution::default());
    }

    #[test]
    fn test_distribution_percentiles() {
        let durations: Vec<u64> = (1..=100).collect();
        let dist = calculate_stall_distribution(&durations);

        assert_eq!(dist.count, 100);
        assert_eq!(dist.total, 5050);
        assert_eq!(dist.min, 1);
        assert_eq!(dist.max, 100);
        assert_eq!(dist.mean, 50);
        assert_eq!(dist.p50, 50);
        assert_eq!(dist.p90, 90);
        assert_eq!(dist.p99, 99);
        assert_eq!(dist.p999, 100);
    }

    #[test]
    fn test_distribution_single_value() {
        let dist = calculate_stall_distribution(&[42]);
        assert_eq!(dist.p50, 42);
        assert_eq!(dist.p999, 42);
        assert!(dist.summary().contains("Stalls: 1"));
    }
}
