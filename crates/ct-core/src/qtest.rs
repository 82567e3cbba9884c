//! Dixon's Q test for a single high outlier.

use crate::types::Confidence;

/// Critical values indexed by tier, then by sample size 3..=10.
const Q_TABLE: [[f64; 8]; 3] = [
    [0.941, 0.765, 0.642, 0.560, 0.507, 0.468, 0.437, 0.412],
    [0.970, 0.829, 0.710, 0.625, 0.568, 0.526, 0.493, 0.466],
    [0.994, 0.926, 0.821, 0.740, 0.680, 0.634, 0.598, 0.568],
];

const MIN_SAMPLE: usize = 3;
const MAX_TABLE_SAMPLE: usize = 10;

/// Confidence level snapped to a column of the critical value table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Ninety,
    NinetyFive,
    NinetyNine,
}

impl Tier {
    pub fn of(confidence: Confidence) -> Self {
        let c = confidence.value();
        if c < 0.95 {
            Self::Ninety
        } else if c < 0.99 {
            Self::NinetyFive
        } else {
            Self::NinetyNine
        }
    }

    const fn row(self) -> usize {
        match self {
            Self::Ninety => 0,
            Self::NinetyFive => 1,
            Self::NinetyNine => 2,
        }
    }
}

/// Critical Q for `n` points, with `n` capped at 10. `None` below 3 points.
pub fn q_critical(n: usize, tier: Tier) -> Option<f64> {
    if n < MIN_SAMPLE {
        return None;
    }
    let column = n.min(MAX_TABLE_SAMPLE) - MIN_SAMPLE;
    Some(Q_TABLE[tier.row()][column])
}

/// Drops one occurrence of the maximum if it is an outlier at `confidence`.
///
/// Samples of fewer than three points, and samples with zero range, are
/// returned unchanged. The test runs once and never recurses.
pub fn q_test(sample: &[f64], confidence: Confidence) -> Vec<f64> {
    let Some(critical) = q_critical(sample.len(), Tier::of(confidence)) else {
        return sample.to_vec();
    };

    let min = sample.iter().copied().fold(f64::INFINITY, f64::min);
    let Some(max_at) = index_of_max(sample) else {
        return sample.to_vec();
    };
    let max = sample[max_at];
    let range = max - min;
    if range <= 0.0 {
        return sample.to_vec();
    }

    // A duplicated maximum is its own runner-up, giving a zero gap.
    let runner_up = sample
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != max_at)
        .map(|(_, &x)| x)
        .fold(f64::NEG_INFINITY, f64::max);
    let gap = max - runner_up;

    if gap / range <= critical {
        return sample.to_vec();
    }

    tracing::debug!(max, gap, range, critical, "rejecting outlier");
    sample
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != max_at)
        .map(|(_, &x)| x)
        .collect()
}

fn index_of_max(sample: &[f64]) -> Option<usize> {
    sample
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)
}
