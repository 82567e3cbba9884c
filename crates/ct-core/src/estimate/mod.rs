//! Confidence intervals for per-category cycle times.
//!
//! Two interchangeable strategies implement [`IntervalEstimator`]:
//! - [`ParametricEstimator`]: outlier rejection, then a Beta-skewed
//!   mean ± spread interval
//! - [`ResamplingEstimator`]: percentile bounds over skewed resamples
//!
//! Input samples are in hours; intervals come out in days.

mod parametric;
mod resampling;

use std::collections::BTreeMap;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use thiserror::Error;

pub use parametric::{CycleTimeStat, ParametricEstimator};
pub use resampling::ResamplingEstimator;

use crate::config::{EstimatorConfig, Method};
use crate::types::{Category, ConfidenceInterval, ConfigError, CycleTimes};

/// Estimation errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EstimateError {
    /// A category had no durations.
    #[error("cannot estimate an empty sample")]
    EmptySample,
    /// The estimator could not be built.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Turns one category's durations into an interval.
pub trait IntervalEstimator {
    /// `hours` may be in any order. Implementations that do not draw random
    /// numbers ignore `rng`.
    fn estimate<R: Rng + ?Sized>(
        &self,
        hours: &[f64],
        rng: &mut R,
    ) -> Result<ConfidenceInterval, EstimateError>;
}

/// The strategy selected by [`EstimatorConfig::method`].
#[derive(Debug, Clone)]
pub enum Estimator {
    Parametric(ParametricEstimator),
    Resampling(ResamplingEstimator),
}

impl Estimator {
    pub fn from_config(config: &EstimatorConfig) -> Result<Self, ConfigError> {
        match config.method {
            Method::Parametric => Ok(Self::Parametric(ParametricEstimator::new(
                config.parametric,
                config.confidence,
            )?)),
            Method::Resampling => Ok(Self::Resampling(ResamplingEstimator::new(
                config.resampling,
            )?)),
        }
    }
}

impl IntervalEstimator for Estimator {
    fn estimate<R: Rng + ?Sized>(
        &self,
        hours: &[f64],
        rng: &mut R,
    ) -> Result<ConfidenceInterval, EstimateError> {
        match self {
            Self::Parametric(estimator) => estimator.estimate(hours, rng),
            Self::Resampling(estimator) => estimator.estimate(hours, rng),
        }
    }
}

/// Estimates every category of `cycle_times` in parallel.
///
/// Category `i` (in sorted order) draws from a generator seeded with
/// `seed + i`, so a fixed seed reproduces the whole mapping.
pub fn estimate_all(
    cycle_times: &CycleTimes,
    config: &EstimatorConfig,
) -> Result<BTreeMap<Category, ConfidenceInterval>, EstimateError> {
    let estimator = Estimator::from_config(config)?;
    let seed = config
        .seed
        .unwrap_or_else(|| rand::thread_rng().next_u64());

    let samples: Vec<(Category, Vec<f64>)> = cycle_times.hours().into_iter().collect();
    samples
        .into_par_iter()
        .enumerate()
        .map(|(i, (category, hours))| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64));
            let interval = estimator.estimate(&hours, &mut rng)?;
            tracing::info!(
                %category,
                optimistic = interval.optimistic,
                pessimistic = interval.pessimistic,
                median = interval.median,
                samples = hours.len(),
                "estimated cycle time (days)"
            );
            Ok((category, interval))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;

    use crate::config::ResamplingConfig;

    fn cycle_times() -> CycleTimes {
        [
            ("feature:3", 30),
            ("feature:3", 50),
            ("feature:3", 44),
            ("feature:3", 61),
            ("bug:1", 4),
            ("bug:1", 7),
            ("bug:1", 5),
        ]
        .into_iter()
        .map(|(category, hours)| (Category::new(category).unwrap(), Duration::hours(hours)))
        .collect()
    }

    #[test]
    fn seeded_estimates_are_reproducible() {
        let config = EstimatorConfig {
            seed: Some(42),
            ..EstimatorConfig::default()
        };
        let first = estimate_all(&cycle_times(), &config).unwrap();
        let second = estimate_all(&cycle_times(), &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert!(first["bug:1"].pessimistic < first["feature:3"].optimistic);
    }

    #[test]
    fn parametric_method_has_no_median() {
        let config = EstimatorConfig {
            method: Method::Parametric,
            ..EstimatorConfig::default()
        };
        let intervals = estimate_all(&cycle_times(), &config).unwrap();
        assert!(intervals.values().all(|ci| ci.median.is_none()));
        assert!(
            intervals
                .values()
                .all(|ci| ci.optimistic <= ci.pessimistic)
        );
    }

    #[test]
    fn invalid_config_fails_before_estimating() {
        let config = EstimatorConfig {
            resampling: ResamplingConfig {
                resamples: 500,
                ..ResamplingConfig::default()
            },
            ..EstimatorConfig::default()
        };
        assert!(matches!(
            estimate_all(&cycle_times(), &config),
            Err(EstimateError::Config(ConfigError::NonIntegralRank { .. }))
        ));
    }

    #[test]
    fn empty_category_is_reported() {
        let json = r#"{"chore:0":[]}"#;
        let cycle_times: CycleTimes = serde_json::from_str(json).unwrap();
        assert_eq!(
            estimate_all(&cycle_times, &EstimatorConfig::default()),
            Err(EstimateError::EmptySample)
        );
    }
}
