//! Outlier-rejecting parametric interval.
//!
//! After one pass of [`q_test`], the interval is
//! `mean ± z * sd / sqrt(n)` where `z` is a quantile of a Beta distribution
//! rather than a normal one. The lower arm is clamped so the optimistic bound
//! never drops below `mean * (1 - 1/clamp)`.

use rand::Rng;
use serde::Serialize;
use statrs::distribution::{Beta, ContinuousCDF};
use statrs::statistics::Statistics;

use crate::config::{MeanKind, ParametricConfig};
use crate::estimate::{EstimateError, IntervalEstimator};
use crate::qtest::q_test;
use crate::types::{ConfidenceInterval, ConfigError, Confidence};

/// Summary of one category's sample, in hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CycleTimeStat {
    pub mean: f64,
    /// Sample standard deviation; `None` when fewer than two points survive.
    pub std_dev: Option<f64>,
    /// Size of the sample before outlier rejection.
    pub sample_size: usize,
}

impl CycleTimeStat {
    /// Standard deviation, or half the mean when it is undefined.
    pub fn adjusted_std_dev(&self) -> f64 {
        self.std_dev.unwrap_or(self.mean / 2.0)
    }

    #[allow(clippy::cast_precision_loss)]
    fn standard_error(&self) -> f64 {
        self.adjusted_std_dev() / (self.sample_size as f64).sqrt()
    }

    pub fn optimistic(&self, z: f64, clamp: f64) -> f64 {
        self.mean - z * self.standard_error().min(self.mean / (clamp * z))
    }

    pub fn pessimistic(&self, z: f64) -> f64 {
        self.mean + z * self.standard_error()
    }
}

/// Interval estimator built on [`CycleTimeStat`].
#[derive(Debug, Clone, Copy)]
pub struct ParametricEstimator {
    config: ParametricConfig,
    confidence: Confidence,
    z: f64,
}

impl ParametricEstimator {
    pub fn new(config: ParametricConfig, confidence: Confidence) -> Result<Self, ConfigError> {
        config.validate()?;
        let beta = Beta::new(config.shape_a, config.shape_b).map_err(|_| {
            ConfigError::InvalidShape {
                name: "parametric",
                a: config.shape_a,
                b: config.shape_b,
            }
        })?;
        let z = beta_quantile(&beta, confidence.upper_tail());
        Ok(Self {
            config,
            confidence,
            z,
        })
    }

    /// Rejects at most one outlier and summarizes what remains.
    pub fn summarize(&self, hours: &[f64]) -> Result<CycleTimeStat, EstimateError> {
        if hours.is_empty() {
            return Err(EstimateError::EmptySample);
        }
        let filtered = q_test(hours, self.confidence);
        let mean = match self.config.mean {
            MeanKind::Arithmetic => filtered.iter().mean(),
            MeanKind::Geometric => filtered.iter().geometric_mean(),
        };
        let std_dev = Some(filtered.iter().std_dev()).filter(|sd| sd.is_finite());
        Ok(CycleTimeStat {
            mean,
            std_dev,
            sample_size: hours.len(),
        })
    }
}

/// Inverts the CDF by bisection over the unit interval.
fn beta_quantile(beta: &Beta, p: f64) -> f64 {
    const STEPS: usize = 64;

    let (mut low, mut high) = (0.0_f64, 1.0_f64);
    for _ in 0..STEPS {
        let mid = 0.5 * (low + high);
        if beta.cdf(mid) < p {
            low = mid;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

impl IntervalEstimator for ParametricEstimator {
    fn estimate<R: Rng + ?Sized>(
        &self,
        hours: &[f64],
        _rng: &mut R,
    ) -> Result<ConfidenceInterval, EstimateError> {
        let stat = self.summarize(hours)?;
        tracing::debug!(
            mean = stat.mean,
            std_dev = stat.adjusted_std_dev(),
            sample_size = stat.sample_size,
            "parametric summary"
        );
        Ok(ConfidenceInterval::from_hours(
            stat.optimistic(self.z, self.config.clamp),
            stat.pessimistic(self.z),
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_relative_eq;
    use rand::rngs::mock::StepRng;

    fn estimator(confidence: f64) -> ParametricEstimator {
        ParametricEstimator::new(
            ParametricConfig::default(),
            Confidence::new(confidence).unwrap(),
        )
        .unwrap()
    }

    fn interval(estimator: &ParametricEstimator, hours: &[f64]) -> ConfidenceInterval {
        estimator.estimate(hours, &mut StepRng::new(0, 1)).unwrap()
    }

    #[test]
    fn z_is_the_beta_quantile() {
        // Beta(5, 1) has CDF x^5.
        let z = estimator(0.95).z;
        assert_relative_eq!(z, 0.975_f64.powf(0.2), epsilon = 1e-9);
    }

    #[test]
    fn summary_drops_outlier_but_keeps_original_size() {
        let stat = estimator(0.95).summarize(&[1.0, 2.0, 3.0, 100.0]).unwrap();
        assert_relative_eq!(stat.mean, 2.0);
        assert_relative_eq!(stat.std_dev.unwrap(), 1.0);
        assert_eq!(stat.sample_size, 4);
    }

    #[test]
    fn single_point_falls_back_to_half_mean() {
        let stat = estimator(0.95).summarize(&[48.0]).unwrap();
        assert_eq!(stat.std_dev, None);
        assert_relative_eq!(stat.adjusted_std_dev(), 24.0);
    }

    #[test]
    fn interval_matches_closed_form() {
        let est = estimator(0.95);
        let z = est.z;
        let ci = interval(&est, &[24.0, 48.0, 72.0]);

        let se = 24.0 / 3.0_f64.sqrt();
        assert_relative_eq!(ci.pessimistic, (48.0 + z * se) / 24.0, epsilon = 1e-9);
        let lower_arm = se.min(48.0 / (4.0 * z));
        assert_relative_eq!(ci.optimistic, (48.0 - z * lower_arm) / 24.0, epsilon = 1e-9);
        assert_eq!(ci.median, None);
    }

    #[test]
    fn clamp_keeps_optimistic_positive_for_wide_samples() {
        let est = estimator(0.99);
        let ci = interval(&est, &[1.0, 2.0, 90.0, 95.0, 100.0]);
        assert!(ci.optimistic > 0.0);
        assert!(ci.optimistic <= ci.pessimistic);
    }

    #[test]
    fn higher_confidence_never_narrows_the_interval() {
        let hours = [5.0, 8.0, 13.0, 21.0, 34.0, 40.0];
        let mut last_width = 0.0;
        for c in [0.5, 0.8, 0.9, 0.95, 0.99, 0.999] {
            let ci = interval(&estimator(c), &hours);
            let width = ci.pessimistic - ci.optimistic;
            assert!(width >= last_width, "width shrank at confidence {c}");
            assert!(ci.optimistic <= ci.pessimistic);
            last_width = width;
        }
    }

    #[test]
    fn geometric_mean_is_supported() {
        let config = ParametricConfig {
            mean: MeanKind::Geometric,
            ..ParametricConfig::default()
        };
        let est = ParametricEstimator::new(config, Confidence::default()).unwrap();
        let stat = est.summarize(&[2.0, 8.0]).unwrap();
        assert_relative_eq!(stat.mean, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn empty_sample_is_an_error() {
        assert!(matches!(
            estimator(0.95).summarize(&[]),
            Err(EstimateError::EmptySample)
        ));
    }
}
