//! Skewed resampling interval.
//!
//! Each round draws a synthetic sample of the original size from the sorted
//! durations. Indices come from a Beta variate scaled to the index range,
//! which favours the shorter observations and damps the long right tail.
//! The per-round aggregates are sorted and the bounds are read at fixed
//! percentile ranks.

use rand::Rng;
use rand_distr::{Beta, Distribution};
use statrs::statistics::{Data, Median, Statistics};

use crate::config::{ResamplingConfig, Statistic, percentile_index};
use crate::estimate::{EstimateError, IntervalEstimator};
use crate::types::{ConfidenceInterval, ConfigError};

#[derive(Debug, Clone)]
pub struct ResamplingEstimator {
    config: ResamplingConfig,
    index_shape: Beta<f64>,
    low_index: usize,
    high_index: usize,
}

impl ResamplingEstimator {
    pub fn new(config: ResamplingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let index_shape = Beta::new(config.shape_a, config.shape_b).map_err(|_| {
            ConfigError::InvalidShape {
                name: "resampling",
                a: config.shape_a,
                b: config.shape_b,
            }
        })?;
        Ok(Self {
            config,
            index_shape,
            low_index: percentile_index(config.low, config.resamples)?,
            high_index: percentile_index(config.high, config.resamples)?,
        })
    }

    /// Sorted aggregates of `B` skewed resamples of `sorted`.
    ///
    /// `sorted` must be non-empty and in ascending order.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn distribution<R: Rng + ?Sized>(&self, sorted: &[f64], rng: &mut R) -> Vec<f64> {
        let max_index = sorted.len().saturating_sub(1);
        let mut synthetic = Vec::with_capacity(sorted.len());
        let mut aggregates: Vec<f64> = (0..self.config.resamples)
            .map(|_| {
                synthetic.clear();
                synthetic.extend((0..sorted.len()).map(|_| {
                    let v: f64 = self.index_shape.sample(rng);
                    let index = (v * max_index as f64).round() as usize;
                    sorted[index.min(max_index)]
                }));
                match self.config.statistic {
                    Statistic::Median => Data::new(synthetic.clone()).median(),
                    Statistic::Mean => synthetic.iter().mean(),
                }
            })
            .collect();
        aggregates.sort_by(f64::total_cmp);
        aggregates
    }
}

impl IntervalEstimator for ResamplingEstimator {
    fn estimate<R: Rng + ?Sized>(
        &self,
        hours: &[f64],
        rng: &mut R,
    ) -> Result<ConfidenceInterval, EstimateError> {
        if hours.is_empty() {
            return Err(EstimateError::EmptySample);
        }
        let mut sorted = hours.to_vec();
        sorted.sort_by(f64::total_cmp);

        let aggregates = self.distribution(&sorted, rng);
        let central = median_of_sorted(&aggregates);
        Ok(ConfidenceInterval::from_hours(
            aggregates[self.low_index],
            aggregates[self.high_index],
            Some(central),
        ))
    }
}

fn median_of_sorted(xs: &[f64]) -> f64 {
    let n = xs.len();
    match n {
        0 => 0.0,
        _ if n % 2 == 0 => (xs[n / 2 - 1] + xs[n / 2]) / 2.0,
        _ => xs[n / 2],
    }
}
