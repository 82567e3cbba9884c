//! Tunable parameters for classification, estimation and planning.
//!
//! The shape and clamp constants have no derivation beyond producing a
//! right-skewed interval; they are kept overridable rather than fixed.

use serde::{Deserialize, Serialize};

use crate::types::{ConfigError, Confidence};

/// Which workflow states stop the cycle-time clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Backlog states. Entering one of these never starts the clock and
    /// stops it when running.
    pub waiting_states: Vec<String>,

    /// States that stop a running clock without being backlog states.
    /// Add `"finished"` here to stop counting once work is delivered.
    pub stopping_states: Vec<String>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            waiting_states: vec!["unstarted".to_string(), "unscheduled".to_string()],
            stopping_states: vec!["accepted".to_string()],
        }
    }
}

impl WorkflowConfig {
    pub fn is_waiting(&self, state: &str) -> bool {
        self.waiting_states.iter().any(|s| s == state)
    }

    /// Whether entering `state` stops a running clock.
    pub fn pauses(&self, state: &str) -> bool {
        self.is_waiting(state) || self.stopping_states.iter().any(|s| s == state)
    }
}

/// Central tendency used by the parametric estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeanKind {
    #[default]
    Arithmetic,
    Geometric,
}

/// Parameters of the outlier-rejecting parametric estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametricConfig {
    /// First shape parameter of the Beta distribution giving `z`.
    pub shape_a: f64,
    /// Second shape parameter of the Beta distribution giving `z`.
    pub shape_b: f64,
    /// Keeps the optimistic bound at or above `mean * (1 - 1/clamp)`.
    pub clamp: f64,
    pub mean: MeanKind,
}

impl Default for ParametricConfig {
    fn default() -> Self {
        Self {
            shape_a: 5.0,
            shape_b: 1.0,
            clamp: 4.0,
            mean: MeanKind::Arithmetic,
        }
    }
}

impl ParametricConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shape("parametric", self.shape_a, self.shape_b)?;
        if !self.clamp.is_finite() || self.clamp <= 0.0 {
            return Err(ConfigError::InvalidClamp { value: self.clamp });
        }
        Ok(())
    }
}

/// Aggregate computed for every synthetic sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    #[default]
    Median,
    Mean,
}

/// Parameters of the skewed resampling estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResamplingConfig {
    /// Number of resampling rounds, `B`.
    pub resamples: usize,
    /// First shape parameter of the Beta distribution drawing indices.
    pub shape_a: f64,
    /// Second shape parameter of the Beta distribution drawing indices.
    pub shape_b: f64,
    pub statistic: Statistic,
    /// Percentile fraction of the optimistic bound.
    pub low: f64,
    /// Percentile fraction of the pessimistic bound.
    pub high: f64,
}

impl Default for ResamplingConfig {
    fn default() -> Self {
        Self {
            resamples: 1999,
            shape_a: 1.0,
            shape_b: 14.0,
            statistic: Statistic::Median,
            low: 0.05,
            high: 0.95,
        }
    }
}

impl ResamplingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_shape("resampling", self.shape_a, self.shape_b)?;
        if self.low >= self.high {
            return Err(ConfigError::PercentileOrder {
                low: self.low,
                high: self.high,
            });
        }
        percentile_index(self.low, self.resamples)?;
        percentile_index(self.high, self.resamples)?;
        Ok(())
    }
}

/// Zero-based index of percentile `fraction` among `resamples` sorted values.
///
/// The rank is `fraction * (resamples + 1)`, which must be a whole number in
/// `1..=resamples`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile_index(fraction: f64, resamples: usize) -> Result<usize, ConfigError> {
    const TOLERANCE: f64 = 1e-9;

    if resamples == 0 {
        return Err(ConfigError::ZeroResamples);
    }
    let rank = fraction * (resamples + 1) as f64;
    if !rank.is_finite() || (rank - rank.round()).abs() > TOLERANCE {
        return Err(ConfigError::NonIntegralRank {
            fraction,
            resamples,
        });
    }
    let rank = rank.round() as i64;
    if rank < 1 || rank as usize > resamples {
        return Err(ConfigError::RankOutOfRange {
            fraction,
            rank,
            resamples,
        });
    }
    Ok(rank as usize - 1)
}

fn validate_shape(name: &'static str, a: f64, b: f64) -> Result<(), ConfigError> {
    let valid = |x: f64| x.is_finite() && x > 0.0;
    if valid(a) && valid(b) {
        Ok(())
    } else {
        Err(ConfigError::InvalidShape { name, a, b })
    }
}

/// Interval estimation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Parametric,
    #[default]
    Resampling,
}

/// Everything needed to turn duration samples into intervals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub method: Method,
    pub confidence: Confidence,
    /// Seed for the resampling generator. Drawn from entropy when unset.
    pub seed: Option<u64>,
    pub parametric: ParametricConfig,
    pub resampling: ResamplingConfig,
}

impl EstimatorConfig {
    /// Checks the parameters of the selected method.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.method {
            Method::Parametric => self.parametric.validate(),
            Method::Resampling => self.resampling.validate(),
        }
    }
}
