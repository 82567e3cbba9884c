//! Core type definitions with validation.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MS_PER_HOUR: f64 = 3_600_000.0;
const NS_PER_HOUR: f64 = 3_600_000_000_000.0;
const HOURS_PER_DAY: f64 = 24.0;

/// Configuration errors. All of these are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The confidence value was outside the open interval (0, 1).
    #[error("confidence must be strictly between 0.0 and 1.0, got {value}")]
    ConfidenceOutOfRange { value: f64 },

    /// A plan needs at least one track.
    #[error("track count must be at least 1")]
    ZeroTracks,

    /// The resampling estimator needs at least one round.
    #[error("resample count must be at least 1")]
    ZeroResamples,

    /// A percentile fraction does not land on a whole rank.
    #[error("percentile {fraction} does not give an integral rank for {resamples} resamples")]
    NonIntegralRank { fraction: f64, resamples: usize },

    /// A percentile rank falls outside `1..=resamples`.
    #[error("percentile {fraction} gives rank {rank}, outside 1..={resamples}")]
    RankOutOfRange {
        fraction: f64,
        rank: i64,
        resamples: usize,
    },

    /// The low percentile must sit strictly below the high one.
    #[error("low percentile {low} must be below high percentile {high}")]
    PercentileOrder { low: f64, high: f64 },

    /// Beta shape parameters must be finite and positive.
    #[error("invalid {name} shape ({a}, {b})")]
    InvalidShape { name: &'static str, a: f64, b: f64 },

    /// The optimistic clamp constant must be finite and positive.
    #[error("clamp constant must be positive, got {value}")]
    InvalidClamp { value: f64 },
}

/// Grouping key for work items, `"{type}:{estimate}"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Category(String);

impl Category {
    /// Creates a category after validation.
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ConfigError::Empty { field: "category" });
        }
        Ok(Self(value))
    }

    /// Builds the category for an item type and point estimate.
    pub fn of(kind: &str, estimate: i64) -> Self {
        Self(format!("{kind}:{estimate}"))
    }

    /// Returns the category as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Category {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Category {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A confidence level in the open interval (0.0, 1.0).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    /// Creates a new confidence level after validation.
    ///
    /// Returns an error if the value is outside (0.0, 1.0) or is NaN.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_nan() || value <= 0.0 || value >= 1.0 {
            return Err(ConfigError::ConfidenceOutOfRange { value });
        }
        Ok(Self(value))
    }

    /// Returns the inner value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Cumulative probability of the upper bound of a two-sided interval,
    /// `1 - (1 - c) / 2`.
    #[must_use]
    pub fn upper_tail(self) -> f64 {
        1.0 - (1.0 - self.0) / 2.0
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.95)
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl TryFrom<f64> for Confidence {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(c: Confidence) -> Self {
        c.0
    }
}

/// One workflow state change of a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from_state: String,
    pub to_state: String,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(
        from_state: impl Into<String>,
        to_state: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from_state: from_state.into(),
            to_state: to_state.into(),
            occurred_at,
        }
    }
}

/// A work item taken from an iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    #[serde(rename = "story_type")]
    pub kind: String,
    /// Point estimate. Unestimated items count as zero.
    #[serde(default)]
    pub estimate: Option<i64>,
}

impl Item {
    pub fn category(&self) -> Category {
        Category::of(&self.kind, self.estimate.unwrap_or(0))
    }
}

/// Interval estimate for one category, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub optimistic: f64,
    pub pessimistic: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub median: Option<f64>,
}

impl ConfidenceInterval {
    /// Converts an interval computed in hours into days.
    pub fn from_hours(optimistic: f64, pessimistic: f64, median: Option<f64>) -> Self {
        Self {
            optimistic: optimistic / HOURS_PER_DAY,
            pessimistic: pessimistic / HOURS_PER_DAY,
            median: median.map(|m| m / HOURS_PER_DAY),
        }
    }

    /// Central value, falling back to the midpoint when no median was estimated.
    pub fn central(&self) -> f64 {
        self.median
            .unwrap_or_else(|| (self.optimistic + self.pessimistic) / 2.0)
    }
}

/// Converts a duration to fractional hours.
#[allow(clippy::cast_precision_loss)]
pub fn duration_hours(duration: Duration) -> f64 {
    duration.num_nanoseconds().map_or_else(
        || duration.num_milliseconds() as f64 / MS_PER_HOUR,
        |nanos| nanos as f64 / NS_PER_HOUR,
    )
}

/// Active durations grouped by category.
///
/// Serialized as `{"category": [nanoseconds, ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleTimes {
    samples: BTreeMap<Category, Vec<Duration>>,
}

impl CycleTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a duration to a category's sample.
    pub fn record(&mut self, category: Category, duration: Duration) {
        self.samples.entry(category).or_default().push(duration);
    }

    pub fn get(&self, category: &str) -> Option<&[Duration]> {
        self.samples.get(category).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Category, &[Duration])> {
        self.samples.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of durations across all categories.
    pub fn total_samples(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    /// Per-category samples converted to hours.
    pub fn hours(&self) -> BTreeMap<Category, Vec<f64>> {
        self.samples
            .iter()
            .map(|(category, durations)| {
                let hours = durations.iter().copied().map(duration_hours).collect();
                (category.clone(), hours)
            })
            .collect()
    }
}

impl FromIterator<(Category, Duration)> for CycleTimes {
    fn from_iter<I: IntoIterator<Item = (Category, Duration)>>(iter: I) -> Self {
        let mut cycle_times = Self::new();
        for (category, duration) in iter {
            cycle_times.record(category, duration);
        }
        cycle_times
    }
}

impl Serialize for CycleTimes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut encoded: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
        for (category, durations) in &self.samples {
            let nanos = durations
                .iter()
                .map(|d| {
                    d.num_nanoseconds()
                        .ok_or_else(|| serde::ser::Error::custom("duration overflows nanoseconds"))
                })
                .collect::<Result<Vec<_>, S::Error>>()?;
            encoded.insert(category.as_str(), nanos);
        }
        encoded.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for CycleTimes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let decoded = BTreeMap::<Category, Vec<i64>>::deserialize(deserializer)?;
        let samples = decoded
            .into_iter()
            .map(|(category, nanos)| {
                if let Some(negative) = nanos.iter().find(|&&n| n < 0) {
                    return Err(serde::de::Error::custom(format!(
                        "negative duration {negative} in category {category}"
                    )));
                }
                let durations = nanos.into_iter().map(Duration::nanoseconds).collect();
                Ok((category, durations))
            })
            .collect::<Result<_, D::Error>>()?;
        Ok(Self { samples })
    }
}
