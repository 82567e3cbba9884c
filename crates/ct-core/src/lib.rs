//! Core domain logic for cycle time estimation.
//!
//! This crate contains the fundamental types and logic for:
//! - Cycle time: measuring the active duration of an item from its transitions
//! - Outlier rejection: Dixon's Q test on a duration sample
//! - Estimation: per-category confidence intervals, parametric or resampled
//! - Aggregation: concurrently collecting durations per category
//! - Scheduling: greedy assignment of estimated items to parallel tracks

pub mod aggregate;
pub mod config;
pub mod cycle_time;
pub mod estimate;
pub mod qtest;
pub mod schedule;
mod types;

pub use aggregate::{
    Aggregation, AggregationConfig, FetchError, TransitionSource, collect_cycle_times,
};
pub use config::{
    EstimatorConfig, MeanKind, Method, ParametricConfig, ResamplingConfig, Statistic,
    WorkflowConfig,
};
pub use cycle_time::{Rejection, active_duration, classify};
pub use estimate::{
    CycleTimeStat, EstimateError, Estimator, IntervalEstimator, ParametricEstimator,
    ResamplingEstimator, estimate_all,
};
pub use qtest::q_test;
pub use schedule::{
    EstimateKind, Plan, PlanSummary, ScheduleError, Track, TrackRange, TrackSet, plan,
};
pub use types::{
    Category, ConfidenceInterval, ConfigError, Confidence, CycleTimes, Item, TransitionEvent,
    duration_hours,
};
