//! Greedy multi-track capacity planning.
//!
//! Items are taken in input order and each goes to the track with the
//! smallest running total (lowest index on ties). The three estimate kinds
//! are planned independently of each other. This is the list-scheduling
//! heuristic, not an optimal packing.

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use serde::Serialize;
use thiserror::Error;

use crate::types::{Category, ConfidenceInterval};

/// Planning errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// An item's category has no interval.
    #[error("no estimate for category {category}")]
    MissingEstimate { category: Category },
}

/// Which bound of an interval is being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateKind {
    Optimistic,
    Median,
    Pessimistic,
}

impl EstimateKind {
    pub const ALL: [Self; 3] = [Self::Optimistic, Self::Median, Self::Pessimistic];

    /// The value of this kind, in days. Intervals without a median use
    /// their midpoint.
    pub fn value(self, interval: &ConfidenceInterval) -> f64 {
        match self {
            Self::Optimistic => interval.optimistic,
            Self::Median => interval.central(),
            Self::Pessimistic => interval.pessimistic,
        }
    }
}

/// One parallel stream of work.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Track {
    pub total: f64,
    pub items: Vec<Category>,
}

/// The tracks of one estimate kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSet {
    pub kind: EstimateKind,
    pub tracks: Vec<Track>,
}

impl TrackSet {
    fn new(kind: EstimateKind, tracks: NonZeroUsize) -> Self {
        Self {
            kind,
            tracks: vec![Track::default(); tracks.get()],
        }
    }

    /// Index of the first track with the smallest total.
    fn lightest_index(&self) -> usize {
        let mut best = 0;
        for (i, track) in self.tracks.iter().enumerate() {
            if track.total < self.tracks[best].total {
                best = i;
            }
        }
        best
    }

    fn assign(&mut self, category: &Category, value: f64) {
        let index = self.lightest_index();
        let track = &mut self.tracks[index];
        track.total += value;
        track.items.push(category.clone());
    }

    /// Largest track total: when the whole batch finishes.
    pub fn makespan(&self) -> f64 {
        self.tracks.iter().map(|t| t.total).fold(0.0, f64::max)
    }

    /// Smallest track total.
    pub fn lightest(&self) -> f64 {
        self.tracks
            .iter()
            .map(|t| t.total)
            .fold(f64::INFINITY, f64::min)
    }
}

/// Smallest and largest track totals of one estimate kind, in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackRange {
    pub lightest: f64,
    pub makespan: f64,
}

impl TrackRange {
    fn of(set: &TrackSet) -> Self {
        Self {
            lightest: set.lightest(),
            makespan: set.makespan(),
        }
    }
}

/// Track ranges of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlanSummary {
    pub optimistic: TrackRange,
    pub median: TrackRange,
    pub pessimistic: TrackRange,
}

/// Track assignments for all three estimate kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    pub optimistic: TrackSet,
    pub median: TrackSet,
    pub pessimistic: TrackSet,
}

impl Plan {
    pub fn track_set(&self, kind: EstimateKind) -> &TrackSet {
        match kind {
            EstimateKind::Optimistic => &self.optimistic,
            EstimateKind::Median => &self.median,
            EstimateKind::Pessimistic => &self.pessimistic,
        }
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            optimistic: TrackRange::of(&self.optimistic),
            median: TrackRange::of(&self.median),
            pessimistic: TrackRange::of(&self.pessimistic),
        }
    }
}

/// Assigns `items` to `tracks` tracks, once per estimate kind.
///
/// Fails on the first item whose category is missing from `intervals`.
pub fn plan(
    items: &[Category],
    intervals: &BTreeMap<Category, ConfidenceInterval>,
    tracks: NonZeroUsize,
) -> Result<Plan, ScheduleError> {
    let mut plan = Plan {
        optimistic: TrackSet::new(EstimateKind::Optimistic, tracks),
        median: TrackSet::new(EstimateKind::Median, tracks),
        pessimistic: TrackSet::new(EstimateKind::Pessimistic, tracks),
    };

    for category in items {
        let interval = intervals
            .get(category)
            .ok_or_else(|| ScheduleError::MissingEstimate {
                category: category.clone(),
            })?;
        plan.optimistic.assign(category, EstimateKind::Optimistic.value(interval));
        plan.median.assign(category, EstimateKind::Median.value(interval));
        plan.pessimistic.assign(category, EstimateKind::Pessimistic.value(interval));
    }

    let summary = plan.summary();
    tracing::debug!(
        items = items.len(),
        tracks = tracks.get(),
        optimistic = summary.optimistic.makespan,
        median = summary.median.makespan,
        pessimistic = summary.pessimistic.makespan,
        "planned tracks"
    );
    Ok(plan)
}
