//! Concurrent collection of cycle times.
//!
//! One task per countable item fetches its transitions and classifies them.
//! Tasks report over a channel; the collector is the only owner of the
//! resulting [`CycleTimes`]. A failed or rejected item never affects others.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::WorkflowConfig;
use crate::cycle_time::{Rejection, classify};
use crate::types::{Category, CycleTimes, Item, TransitionEvent};

/// Error returned by a [`TransitionSource`].
#[derive(Debug, Error)]
#[error(transparent)]
pub struct FetchError(Box<dyn StdError + Send + Sync>);

impl FetchError {
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Supplies the chronological transitions of an item.
#[async_trait]
pub trait TransitionSource: Send + Sync {
    async fn transitions(&self, item_id: u64) -> Result<Vec<TransitionEvent>, FetchError>;
}

/// Which items are counted and how their clocks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// Item types that never produce a cycle time.
    pub skip_types: Vec<String>,
    pub workflow: WorkflowConfig,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            skip_types: vec!["release".to_string()],
            workflow: WorkflowConfig::default(),
        }
    }
}

/// Collected cycle times plus what happened to every launched item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    pub cycle_times: CycleTimes,
    /// Items whose transitions were measured.
    pub accepted: usize,
    /// Items whose transitions did not qualify.
    pub rejected: usize,
    /// Items whose transitions could not be fetched.
    pub failed: usize,
    /// Items of a skipped type, never launched.
    pub skipped: usize,
}

enum Outcome {
    Measured(Category, Duration),
    Rejected,
    Failed,
}

/// Fetches and measures every countable item concurrently.
///
/// Returns once every launched task has finished. Requires a tokio runtime.
pub async fn collect_cycle_times<S>(
    source: Arc<S>,
    items: &[Item],
    config: &AggregationConfig,
) -> Aggregation
where
    S: TransitionSource + ?Sized + 'static,
{
    let skip: HashSet<&str> = config.skip_types.iter().map(String::as_str).collect();
    let workflow = Arc::new(config.workflow.clone());
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut aggregation = Aggregation::default();
    let mut launched = 0;

    for item in items {
        if skip.contains(item.kind.as_str()) {
            aggregation.skipped += 1;
            continue;
        }
        let source = Arc::clone(&source);
        let workflow = Arc::clone(&workflow);
        let tx = tx.clone();
        let item = item.clone();
        tokio::spawn(async move {
            let outcome = measure(source.as_ref(), &item, &workflow).await;
            // The collector outlives every task; a closed channel means it was dropped.
            let _ = tx.send(outcome);
        });
        launched += 1;
    }
    drop(tx);

    while let Some(outcome) = rx.recv().await {
        match outcome {
            Outcome::Measured(category, duration) => {
                aggregation.cycle_times.record(category, duration);
                aggregation.accepted += 1;
            }
            Outcome::Rejected => aggregation.rejected += 1,
            Outcome::Failed => aggregation.failed += 1,
        }
    }

    // A task that panicked dropped its sender without reporting.
    let lost = launched - (aggregation.accepted + aggregation.rejected + aggregation.failed);
    if lost > 0 {
        tracing::warn!(lost, "measurement tasks ended without reporting");
        aggregation.failed += lost;
    }

    tracing::info!(
        accepted = aggregation.accepted,
        rejected = aggregation.rejected,
        failed = aggregation.failed,
        skipped = aggregation.skipped,
        categories = aggregation.cycle_times.len(),
        "collected cycle times"
    );
    aggregation
}

async fn measure<S>(source: &S, item: &Item, workflow: &WorkflowConfig) -> Outcome
where
    S: TransitionSource + ?Sized,
{
    let transitions = match source.transitions(item.id).await {
        Ok(transitions) => transitions,
        Err(err) => {
            tracing::warn!(item = item.id, error = %err, "failed to fetch transitions");
            return Outcome::Failed;
        }
    };

    match classify(&transitions, workflow) {
        Ok(duration) => {
            let category = item.category();
            tracing::debug!(
                item = item.id,
                %category,
                hours = crate::types::duration_hours(duration),
                "measured"
            );
            Outcome::Measured(category, duration)
        }
        Err(rejection) => {
            log_rejection(item, &rejection);
            Outcome::Rejected
        }
    }
}

fn log_rejection(item: &Item, rejection: &Rejection) {
    match rejection {
        // Unfinished and empty items are routine.
        Rejection::Empty | Rejection::NotAccepted(_) | Rejection::NotCreated(_) => {
            tracing::debug!(item = item.id, reason = %rejection, "skipping item");
        }
        Rejection::OutOfOrder { .. } => {
            tracing::warn!(item = item.id, reason = %rejection, "skipping malformed item");
        }
    }
}
