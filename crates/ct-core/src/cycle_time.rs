//! Active duration of a single work item.
//!
//! The clock is a two-state machine stepped once per transition. The time
//! between a transition and the one before it counts only if the clock was
//! [`Clock::Active`] after the earlier one. Entering a backlog or stopping
//! state (see [`WorkflowConfig`]) idles it again.

use chrono::Duration;
use thiserror::Error;

use crate::config::WorkflowConfig;
use crate::types::TransitionEvent;

/// State an item must transition out of first to be counted.
pub const UNCREATED: &str = "uncreated";
/// State an item must end in to be counted.
pub const ACCEPTED: &str = "accepted";

/// Why an item's transitions were excluded from aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no transitions")]
    Empty,
    #[error("first transition starts from {0:?}, not \"uncreated\"")]
    NotCreated(String),
    #[error("last transition ends in {0:?}, not \"accepted\"")]
    NotAccepted(String),
    #[error("transition {index} occurs before its predecessor")]
    OutOfOrder { index: usize },
}

/// Whether elapsed time currently counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Idle,
    Active,
}

impl Clock {
    /// Next clock state after entering `to_state`.
    pub fn next(self, to_state: &str, workflow: &WorkflowConfig) -> Self {
        match self {
            Self::Idle if workflow.is_waiting(to_state) => Self::Idle,
            Self::Idle => Self::Active,
            Self::Active if workflow.pauses(to_state) => Self::Idle,
            Self::Active => Self::Active,
        }
    }
}

/// Sums the time spent in active states.
///
/// `events` must be in chronological order. Fewer than two events yield zero.
pub fn active_duration(events: &[TransitionEvent], workflow: &WorkflowConfig) -> Duration {
    debug_assert!(
        first_out_of_order(events).is_none(),
        "transitions must be chronological"
    );

    // The clock is idle before creation, so the first event only sets its state.
    let mut clock = Clock::Idle;
    let mut previous: Option<&TransitionEvent> = None;
    let mut total = Duration::zero();
    for event in events {
        if let (Clock::Active, Some(previous)) = (clock, previous) {
            total += event.occurred_at - previous.occurred_at;
        }
        clock = clock.next(&event.to_state, workflow);
        previous = Some(event);
    }
    total
}

/// Checks that an item was created and accepted in order, then measures it.
pub fn classify(
    events: &[TransitionEvent],
    workflow: &WorkflowConfig,
) -> Result<Duration, Rejection> {
    let (Some(first), Some(last)) = (events.first(), events.last()) else {
        return Err(Rejection::Empty);
    };
    if first.from_state != UNCREATED {
        return Err(Rejection::NotCreated(first.from_state.clone()));
    }
    if last.to_state != ACCEPTED {
        return Err(Rejection::NotAccepted(last.to_state.clone()));
    }
    if let Some(index) = first_out_of_order(events) {
        return Err(Rejection::OutOfOrder { index });
    }
    Ok(active_duration(events, workflow))
}

fn first_out_of_order(events: &[TransitionEvent]) -> Option<usize> {
    events
        .windows(2)
        .position(|pair| pair[1].occurred_at < pair[0].occurred_at)
        .map(|i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, hour, 0, 0).unwrap()
    }

    fn events(states: &[(&str, &str, u32)]) -> Vec<TransitionEvent> {
        states
            .iter()
            .map(|(from, to, hour)| TransitionEvent::new(*from, *to, at(*hour)))
            .collect()
    }

    #[test]
    fn clock_transition_table() {
        let workflow = WorkflowConfig::default();
        assert_eq!(Clock::Idle.next("unstarted", &workflow), Clock::Idle);
        assert_eq!(Clock::Idle.next("unscheduled", &workflow), Clock::Idle);
        assert_eq!(Clock::Idle.next("started", &workflow), Clock::Active);
        assert_eq!(Clock::Idle.next("accepted", &workflow), Clock::Active);
        assert_eq!(Clock::Active.next("started", &workflow), Clock::Active);
        assert_eq!(Clock::Active.next("finished", &workflow), Clock::Active);
        assert_eq!(Clock::Active.next("unstarted", &workflow), Clock::Idle);
        assert_eq!(Clock::Active.next("unscheduled", &workflow), Clock::Idle);
        assert_eq!(Clock::Active.next("accepted", &workflow), Clock::Idle);
    }

    #[test]
    fn started_then_accepted_counts_whole_interval() {
        let transitions = events(&[("uncreated", "started", 9), ("started", "accepted", 13)]);
        let workflow = WorkflowConfig::default();
        assert_eq!(active_duration(&transitions, &workflow), Duration::hours(4));
    }

    #[test]
    fn idle_intervals_are_excluded() {
        let transitions = events(&[
            ("uncreated", "unstarted", 0),
            ("unstarted", "started", 1),
            ("started", "unstarted", 2),
            ("unstarted", "started", 3),
            ("started", "accepted", 4),
        ]);
        let workflow = WorkflowConfig::default();
        assert_eq!(active_duration(&transitions, &workflow), Duration::hours(2));
    }

    #[test]
    fn backlog_on_both_sides_counts_only_the_started_stretch() {
        // uncreated -> unstarted -> started -> unstarted -> accepted
        let transitions = events(&[
            ("uncreated", "unstarted", 0),
            ("unstarted", "started", 1),
            ("started", "unstarted", 2),
            ("unstarted", "accepted", 3),
        ]);
        let workflow = WorkflowConfig::default();
        // started (1) -> unstarted (2) is active; unstarted -> accepted only arms the clock.
        assert_eq!(active_duration(&transitions, &workflow), Duration::hours(1));
    }

    #[test]
    fn short_sequences_yield_zero() {
        let workflow = WorkflowConfig::default();
        assert_eq!(active_duration(&[], &workflow), Duration::zero());
        let single = events(&[("uncreated", "accepted", 5)]);
        assert_eq!(active_duration(&single, &workflow), Duration::zero());
    }

    #[test]
    fn finished_pauses_only_when_configured() {
        let transitions = events(&[
            ("uncreated", "started", 0),
            ("started", "finished", 2),
            ("finished", "delivered", 5),
            ("delivered", "accepted", 6),
        ]);

        let default = WorkflowConfig::default();
        assert_eq!(active_duration(&transitions, &default), Duration::hours(6));

        let mut stop_on_finish = WorkflowConfig::default();
        stop_on_finish.stopping_states.push("finished".to_string());
        // finished -> delivered restarts the clock, so 5..6 still counts.
        assert_eq!(
            active_duration(&transitions, &stop_on_finish),
            Duration::hours(3)
        );
    }

    #[test]
    fn classify_accepts_created_and_accepted_items() {
        let transitions = events(&[("uncreated", "started", 1), ("started", "accepted", 3)]);
        assert_eq!(
            classify(&transitions, &WorkflowConfig::default()),
            Ok(Duration::hours(2))
        );
    }

    #[test]
    fn classify_rejects_malformed_sequences() {
        let workflow = WorkflowConfig::default();
        assert_eq!(classify(&[], &workflow), Err(Rejection::Empty));

        let not_created = events(&[("unstarted", "started", 1), ("started", "accepted", 2)]);
        assert_eq!(
            classify(&not_created, &workflow),
            Err(Rejection::NotCreated("unstarted".to_string()))
        );

        let not_accepted = events(&[("uncreated", "started", 1), ("started", "finished", 2)]);
        assert_eq!(
            classify(&not_accepted, &workflow),
            Err(Rejection::NotAccepted("finished".to_string()))
        );

        let out_of_order = events(&[
            ("uncreated", "started", 4),
            ("started", "finished", 2),
            ("finished", "accepted", 5),
        ]);
        assert_eq!(
            classify(&out_of_order, &workflow),
            Err(Rejection::OutOfOrder { index: 1 })
        );
    }
}
