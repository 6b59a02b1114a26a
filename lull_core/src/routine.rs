//! Bedtime routine duration statistics.
//!
//! A routine runs from a `RoutineStarted` event to the next event of any
//! other type. Day boundaries do not close a routine.

use crate::{CareEvent, EventType, RoutineStats};
use chrono::{DateTime, Duration, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoutineSpan {
    pub started: DateTime<Utc>,
    /// None while no later non-routine event exists
    pub ended: Option<DateTime<Utc>>,
}

impl RoutineSpan {
    pub fn duration(&self) -> Option<Duration> {
        self.ended.map(|end| end - self.started)
    }
}

/// Pair each routine start with the next non-routine event.
///
/// Expects a time-ordered log. Back-to-back routine starts all close on the
/// same following event.
pub fn routine_spans(events: &[CareEvent]) -> Vec<RoutineSpan> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.event_type == EventType::RoutineStarted)
        .map(|(index, start)| RoutineSpan {
            started: start.timestamp_utc,
            ended: events[index + 1..]
                .iter()
                .find(|e| e.event_type != EventType::RoutineStarted)
                .map(|e| e.timestamp_utc),
        })
        .collect()
}

pub fn routine_stats(events: &[CareEvent]) -> RoutineStats {
    let spans = routine_spans(events);
    let completed: Vec<i64> = spans
        .iter()
        .filter_map(RoutineSpan::duration)
        .map(|d| d.num_minutes())
        .collect();

    let average_minutes = if completed.is_empty() {
        None
    } else {
        Some(completed.iter().sum::<i64>() / completed.len() as i64)
    };

    RoutineStats {
        completed: completed.len(),
        open: spans.len() - completed.len(),
        average_minutes,
        last_minutes: completed.last().copied(),
    }
}
