//! Event log normalization.
//!
//! Merges the logged events with a synthesized baseline schedule:
//! 1. Sort by timestamp
//! 2. Drop every previously predicted event; predictions are rebuilt from
//!    the current anchor on each run and keep their ids
//! 3. With no real `FirstAwake`, predict one at the start of the current
//!    operational day unless that slot is suppressed
//! 4. Walk forward from the first wake predicting feed / nap start / nap end
//!    cycles up to the horizon, skipping slots that are suppressed or
//!    already covered by an event of the same type
//!
//! Synthesis never moves or removes real events.

use crate::civil::{day_start_at_or_before, CivilTime};
use crate::{AutoSuppressionEntry, CareEvent, ConstraintConfig, EventType};
use chrono::{DateTime, Duration, Utc};

/// Two events of the same type closer than this are the same slot
pub const MATCH_TOLERANCE_MINUTES: i64 = 20;

/// Upper bound on synthesized wake/nap cycles
pub const MAX_BASELINE_CYCLES: usize = 8;

/// Number of trailing real events that define the synthesis horizon
const HORIZON_EVENTS: usize = 3;

fn tolerance() -> Duration {
    Duration::minutes(MATCH_TOLERANCE_MINUTES)
}

fn within_tolerance(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    (a - b).abs() <= tolerance()
}

/// Produce a time-ordered, duplicate-free log with predicted events filled in.
pub fn normalize(
    events: &[CareEvent],
    suppressed: &[AutoSuppressionEntry],
    now: DateTime<Utc>,
    zone: &impl CivilTime,
    config: &ConstraintConfig,
) -> Vec<CareEvent> {
    let mut merged: Vec<CareEvent> = events
        .iter()
        .filter(|e| !e.auto_predicted)
        .cloned()
        .collect();
    merged.sort_by_key(|e| e.timestamp_utc);

    let dropped = events.len() - merged.len();
    if dropped > 0 {
        tracing::debug!("Rebuilding {} previously predicted events", dropped);
    }

    if !merged.iter().any(|e| e.event_type == EventType::FirstAwake) {
        let day_start = day_start_at_or_before(zone, now, config.day_start_hour);
        if is_suppressed(suppressed, EventType::FirstAwake, day_start) {
            tracing::debug!("Predicted first awake at {} is suppressed", day_start);
        } else {
            tracing::debug!("No first awake logged, predicting one at {}", day_start);
            merged.push(CareEvent::predicted(EventType::FirstAwake, day_start));
            merged.sort_by_key(|e| e.timestamp_utc);
        }
    }

    let first_wake = merged
        .iter()
        .rev()
        .find(|e| e.event_type == EventType::FirstAwake)
        .map(|e| e.timestamp_utc);

    if let Some(first_wake) = first_wake {
        let horizon = horizon(&merged, now);
        let added = synthesize_baseline(&mut merged, suppressed, first_wake, horizon, config);
        tracing::debug!(
            "Baseline from {} to {}: {} predicted events added",
            first_wake,
            horizon,
            added
        );
    }

    merged.sort_by_key(|e| e.timestamp_utc);
    merged
}

/// Latest of the last three real events, or `now` with fewer than three.
///
/// Routine starts do not count towards the horizon.
fn horizon(sorted: &[CareEvent], now: DateTime<Utc>) -> DateTime<Utc> {
    let real: Vec<DateTime<Utc>> = sorted
        .iter()
        .filter(|e| !e.auto_predicted && e.event_type != EventType::RoutineStarted)
        .map(|e| e.timestamp_utc)
        .collect();

    if real.len() < HORIZON_EVENTS {
        return now;
    }

    real[real.len() - HORIZON_EVENTS..]
        .iter()
        .copied()
        .max()
        .unwrap_or(now)
}

fn is_suppressed(
    suppressed: &[AutoSuppressionEntry],
    event_type: EventType,
    at: DateTime<Utc>,
) -> bool {
    suppressed
        .iter()
        .any(|s| s.event_type == event_type && within_tolerance(s.timestamp_utc, at))
}

fn is_covered(merged: &[CareEvent], event_type: EventType, at: DateTime<Utc>) -> bool {
    merged
        .iter()
        .any(|e| e.event_type == event_type && within_tolerance(e.timestamp_utc, at))
}

fn synthesize_baseline(
    merged: &mut Vec<CareEvent>,
    suppressed: &[AutoSuppressionEntry],
    first_wake: DateTime<Utc>,
    horizon: DateTime<Utc>,
    config: &ConstraintConfig,
) -> usize {
    let mut added = 0;
    let mut wake = first_wake;

    'cycles: for _ in 0..MAX_BASELINE_CYCLES {
        let nap_start = wake + config.min_wake();
        let nap_end = nap_start + config.expected_nap_duration();
        let mut candidates = [
            (EventType::MilkGiven, wake + config.feed_interval_min()),
            (EventType::NapStarted, nap_start),
            (EventType::NapEnded, nap_end),
        ];
        candidates.sort_by_key(|(_, at)| *at);

        for (event_type, at) in candidates {
            if at > horizon {
                break 'cycles;
            }
            if is_suppressed(suppressed, event_type, at) {
                tracing::debug!("Predicted {} at {} is suppressed", event_type, at);
                continue;
            }
            if is_covered(merged, event_type, at) {
                continue;
            }
            merged.push(CareEvent::predicted(event_type, at));
            added += 1;
        }

        wake = nap_end;
    }

    added
}
