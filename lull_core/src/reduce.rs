//! Core state reduction.
//!
//! Folds the normalized log, in order, into a [`CoreState`] as of "now".
//! Events stamped after "now" are skipped where they sit in the fold.

use crate::{CareEvent, CoreState, EventType, RegulationLevel};
use chrono::{DateTime, Duration, Utc};

/// Minutes awake at which sleep pressure saturates
const PRESSURE_SATURATION_MINUTES: f64 = 150.0;

/// Naps shorter than this add [`SHORT_NAP_PENALTY`] to sleep pressure
const SHORT_NAP_MINUTES: i64 = 45;
const SHORT_NAP_PENALTY: f64 = 0.15;

const HIGH_PRESSURE: f64 = 0.8;
const LOW_PRESSURE: f64 = 0.35;
const FEED_OVERDUE_MINUTES: i64 = 180;
const FEED_RECENT_MINUTES: i64 = 120;

pub fn reduce(events: &[CareEvent], now: DateTime<Utc>) -> CoreState {
    let mut state = CoreState::default();
    let mut ignored = 0usize;

    for event in events {
        let ts = event.timestamp_utc;
        if ts > now {
            ignored += 1;
            continue;
        }

        match event.event_type {
            EventType::FirstAwake => {
                state.last_wake_time = Some(ts);
                state.last_nap_start = None;
                state.last_nap_end = None;
                state.last_nap_duration = None;
            }
            EventType::NapStarted | EventType::Asleep => {
                state.last_nap_start = Some(ts);
            }
            EventType::NapEnded => {
                state.last_nap_end = Some(ts);
                if let Some(start) = state.last_nap_start {
                    let duration = (ts - start).max(Duration::zero());
                    state.last_nap_duration = Some(duration);
                    state.total_day_sleep += duration;
                }
                state.last_wake_time = Some(ts);
            }
            EventType::MilkGiven | EventType::SolidsGiven => {
                state.last_feed_time = Some(ts);
            }
            EventType::RoutineStarted => {}
        }
    }

    if ignored > 0 {
        tracing::debug!("Ignored {} events stamped after {}", ignored, now);
    }

    state.time_since_last_feed = state.last_feed_time.map(|fed| now - fed);
    state.estimated_sleep_pressure =
        sleep_pressure(state.last_wake_time, state.last_nap_duration, now);
    state.regulation_level =
        regulation_level(state.estimated_sleep_pressure, state.time_since_last_feed);
    state
}

/// Unitless [0, 1] tiredness since the last wake.
pub fn sleep_pressure(
    last_wake: Option<DateTime<Utc>>,
    last_nap_duration: Option<Duration>,
    now: DateTime<Utc>,
) -> f64 {
    let Some(wake) = last_wake else {
        return 0.0;
    };

    let awake_minutes = ((now - wake).num_seconds() as f64 / 60.0).max(0.0);
    let nap_penalty = match last_nap_duration {
        Some(d) if d < Duration::minutes(SHORT_NAP_MINUTES) => SHORT_NAP_PENALTY,
        _ => 0.0,
    };

    (awake_minutes / PRESSURE_SATURATION_MINUTES + nap_penalty).min(1.0)
}

pub fn regulation_level(pressure: f64, time_since_feed: Option<Duration>) -> RegulationLevel {
    let feed_overdue = time_since_feed
        .map(|d| d >= Duration::minutes(FEED_OVERDUE_MINUTES))
        .unwrap_or(false);
    if pressure >= HIGH_PRESSURE || feed_overdue {
        return RegulationLevel::High;
    }

    let fed_recently = time_since_feed
        .map(|d| d < Duration::minutes(FEED_RECENT_MINUTES))
        .unwrap_or(true);
    if pressure <= LOW_PRESSURE && fed_recently {
        RegulationLevel::Low
    } else {
        RegulationLevel::Medium
    }
}
