//! Full evaluation: normalize, reduce, project.
//!
//! Every mutation and every clock tick re-runs the whole pipeline against
//! the complete log. All inputs are explicit; nothing reads the clock or
//! touches storage here.

use crate::civil::CivilTime;
use crate::normalize::normalize;
use crate::project::{format_duration, project};
use crate::reduce::reduce;
use crate::routine::routine_stats;
use crate::{CareEvent, ConstraintConfig, CoreState, EventLog, OutputModel};
use chrono::{DateTime, Duration, Utc};

/// Result of one pipeline run
#[derive(Clone, Debug)]
pub struct Snapshot {
    /// Sorted log including predicted events, ready to be adopted by the store
    pub normalized: Vec<CareEvent>,
    pub state: CoreState,
    pub output: OutputModel,
}

pub fn evaluate(
    log: &EventLog,
    now: DateTime<Utc>,
    zone: &impl CivilTime,
    config: &ConstraintConfig,
) -> Snapshot {
    let normalized = normalize(&log.events, &log.suppressed, now, zone, config);
    let state = reduce(&normalized, now);
    let mut output = project(&state, now, zone, config);

    let past: Vec<CareEvent> = normalized
        .iter()
        .filter(|e| e.timestamp_utc <= now)
        .cloned()
        .collect();
    output.routine = routine_stats(&past);
    if let Some(average) = output.routine.average_minutes {
        output.summary.push(format!(
            "Average bedtime routine: {}",
            format_duration(Duration::minutes(average))
        ));
    }

    tracing::debug!(
        "Evaluated {} events ({} predicted) at {}",
        normalized.len(),
        normalized.iter().filter(|e| e.auto_predicted).count(),
        now
    );

    Snapshot {
        normalized,
        state,
        output,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActivityTier, EventType, RegulationLevel, ShiftRule, ShiftStatus};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_predicted_nap_resets_wake() {
        crate::logging::init_test();
        let mut log = EventLog::new();
        log.append(EventType::FirstAwake, at(7, 0));

        // Without real naps the baseline nap 08:15-09:15 and feed 09:30 apply
        let snapshot = evaluate(&log, at(9, 30), &Utc, &ConstraintConfig::default());

        assert_eq!(snapshot.state.last_wake_time, Some(at(9, 15)));
        assert_eq!(snapshot.state.last_feed_time, Some(at(9, 30)));
        assert!((snapshot.state.estimated_sleep_pressure - 0.1).abs() < 1e-9);
        assert_eq!(snapshot.state.regulation_level, RegulationLevel::Low);
    }

    #[test]
    fn test_empty_log_is_calibrated_from_day_start() {
        let snapshot = evaluate(&EventLog::new(), at(6, 30), &Utc, &ConstraintConfig::default());

        assert_eq!(snapshot.normalized.len(), 1);
        assert!(snapshot.normalized[0].auto_predicted);
        assert_eq!(snapshot.state.last_wake_time, Some(at(6, 0)));
        assert_eq!(snapshot.output.tier, ActivityTier::LowStimulation);
    }

    #[test]
    fn test_predicted_nap_in_progress() {
        let mut log = EventLog::new();
        log.append(EventType::FirstAwake, at(7, 0));

        // Baseline predicts a nap from 08:15; at 08:30 it is in progress
        let snapshot = evaluate(&log, at(8, 30), &Utc, &ConstraintConfig::default());

        assert!(snapshot.output.is_asleep);
        assert_eq!(snapshot.output.expected_wake, Some(at(9, 15)));
    }

    #[test]
    fn test_deleting_prediction_keeps_it_gone() {
        let config = ConstraintConfig::default();
        let mut log = EventLog::new();
        log.append(EventType::FirstAwake, at(7, 0));

        let snapshot = evaluate(&log, at(10, 0), &Utc, &config);
        log.adopt(snapshot.normalized);
        let milk_id = log
            .events
            .iter()
            .find(|e| e.event_type == EventType::MilkGiven)
            .map(|e| e.id.clone())
            .unwrap();
        assert!(log.delete(&milk_id).is_some());

        for now in [at(10, 5), at(14, 0)] {
            let snapshot = evaluate(&log, now, &Utc, &config);
            assert!(!snapshot
                .normalized
                .iter()
                .any(|e| e.event_type == EventType::MilkGiven
                    && (e.timestamp_utc - at(9, 30)).abs() <= Duration::minutes(20)));
        }
    }

    #[test]
    fn test_logging_wake_after_status_rebuilds_baseline() {
        let config = ConstraintConfig::default();
        let mut log = EventLog::new();

        let snapshot = evaluate(&log, at(8, 35), &Utc, &config);
        log.adopt(snapshot.normalized);
        log.append(EventType::FirstAwake, at(7, 0));

        let snapshot = evaluate(&log, at(8, 40), &Utc, &config);

        assert_eq!(snapshot.state.last_wake_time, Some(at(7, 0)));
        assert_eq!(snapshot.state.last_nap_start, Some(at(8, 15)));
        assert!(snapshot
            .normalized
            .iter()
            .all(|e| e.timestamp_utc >= at(7, 0)));
    }

    #[test]
    fn test_deleted_first_awake_leaves_uncalibrated() {
        let config = ConstraintConfig::default();
        let mut log = EventLog::new();

        let snapshot = evaluate(&log, at(6, 30), &Utc, &config);
        log.adopt(snapshot.normalized);
        let wake_id = log.events[0].id.clone();
        assert!(log.delete(&wake_id).is_some());

        let snapshot = evaluate(&log, at(6, 35), &Utc, &config);

        assert!(snapshot.normalized.is_empty());
        assert_eq!(snapshot.output.tier, ActivityTier::NotCalibrated);
    }

    #[test]
    fn test_late_nap_scenario() {
        let config = ConstraintConfig::default();
        let mut log = EventLog::new();
        log.append(EventType::FirstAwake, at(7, 0));
        log.append(EventType::NapStarted, at(15, 0));
        log.append(EventType::NapEnded, at(16, 0));

        let snapshot = evaluate(&log, at(16, 5), &Utc, &config);

        let bedtime = snapshot
            .output
            .shifts
            .iter()
            .find(|s| s.rule == ShiftRule::LateNapBedtimeCap)
            .unwrap();
        assert_eq!(bedtime.status, ShiftStatus::Applied);
        assert_eq!(snapshot.output.hard_stop, Some(at(18, 30)));
    }

    #[test]
    fn test_routine_stats_reported() {
        let mut log = EventLog::new();
        log.append(EventType::FirstAwake, at(7, 0));
        log.append(EventType::MilkGiven, at(7, 5));
        log.append(EventType::RoutineStarted, at(18, 40));
        log.append(EventType::Asleep, at(19, 5));

        let snapshot = evaluate(&log, at(19, 10), &Utc, &ConstraintConfig::default());

        assert_eq!(snapshot.output.routine.completed, 1);
        assert_eq!(snapshot.output.routine.last_minutes, Some(25));
        assert!(snapshot
            .output
            .summary
            .contains(&"Average bedtime routine: 25m".to_string()));
    }
}
