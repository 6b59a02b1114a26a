//! Constraint projection.
//!
//! Turns a [`CoreState`] plus "now", a zone and the constraint settings into
//! the [`OutputModel`]: wake window, bedtime hard stop, activity tier with
//! its fixed label sets, shift-rule diagnostics and the pressure indicator.

use crate::civil::{same_day_at, CivilTime};
use crate::{
    ActivityTier, Categories, ConstraintConfig, CoreState, OutputModel, PressureIndicator,
    PressureTrend, RiskTier, RoutineStats, ShiftEvaluation, ShiftRule, ShiftStatus, WakeWindow,
};
use chrono::{DateTime, Duration, Utc};

/// Below this fraction of the min wake window only low stimulation is offered
const LOW_STIMULATION_FRACTION: f64 = 0.6;
/// From this fraction of the max wake window on, wind down
const WIND_DOWN_FRACTION: f64 = 0.9;

/// Fixed label sets per tier.
pub fn categories_for(tier: ActivityTier) -> Categories {
    match tier {
        ActivityTier::Asleep => Categories::default(),
        ActivityTier::NotCalibrated => Categories {
            allowed: vec![
                "Log first awake time",
                "Log most recent feed",
                "Log bedtime routine start",
            ],
            suppressed: vec![],
            windows: vec!["Not yet calibrated"],
        },
        ActivityTier::LowStimulation => Categories {
            allowed: vec!["Feeding", "Cuddles", "Quiet floor time", "Reading together"],
            suppressed: vec!["Busy outings", "Screens", "Rough play"],
            windows: vec!["Early wake window"],
        },
        ActivityTier::ActivePlay => Categories {
            allowed: vec!["Tummy time", "Active play", "Outdoor walk", "Sensory play"],
            suppressed: vec!["Screens"],
            windows: vec!["Mid wake window", "Good time for outings"],
        },
        ActivityTier::WindDown => Categories {
            allowed: vec!["Dim lights", "Quiet songs", "Sleep sack on", "Feeding"],
            suppressed: vec!["Active play", "Outings", "Screens"],
            windows: vec!["Nap window opening"],
        },
        ActivityTier::MinimalStimulation => Categories {
            allowed: vec!["Dark room", "White noise", "Contact calming"],
            suppressed: vec!["Play", "Outings", "Screens", "New faces"],
            windows: vec!["Past max wake window", "Nap now"],
        },
    }
}

/// "1h 05m" above an hour, "25m" below; negative durations read as "0m".
pub fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes();
    if minutes < 0 {
        return "0m".to_string();
    }
    if minutes >= 60 {
        format!("{}h {:02}m", minutes / 60, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}

fn clock(zone: &impl CivilTime, instant: DateTime<Utc>) -> String {
    let civil = zone.to_civil(instant);
    format!("{:02}:{:02}", civil.hour, civil.minute)
}

fn fraction(part: Duration, whole: Duration) -> f64 {
    if whole <= Duration::zero() {
        return 1.0;
    }
    part.num_seconds() as f64 / whole.num_seconds() as f64
}

/// Which shift rules currently hold
struct Shifts {
    short_nap: bool,
    late_nap: bool,
    sleeping_late: bool,
}

impl Shifts {
    fn evaluate(
        state: &CoreState,
        asleep: bool,
        zone: &impl CivilTime,
        config: &ConstraintConfig,
    ) -> Self {
        let is_late = |instant: DateTime<Utc>| zone.to_civil(instant).hour >= config.late_nap_hour;
        Self {
            short_nap: state
                .last_nap_duration
                .map(|d| d < config.short_nap_threshold())
                .unwrap_or(false),
            late_nap: state.last_nap_end.map(is_late).unwrap_or(false),
            sleeping_late: asleep && state.last_nap_start.map(is_late).unwrap_or(false),
        }
    }

    fn report(&self, config: &ConstraintConfig) -> Vec<ShiftEvaluation> {
        let status = |applied: bool| {
            if applied {
                ShiftStatus::Applied
            } else {
                ShiftStatus::Pending
            }
        };

        vec![
            ShiftEvaluation {
                rule: ShiftRule::ShortNapWakeWindow,
                status: status(self.short_nap),
                detail: format!(
                    "Nap under {}m shortens the next wake window by {}m",
                    config.short_nap_threshold_min, config.short_nap_wake_reduction_min
                ),
            },
            ShiftEvaluation {
                rule: ShiftRule::LateNapBedtimeCap,
                status: status(self.late_nap),
                detail: format!(
                    "Nap ending at or after {:02}:00 moves bedtime {}m earlier",
                    config.late_nap_hour, config.bedtime_pull_forward_min
                ),
            },
            ShiftEvaluation {
                rule: ShiftRule::LateNapNextNapCap,
                status: status(self.late_nap || self.sleeping_late),
                detail: format!(
                    "Late nap limits the next nap to {}m",
                    config.late_nap_next_nap_cap_min
                ),
            },
        ]
    }
}

fn tier_for(elapsed: Duration, min_wake: Duration, max_wake: Duration) -> ActivityTier {
    if elapsed > max_wake {
        ActivityTier::MinimalStimulation
    } else if fraction(elapsed, min_wake) < LOW_STIMULATION_FRACTION {
        ActivityTier::LowStimulation
    } else if fraction(elapsed, max_wake) < WIND_DOWN_FRACTION {
        ActivityTier::ActivePlay
    } else {
        ActivityTier::WindDown
    }
}

pub fn project(
    state: &CoreState,
    now: DateTime<Utc>,
    zone: &impl CivilTime,
    config: &ConstraintConfig,
) -> OutputModel {
    let asleep = state.is_asleep();
    let shifts = Shifts::evaluate(state, asleep, zone, config);

    let reduction = if shifts.short_nap {
        config.short_nap_reduction()
    } else {
        Duration::zero()
    };
    let min_wake = (config.min_wake() - reduction).max(Duration::zero());
    let max_wake = (config.max_wake() - reduction).max(Duration::zero());

    let awake_since = state.last_wake_time.filter(|_| !asleep);
    let elapsed = awake_since.map(|wake| now - wake);

    let wake_window = awake_since.map(|wake| WakeWindow {
        earliest: wake + min_wake,
        latest: wake + max_wake,
    });

    let hard_stop = (!asleep).then(|| {
        let mut cap = same_day_at(zone, now, config.bedtime_cap_hour, config.bedtime_cap_minute);
        if shifts.late_nap {
            cap = cap - config.bedtime_pull_forward();
        }
        cap - config.routine_lead()
    });

    let expected_wake = if asleep {
        state.last_nap_start.map(|start| {
            let mut length = config.expected_nap_duration();
            if shifts.sleeping_late {
                length = length.min(config.late_nap_next_nap_cap());
            }
            start + length
        })
    } else {
        None
    };

    let tier = match elapsed {
        _ if asleep => ActivityTier::Asleep,
        None => ActivityTier::NotCalibrated,
        Some(elapsed) => tier_for(elapsed, min_wake, max_wake),
    };
    tracing::debug!("Projected tier {:?} (asleep: {})", tier, asleep);

    let pressure = PressureIndicator {
        wake_window_utilization: elapsed.map(|e| fraction(e, max_wake).clamp(0.0, 1.0)),
        trend: if asleep {
            PressureTrend::Down
        } else {
            PressureTrend::Up
        },
        risk: RiskTier::from(state.regulation_level),
    };

    let mut summary = Vec::new();
    match (asleep, state.last_nap_start, awake_since) {
        (true, Some(start), _) => {
            summary.push(format!(
                "Asleep since {} ({})",
                clock(zone, start),
                format_duration(now - start)
            ));
            if let Some(wake) = expected_wake {
                summary.push(format!("Expected to wake around {}", clock(zone, wake)));
            }
        }
        (_, _, Some(wake)) => summary.push(format!(
            "Awake since {} ({})",
            clock(zone, wake),
            format_duration(now - wake)
        )),
        _ => summary.push("No wake time logged yet".to_string()),
    }
    if let Some(duration) = state.last_nap_duration {
        summary.push(format!("Last nap: {}", format_duration(duration)));
    }
    match state.time_since_last_feed {
        Some(since) => summary.push(format!("Last feed: {} ago", format_duration(since))),
        None => summary.push("No feed logged yet".to_string()),
    }
    summary.push(format!(
        "Total day sleep: {}",
        format_duration(state.total_day_sleep)
    ));
    summary.push(format!(
        "Sleep pressure: {:.2} ({})",
        state.estimated_sleep_pressure, state.regulation_level
    ));
    if let Some(window) = wake_window {
        summary.push(format!(
            "Next nap window: {} - {}",
            clock(zone, window.earliest),
            clock(zone, window.latest)
        ));
    }
    if let Some(stop) = hard_stop {
        summary.push(format!("Start bedtime routine by {}", clock(zone, stop)));
    }

    OutputModel {
        summary,
        is_asleep: asleep,
        wake_window,
        hard_stop,
        expected_wake,
        tier,
        categories: categories_for(tier),
        shifts: shifts.report(config),
        pressure,
        routine: RoutineStats::default(),
    }
}
