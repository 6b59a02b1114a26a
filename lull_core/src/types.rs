//! Core domain types for lull.
//!
//! This module defines the fundamental types used throughout the system:
//! - Care events and their kinds
//! - Suppression markers for removed auto-predictions
//! - The reduced physiological state snapshot
//! - The projected output model consumed by the CLI

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Event Types
// ============================================================================

/// Kind of care event.
///
/// Serialized with the PascalCase names used by the persisted log.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    FirstAwake,
    NapStarted,
    NapEnded,
    MilkGiven,
    SolidsGiven,
    RoutineStarted,
    Asleep,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::FirstAwake,
        EventType::NapStarted,
        EventType::NapEnded,
        EventType::MilkGiven,
        EventType::SolidsGiven,
        EventType::RoutineStarted,
        EventType::Asleep,
    ];

    /// Stable snake_case name, used in synthesized ids and CLI arguments.
    pub fn slug(self) -> &'static str {
        match self {
            EventType::FirstAwake => "first_awake",
            EventType::NapStarted => "nap_started",
            EventType::NapEnded => "nap_ended",
            EventType::MilkGiven => "milk_given",
            EventType::SolidsGiven => "solids_given",
            EventType::RoutineStarted => "routine_started",
            EventType::Asleep => "asleep",
        }
    }

    /// PascalCase name as stored in the persisted log.
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::FirstAwake => "FirstAwake",
            EventType::NapStarted => "NapStarted",
            EventType::NapEnded => "NapEnded",
            EventType::MilkGiven => "MilkGiven",
            EventType::SolidsGiven => "SolidsGiven",
            EventType::RoutineStarted => "RoutineStarted",
            EventType::Asleep => "Asleep",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "FirstAwake" | "first_awake" | "wake" => Ok(Self::FirstAwake),
            "NapStarted" | "nap_started" | "nap" => Ok(Self::NapStarted),
            "NapEnded" | "nap_ended" => Ok(Self::NapEnded),
            "MilkGiven" | "milk_given" | "milk" => Ok(Self::MilkGiven),
            "SolidsGiven" | "solids_given" | "solids" => Ok(Self::SolidsGiven),
            "RoutineStarted" | "routine_started" | "routine" => Ok(Self::RoutineStarted),
            "Asleep" | "asleep" => Ok(Self::Asleep),
            other => Err(UnknownEventType(other.to_string())),
        }
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown event type: {0}")]
pub struct UnknownEventType(pub String);

/// A single logged (or synthesized) care event
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CareEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp_utc: DateTime<Utc>,
    #[serde(default)]
    pub auto_predicted: bool,
}

impl CareEvent {
    /// A user-entered event.
    pub fn logged(id: impl Into<String>, event_type: EventType, at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            event_type,
            timestamp_utc: at,
            auto_predicted: false,
        }
    }

    /// A synthesized placeholder. The id is derived from type and instant so
    /// that re-synthesizing the same slot yields the same event.
    pub fn predicted(event_type: EventType, at: DateTime<Utc>) -> Self {
        Self {
            id: format!("auto-{}-{}", event_type.slug(), at.timestamp_millis()),
            event_type,
            timestamp_utc: at,
            auto_predicted: true,
        }
    }
}

/// Marker recording that a synthesized event was edited or deleted by the
/// user and must not be synthesized again.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AutoSuppressionEntry {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp_utc: DateTime<Utc>,
}

// ============================================================================
// Reduced State
// ============================================================================

/// Three-tier summary of how urgently a nap or calming action is needed
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RegulationLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RegulationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegulationLevel::Low => "low",
            RegulationLevel::Medium => "medium",
            RegulationLevel::High => "high",
        };
        f.write_str(s)
    }
}

/// Physiological snapshot folded from the normalized log as of "now".
///
/// Always derived by [`crate::reduce::reduce`]; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct CoreState {
    pub last_wake_time: Option<DateTime<Utc>>,
    pub last_nap_start: Option<DateTime<Utc>>,
    pub last_nap_end: Option<DateTime<Utc>>,
    pub last_nap_duration: Option<Duration>,
    pub last_feed_time: Option<DateTime<Utc>>,
    pub time_since_last_feed: Option<Duration>,
    pub estimated_sleep_pressure: f64,
    pub regulation_level: RegulationLevel,
    pub total_day_sleep: Duration,
}

impl Default for CoreState {
    fn default() -> Self {
        Self {
            last_wake_time: None,
            last_nap_start: None,
            last_nap_end: None,
            last_nap_duration: None,
            last_feed_time: None,
            time_since_last_feed: None,
            estimated_sleep_pressure: 0.0,
            regulation_level: RegulationLevel::Low,
            total_day_sleep: Duration::zero(),
        }
    }
}

impl CoreState {
    /// A nap or night sleep has started and has not ended since.
    pub fn is_asleep(&self) -> bool {
        match (self.last_nap_start, self.last_nap_end) {
            (Some(_), None) => true,
            (Some(start), Some(end)) => end < start,
            _ => false,
        }
    }
}

// ============================================================================
// Output Model
// ============================================================================

/// Activity tier chosen from how far into the wake window the baby is
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityTier {
    /// No wake time known yet
    NotCalibrated,
    Asleep,
    LowStimulation,
    ActivePlay,
    WindDown,
    /// Elapsed awake time is past the maximum wake window
    MinimalStimulation,
}

/// Fixed label sets for one activity tier
#[derive(Clone, Debug, Serialize, PartialEq, Eq, Default)]
pub struct Categories {
    pub allowed: Vec<&'static str>,
    pub suppressed: Vec<&'static str>,
    pub windows: Vec<&'static str>,
}

impl Categories {
    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty() && self.suppressed.is_empty() && self.windows.is_empty()
    }
}

/// Next allowed nap-start window
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub struct WakeWindow {
    pub earliest: DateTime<Utc>,
    pub latest: DateTime<Utc>,
}

/// Schedule-shifting rules reported for transparency
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftRule {
    /// Short nap shortens the next wake window
    ShortNapWakeWindow,
    /// Late nap pulls the bedtime cap earlier
    LateNapBedtimeCap,
    /// Late nap caps the length of the next nap
    LateNapNextNapCap,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Applied,
    Pending,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ShiftEvaluation {
    pub rule: ShiftRule,
    pub status: ShiftStatus,
    pub detail: String,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PressureTrend {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Rising,
    High,
}

impl From<RegulationLevel> for RiskTier {
    fn from(level: RegulationLevel) -> Self {
        match level {
            RegulationLevel::Low => RiskTier::Low,
            RegulationLevel::Medium => RiskTier::Rising,
            RegulationLevel::High => RiskTier::High,
        }
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct PressureIndicator {
    /// Fraction of the max wake window used, in [0, 1]
    pub wake_window_utilization: Option<f64>,
    pub trend: PressureTrend,
    pub risk: RiskTier,
}

/// Aggregate of routine-start to next-event spans
#[derive(Clone, Debug, Serialize, PartialEq, Default)]
pub struct RoutineStats {
    pub completed: usize,
    pub open: usize,
    pub average_minutes: Option<i64>,
    pub last_minutes: Option<i64>,
}

/// Read-only projection consumed by the presentation layer
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct OutputModel {
    pub summary: Vec<String>,
    pub is_asleep: bool,
    pub wake_window: Option<WakeWindow>,
    /// Latest instant the bedtime routine may begin
    pub hard_stop: Option<DateTime<Utc>>,
    pub expected_wake: Option<DateTime<Utc>>,
    pub tier: ActivityTier,
    pub categories: Categories,
    pub shifts: Vec<ShiftEvaluation>,
    pub pressure: PressureIndicator,
    pub routine: RoutineStats,
}
