//! Configuration file support for lull.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/lull/config.toml`.

use crate::{Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub constraints: ConstraintConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl DataConfig {
    /// Location of the persisted event log inside the data directory
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("log.json")
    }
}

/// Civil time configuration
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClockConfig {
    /// IANA zone identifier, e.g. "Europe/London"
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Tunable thresholds used by the normalizer and the projector.
///
/// Durations are whole minutes, hours are civil hours of day (0-23).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConstraintConfig {
    pub day_start_hour: u32,
    pub min_wake_window_min: u32,
    pub max_wake_window_min: u32,
    pub short_nap_threshold_min: u32,
    pub short_nap_wake_reduction_min: u32,
    pub late_nap_hour: u32,
    pub bedtime_cap_hour: u32,
    pub bedtime_cap_minute: u32,
    pub bedtime_pull_forward_min: u32,
    pub routine_latency_min: u32,
    pub setup_latency_min: u32,
    pub late_nap_next_nap_cap_min: u32,
    pub feed_interval_min_min: u32,
    pub feed_interval_max_min: u32,
    pub expected_nap_duration_min: u32,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            day_start_hour: 6,
            min_wake_window_min: 75,
            max_wake_window_min: 120,
            short_nap_threshold_min: 45,
            short_nap_wake_reduction_min: 15,
            late_nap_hour: 15,
            bedtime_cap_hour: 19,
            bedtime_cap_minute: 30,
            bedtime_pull_forward_min: 30,
            routine_latency_min: 20,
            setup_latency_min: 10,
            late_nap_next_nap_cap_min: 30,
            feed_interval_min_min: 150,
            feed_interval_max_min: 240,
            expected_nap_duration_min: 60,
        }
    }
}

fn minutes(value: u32) -> Duration {
    Duration::minutes(i64::from(value))
}

impl ConstraintConfig {
    pub fn min_wake(&self) -> Duration {
        minutes(self.min_wake_window_min)
    }

    pub fn max_wake(&self) -> Duration {
        minutes(self.max_wake_window_min)
    }

    pub fn short_nap_threshold(&self) -> Duration {
        minutes(self.short_nap_threshold_min)
    }

    pub fn short_nap_reduction(&self) -> Duration {
        minutes(self.short_nap_wake_reduction_min)
    }

    pub fn bedtime_pull_forward(&self) -> Duration {
        minutes(self.bedtime_pull_forward_min)
    }

    /// Routine plus setup time needed before the bedtime cap
    pub fn routine_lead(&self) -> Duration {
        minutes(self.routine_latency_min) + minutes(self.setup_latency_min)
    }

    pub fn late_nap_next_nap_cap(&self) -> Duration {
        minutes(self.late_nap_next_nap_cap_min)
    }

    pub fn feed_interval_min(&self) -> Duration {
        minutes(self.feed_interval_min_min)
    }

    pub fn expected_nap_duration(&self) -> Duration {
        minutes(self.expected_nap_duration_min)
    }

    /// Reject values that cannot describe a civil time or a usable window
    pub fn validate(&self) -> Result<()> {
        let hours = [
            ("day_start_hour", self.day_start_hour),
            ("late_nap_hour", self.late_nap_hour),
            ("bedtime_cap_hour", self.bedtime_cap_hour),
        ];
        for (name, value) in hours {
            if value > 23 {
                return Err(Error::Config(format!("{} must be 0-23, got {}", name, value)));
            }
        }
        if self.bedtime_cap_minute > 59 {
            return Err(Error::Config(format!(
                "bedtime_cap_minute must be 0-59, got {}",
                self.bedtime_cap_minute
            )));
        }
        if self.min_wake_window_min > self.max_wake_window_min {
            return Err(Error::Config(format!(
                "min_wake_window_min ({}) exceeds max_wake_window_min ({})",
                self.min_wake_window_min, self.max_wake_window_min
            )));
        }
        if self.feed_interval_min_min > self.feed_interval_max_min {
            return Err(Error::Config(format!(
                "feed_interval_min_min ({}) exceeds feed_interval_max_min ({})",
                self.feed_interval_min_min, self.feed_interval_max_min
            )));
        }
        if self.expected_nap_duration_min == 0 {
            return Err(Error::Config("expected_nap_duration_min must be positive".into()));
        }
        Ok(())
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("lull")
}

fn default_timezone() -> String {
    "UTC".into()
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.constraints.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("lull").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }
}
