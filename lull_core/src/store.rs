//! Event log persistence with file locking.
//!
//! The store fails open: any problem reading the payload yields an empty
//! log. Legacy records are upgraded here, before the pipeline sees them.

use crate::{AutoSuppressionEntry, CareEvent, Error, EventLog, EventType, Result};
use chrono::{DateTime, TimeZone, Utc};
use fs2::FileExt;
use serde::Deserialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use uuid::Uuid;

/// On-disk payload, read leniently record by record
#[derive(Debug, Deserialize, Default)]
struct StoredPayload {
    #[serde(rename = "eventLog", default)]
    event_log: Vec<serde_json::Value>,
    #[serde(rename = "autoSuppressed", default)]
    auto_suppressed: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEvent {
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    timestamp_utc: Option<String>,
    /// Legacy Unix-millisecond timestamp
    timestamp: Option<f64>,
    #[serde(default)]
    auto_predicted: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSuppression {
    #[serde(rename = "type")]
    event_type: String,
    timestamp_utc: String,
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl StoredEvent {
    fn upgrade(self, now: DateTime<Utc>) -> std::result::Result<CareEvent, String> {
        let event_type: EventType = self.event_type.parse().map_err(|e| format!("{}", e))?;

        let timestamp_utc = match (&self.timestamp_utc, self.timestamp) {
            (Some(iso), _) => {
                parse_instant(iso).ok_or_else(|| format!("unparseable timestamp '{}'", iso))?
            }
            (None, Some(millis)) => Utc
                .timestamp_millis_opt(millis as i64)
                .single()
                .unwrap_or(now),
            (None, None) => now,
        };

        Ok(CareEvent {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            event_type,
            timestamp_utc,
            auto_predicted: self.auto_predicted,
        })
    }
}

impl StoredSuppression {
    fn upgrade(self) -> std::result::Result<AutoSuppressionEntry, String> {
        let event_type: EventType = self.event_type.parse().map_err(|e| format!("{}", e))?;
        let timestamp_utc = parse_instant(&self.timestamp_utc)
            .ok_or_else(|| format!("unparseable timestamp '{}'", self.timestamp_utc))?;
        Ok(AutoSuppressionEntry {
            event_type,
            timestamp_utc,
        })
    }
}

impl EventLog {
    /// Interpret a serialized payload, skipping records that cannot be
    /// upgraded. A payload that is not JSON at all is an error.
    pub fn from_json(contents: &str, now: DateTime<Utc>) -> Result<Self> {
        let payload: StoredPayload = serde_json::from_str(contents)?;
        let mut log = EventLog::new();

        for (index, value) in payload.event_log.into_iter().enumerate() {
            let upgraded = serde_json::from_value::<StoredEvent>(value)
                .map_err(|e| e.to_string())
                .and_then(|stored| stored.upgrade(now));
            match upgraded {
                Ok(event) => log.events.push(event),
                Err(e) => tracing::warn!("Skipping stored event {}: {}", index, e),
            }
        }

        for (index, value) in payload.auto_suppressed.into_iter().enumerate() {
            let upgraded = serde_json::from_value::<StoredSuppression>(value)
                .map_err(|e| e.to_string())
                .and_then(StoredSuppression::upgrade);
            match upgraded {
                Ok(entry) => log.suppressed.push(entry),
                Err(e) => tracing::warn!("Skipping suppression entry {}: {}", index, e),
            }
        }

        Ok(log)
    }

    /// Load the event log from a file with shared locking
    ///
    /// Returns an empty log if the file doesn't exist or cannot be read.
    /// `now` stands in for legacy records that carry no timestamp at all.
    pub fn load(path: &Path, now: DateTime<Utc>) -> Self {
        if !path.exists() {
            tracing::info!("No event log found at {:?}, starting empty", path);
            return Self::default();
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open event log {:?}: {}. Starting empty.", path, e);
                return Self::default();
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock event log {:?}: {}. Starting empty.", path, e);
            return Self::default();
        }

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        let _ = file.unlock();
        if let Err(e) = read {
            tracing::warn!("Failed to read event log {:?}: {}. Starting empty.", path, e);
            return Self::default();
        }

        match Self::from_json(&contents, now) {
            Ok(log) => {
                tracing::debug!(
                    "Loaded {} events and {} suppressions from {:?}",
                    log.events.len(),
                    log.suppressed.len(),
                    path
                );
                log
            }
            Err(e) => {
                tracing::warn!("Failed to parse event log {:?}: {}. Starting empty.", path, e);
                Self::default()
            }
        }
    }

    /// Save the event log with exclusive locking
    ///
    /// Atomically writes by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Store(format!("event log path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} events to {:?}", self.events.len(), path);
        Ok(())
    }

    /// Load the log, modify it, and save it back
    pub fn update<F>(path: &Path, now: DateTime<Utc>, f: F) -> Result<Self>
    where
        F: FnOnce(&mut EventLog) -> Result<()>,
    {
        let mut log = Self::load(path, now);
        f(&mut log)?;
        log.save(path)?;
        Ok(log)
    }
}
