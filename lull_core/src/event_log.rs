//! The event log: care events plus suppression markers.
//!
//! Only timestamps and the `auto_predicted` flag of an existing event are
//! ever changed in place. Editing or deleting a synthesized event records a
//! suppression entry for its original slot so the normalizer will not bring
//! it back.

use crate::{AutoSuppressionEntry, CareEvent, EventType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EventLog {
    #[serde(rename = "eventLog", default)]
    pub events: Vec<CareEvent>,
    #[serde(rename = "autoSuppressed", default)]
    pub suppressed: Vec<AutoSuppressionEntry>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a new user event and return its id
    pub fn append(&mut self, event_type: EventType, at: DateTime<Utc>) -> String {
        let id = Uuid::new_v4().to_string();
        self.events.push(CareEvent::logged(id.clone(), event_type, at));
        tracing::debug!("Appended {} at {}", event_type, at);
        id
    }

    pub fn push(&mut self, event: CareEvent) {
        self.events.push(event);
    }

    pub fn find(&self, id: &str) -> Option<&CareEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Move an event to a new instant. The event becomes a real one.
    ///
    /// Returns false when no event has this id.
    pub fn edit_timestamp(&mut self, id: &str, at: DateTime<Utc>) -> bool {
        let Some(event) = self.events.iter_mut().find(|e| e.id == id) else {
            tracing::debug!("Edit ignored, no event with id {}", id);
            return false;
        };

        if event.auto_predicted {
            self.suppressed.push(AutoSuppressionEntry {
                event_type: event.event_type,
                timestamp_utc: event.timestamp_utc,
            });
        }
        event.timestamp_utc = at;
        event.auto_predicted = false;
        true
    }

    /// Remove an event. Returns it, or None when no event has this id.
    pub fn delete(&mut self, id: &str) -> Option<CareEvent> {
        let Some(index) = self.events.iter().position(|e| e.id == id) else {
            tracing::debug!("Delete ignored, no event with id {}", id);
            return None;
        };

        let removed = self.events.remove(index);
        if removed.auto_predicted {
            self.suppressed.push(AutoSuppressionEntry {
                event_type: removed.event_type,
                timestamp_utc: removed.timestamp_utc,
            });
        }
        Some(removed)
    }

    /// Replace stored events with a normalized log so that synthesized
    /// events can be addressed by id.
    pub fn adopt(&mut self, normalized: Vec<CareEvent>) {
        self.events = normalized;
    }
}
