//! Autosave configuration.

use std::time::Duration;

use notekeep_core::defaults::{
    AUTOSAVE_CONFLICT_DETECTION, AUTOSAVE_DEBOUNCE_MS, AUTOSAVE_EVENT_CAPACITY,
};

/// Configuration for the autosave scheduler.
#[derive(Debug, Clone)]
pub struct AutosaveConfig {
    /// Quiet period after the last edit before a flush.
    pub debounce: Duration,
    /// Buffer capacity of the per-editor event bus.
    pub event_capacity: usize,
    /// Send the last seen version with updates and reject stale writes.
    pub conflict_detection: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(AUTOSAVE_DEBOUNCE_MS),
            event_capacity: AUTOSAVE_EVENT_CAPACITY,
            conflict_detection: AUTOSAVE_CONFLICT_DETECTION,
        }
    }
}

impl AutosaveConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `AUTOSAVE_DEBOUNCE_MS` | `750` | Quiet period before a flush |
    /// | `AUTOSAVE_EVENT_CAPACITY` | `64` | Event bus buffer size |
    /// | `AUTOSAVE_CONFLICT_DETECTION` | `false` | Reject stale updates |
    pub fn from_env() -> Self {
        let debounce_ms = std::env::var("AUTOSAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(AUTOSAVE_DEBOUNCE_MS);

        let event_capacity = std::env::var("AUTOSAVE_EVENT_CAPACITY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(AUTOSAVE_EVENT_CAPACITY)
            .max(1);

        let conflict_detection = std::env::var("AUTOSAVE_CONFLICT_DETECTION")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(AUTOSAVE_CONFLICT_DETECTION);

        Self {
            debounce: Duration::from_millis(debounce_ms),
            event_capacity,
            conflict_detection,
        }
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Set the event bus capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Enable or disable version checks on update.
    pub fn with_conflict_detection(mut self, enabled: bool) -> Self {
        self.conflict_detection = enabled;
        self
    }
}
