//! Daemon self-monitoring: running counters and the degraded flag.

#![allow(missing_docs)]

use serde::Serialize;

/// Health counters accumulated over the life of one poll loop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DaemonHealth {
    pub ticks_completed: u64,
    /// Ticks abandoned because services could not be enumerated.
    pub ticks_skipped: u64,
    pub events_emitted: u64,
    pub deliveries_failed: u64,
    pub persistence_failures: u64,
    /// Set while the last snapshot write failed; cleared by the next good one.
    pub degraded: bool,
    /// The activity log fell back to stderr.
    pub log_degraded: bool,
    pub last_error: Option<String>,
}

impl DaemonHealth {
    pub fn record_skip(&mut self, error: &str) {
        self.ticks_skipped += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn record_tick(&mut self, events: usize) {
        self.ticks_completed += 1;
        self.events_emitted += events as u64;
    }

    pub fn record_delivery_failure(&mut self, error: &str) {
        self.deliveries_failed += 1;
        self.last_error = Some(error.to_string());
    }

    pub fn record_persist_failure(&mut self, error: &str) {
        self.persistence_failures += 1;
        self.degraded = true;
        self.last_error = Some(error.to_string());
    }

    pub fn record_persist_success(&mut self) {
        self.degraded = false;
    }
}
