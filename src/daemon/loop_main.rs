//! The poll loop: observe → reconcile → persist → notify, on a fixed delay.
//!
//! Ticks never overlap. The delay starts when a tick finishes, so a slow
//! gateway stretches the cadence instead of stacking ticks. A stop request
//! is honoured only between ticks; a tick in progress always runs to the
//! end, so the snapshot file only ever holds fully applied state.

#![allow(missing_docs)]

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use serde::Serialize;
use serde_json::json;

use super::self_monitor::DaemonHealth;
use crate::logger::ActivityLog;
use crate::monitor::{EventKind, ObservationSource, reconcile};
use crate::notify::Notifier;
use crate::state::{Snapshot, SnapshotStore};

/// Why the loop was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopRequest {
    /// OS signal number.
    Signal(i32),
    /// Programmatic stop (tests, embedding callers).
    Requested,
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopPhase {
    Idle,
    Reconciling,
    Cancelled,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Enumeration failed; nothing was reconciled.
    pub skipped: bool,
    pub events: usize,
    pub persisted: bool,
    pub persist_failed: bool,
    pub delivered: usize,
    pub delivery_failures: usize,
}

/// Wall-clock source; local time so the heartbeat follows the local calendar day.
pub type Clock = Box<dyn FnMut() -> NaiveDateTime + Send>;

/// Poll loop settings that do not come from the snapshot.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub interval: Duration,
    pub destination: String,
}

/// Owns everything a tick touches. No shared globals.
pub struct PollLoop<S, N> {
    source: S,
    notifier: N,
    store: SnapshotStore,
    snapshot: Snapshot,
    settings: LoopSettings,
    log: Arc<ActivityLog>,
    clock: Clock,
    health: DaemonHealth,
    phase: LoopPhase,
    /// The in-memory snapshot is ahead of the file after a failed save.
    pending_save: bool,
}

impl<S: ObservationSource, N: Notifier> PollLoop<S, N> {
    pub fn new(
        source: S,
        notifier: N,
        store: SnapshotStore,
        snapshot: Snapshot,
        settings: LoopSettings,
        log: Arc<ActivityLog>,
    ) -> Self {
        Self {
            source,
            notifier,
            store,
            snapshot,
            settings,
            log,
            clock: Box::new(|| Local::now().naive_local()),
            health: DaemonHealth::default(),
            phase: LoopPhase::Idle,
            pending_save: false,
        }
    }

    /// Replace the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn health(&self) -> &DaemonHealth {
        &self.health
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Run one complete tick.
    ///
    /// The new snapshot is committed in memory even when the save fails, so a
    /// transition is never notified twice by one process. After a failed save
    /// every completed tick writes again until one succeeds.
    pub fn tick(&mut self) -> TickReport {
        self.phase = LoopPhase::Reconciling;
        let report = self.run_tick();
        self.phase = LoopPhase::Idle;
        report
    }

    fn run_tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        let observation = match self.source.running_services() {
            Ok(observation) => observation,
            Err(err) => {
                let detail = err.to_string();
                self.log.warn(
                    "observation_failed",
                    json!({ "code": err.code(), "error": detail, "retryable": err.is_retryable() }),
                );
                self.health.record_skip(&detail);
                report.skipped = true;
                return report;
            }
        };

        let now = (self.clock)();
        let outcome = reconcile(&observation, &self.snapshot, now);
        report.events = outcome.events.len();

        if outcome.changed || self.pending_save {
            match self.store.save(&outcome.snapshot) {
                Ok(()) => {
                    if self.pending_save {
                        self.log.info(
                            "persist_recovered",
                            json!({ "path": self.store.path() }),
                        );
                    }
                    self.pending_save = false;
                    report.persisted = true;
                    self.health.record_persist_success();
                }
                Err(err) => {
                    let detail = err.to_string();
                    self.log.error(
                        "persist_failed",
                        json!({
                            "code": err.code(),
                            "error": detail,
                            "path": self.store.path(),
                            "retryable": err.is_retryable(),
                            "consequence": "transitions may be re-notified after restart",
                        }),
                    );
                    self.pending_save = true;
                    self.health.record_persist_failure(&detail);
                    report.persist_failed = true;
                }
            }
        }
        self.snapshot = outcome.snapshot;

        for event in &outcome.events {
            if event.kind != EventKind::Heartbeat {
                self.log.info(
                    "service_transition",
                    json!({ "kind": event.kind, "service": event.service }),
                );
            }
            let sent = self
                .notifier
                .send(&self.settings.destination, &event.message);
            if sent.delivered {
                report.delivered += 1;
                self.log.info(
                    "notification_sent",
                    json!({ "kind": event.kind, "service": event.service, "truncated": sent.truncated }),
                );
            } else {
                let detail = sent
                    .error_detail
                    .unwrap_or_else(|| "unknown delivery failure".to_string());
                report.delivery_failures += 1;
                self.log.warn(
                    "notification_failed",
                    json!({ "kind": event.kind, "service": event.service, "error": detail }),
                );
                self.health.record_delivery_failure(&detail);
            }
        }

        self.health.record_tick(report.events);
        self.health.log_degraded = self.log.is_degraded();
        report
    }

    /// Tick until a stop request arrives, then return the final health record.
    ///
    /// The wait between ticks doubles as the stop check. If every sender is
    /// gone the loop keeps its cadence with a plain sleep.
    pub fn run(mut self, stop: &Receiver<StopRequest>) -> DaemonHealth {
        self.log.info(
            "daemon_started",
            json!({
                "services": self.snapshot.services,
                "interval_secs": self.settings.interval.as_secs(),
                "state_file": self.store.path(),
            }),
        );

        let reason = loop {
            match stop.try_recv() {
                Ok(request) => break request,
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
            }

            let report = self.tick();
            if report.events > 0 || report.skipped {
                self.log.info("tick", json!(report));
            }

            match stop.recv_timeout(self.settings.interval) {
                Ok(request) => break request,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => thread::sleep(self.settings.interval),
            }
        };

        self.phase = LoopPhase::Cancelled;
        self.log.info(
            "daemon_stopped",
            json!({ "reason": reason, "health": self.health }),
        );
        self.health
    }
}
