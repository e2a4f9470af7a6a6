//! Reconciliation: observation + prior snapshot → notification events and
//! the next snapshot.
//!
//! Pure computation, no I/O. Notifications are strictly edge-triggered: only
//! `Running → Stopped` and `Stopped → Running` fire. A service whose prior
//! status is unknown is silent on first sighting, whichever way it is seen.
//! At most one heartbeat is produced per calendar day, always after every
//! service event.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::state::{ServiceStatus, Snapshot};

/// Ids of the services currently believed running.
pub type Observation = HashSet<String>;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Alert,
    Recovery,
    Heartbeat,
}

/// One message to hand to the notifier. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationEvent {
    pub kind: EventKind,
    /// `None` for heartbeats.
    pub service: Option<String>,
    pub message: String,
}

impl NotificationEvent {
    #[must_use]
    pub fn alert(service: &str) -> Self {
        Self {
            kind: EventKind::Alert,
            service: Some(service.to_string()),
            message: format!("[ALERT] Service {service} has stopped."),
        }
    }

    #[must_use]
    pub fn recovery(service: &str) -> Self {
        Self {
            kind: EventKind::Recovery,
            service: Some(service.to_string()),
            message: format!("[RECOVERY] Service {service} is running again."),
        }
    }

    #[must_use]
    pub fn heartbeat(now: NaiveDateTime) -> Self {
        Self {
            kind: EventKind::Heartbeat,
            service: None,
            message: format!(
                "[HEARTBEAT] Monitoring active. {}",
                now.format("%Y-%m-%dT%H:%M")
            ),
        }
    }
}

/// Output of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// Service events in `services` order, heartbeat last.
    pub events: Vec<NotificationEvent>,
    pub snapshot: Snapshot,
    /// Whether `snapshot` differs from the input and must be persisted.
    pub changed: bool,
}

/// Compute the events and next snapshot for one tick. `now` is local wall
/// time; its date decides whether the daily heartbeat is due.
#[must_use]
pub fn reconcile(
    observation: &Observation,
    previous: &Snapshot,
    now: NaiveDateTime,
) -> Reconciliation {
    let mut snapshot = previous.clone();
    let mut events = Vec::new();

    for service in &previous.services {
        let current = if observation.contains(service) {
            ServiceStatus::Running
        } else {
            ServiceStatus::Stopped
        };
        let event = match (previous.status_of(service), current) {
            (ServiceStatus::Running, ServiceStatus::Stopped) => NotificationEvent::alert(service),
            (ServiceStatus::Stopped, ServiceStatus::Running) => {
                NotificationEvent::recovery(service)
            }
            _ => continue,
        };
        snapshot.last_status.insert(service.clone(), current);
        events.push(event);
    }

    let today = now.date();
    if previous.last_heartbeat != Some(today) {
        events.push(NotificationEvent::heartbeat(now));
        snapshot.last_heartbeat = Some(today);
    }

    let changed = !events.is_empty();
    Reconciliation {
        events,
        snapshot,
        changed,
    }
}
