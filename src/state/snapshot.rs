//! Persisted snapshot of last-known service status.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Last-known status of one monitored service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Running,
    Stopped,
    /// Never observed.
    #[default]
    Unknown,
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Unknown => "unknown",
        })
    }
}

/// The single persisted record: monitoring scope, per-service status, and
/// the date of the last heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Monitored service ids in the order events are emitted.
    pub services: Vec<String>,
    /// Required in the record. Absent entries read as [`ServiceStatus::Unknown`].
    pub last_status: BTreeMap<String, ServiceStatus>,
    /// `None` means no heartbeat has been recorded yet, so one is due.
    #[serde(default)]
    pub last_heartbeat: Option<NaiveDate>,
}

impl Snapshot {
    /// Fresh snapshot from setup: every service seeded as running, heartbeat
    /// counted as sent today.
    #[must_use]
    pub fn seeded(services: Vec<String>, today: NaiveDate) -> Self {
        let last_status = services
            .iter()
            .map(|service| (service.clone(), ServiceStatus::Running))
            .collect();
        Self {
            services,
            last_status,
            last_heartbeat: Some(today),
        }
    }

    #[must_use]
    pub fn status_of(&self, service: &str) -> ServiceStatus {
        self.last_status.get(service).copied().unwrap_or_default()
    }

    /// Monitored services with no recorded status. They stay silent until
    /// setup seeds them again.
    #[must_use]
    pub fn untracked(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|service| !self.last_status.contains_key(service.as_str()))
            .map(String::as_str)
            .collect()
    }

    /// Check structural invariants and drop status entries for services that
    /// are no longer monitored. Returns the pruned ids.
    pub fn validate_and_prune(&mut self) -> Result<Vec<String>, String> {
        if self.services.is_empty() {
            return Err("`services` is empty".to_string());
        }
        let mut seen = HashSet::with_capacity(self.services.len());
        for service in &self.services {
            if service.trim().is_empty() {
                return Err("`services` contains a blank id".to_string());
            }
            if !seen.insert(service.as_str()) {
                return Err(format!("`services` lists {service} more than once"));
            }
        }

        let stale: Vec<String> = self
            .last_status
            .keys()
            .filter(|key| !seen.contains(key.as_str()))
            .cloned()
            .collect();
        for key in &stale {
            self.last_status.remove(key);
        }
        Ok(stale)
    }
}
