//! End-to-end tick scenarios through the public library API: scripted
//! observations, an in-memory notifier, and a real snapshot file.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use service_sentinel::core::errors::{Result, SentinelError};
use service_sentinel::daemon::{LoopSettings, PollLoop};
use service_sentinel::logger::ActivityLog;
use service_sentinel::monitor::{Observation, ObservationSource};
use service_sentinel::notify::{Notifier, SendOutcome};
use service_sentinel::state::{LoadOutcome, ServiceStatus, Snapshot, SnapshotStore};
use tempfile::TempDir;

struct Script(VecDeque<Result<Vec<&'static str>>>);

impl ObservationSource for Script {
    fn running_services(&mut self) -> Result<Observation> {
        self.0
            .pop_front()
            .expect("script exhausted")
            .map(|ids| ids.into_iter().map(String::from).collect())
    }
}

#[derive(Default)]
struct Inbox(Vec<String>);

impl Notifier for Inbox {
    fn send(&mut self, _destination: &str, message: &str) -> SendOutcome {
        self.0.push(message.to_string());
        SendOutcome::delivered(false)
    }
}

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn snapshot(entries: &[(&str, ServiceStatus)], heartbeat_day: u32) -> Snapshot {
    Snapshot {
        services: entries.iter().map(|(id, _)| (*id).to_string()).collect(),
        last_status: entries
            .iter()
            .map(|(id, status)| ((*id).to_string(), *status))
            .collect(),
        last_heartbeat: NaiveDate::from_ymd_opt(2026, 10, heartbeat_day),
    }
}

fn harness(
    tmp: &TempDir,
    script: Vec<Result<Vec<&'static str>>>,
    start: Snapshot,
    times: Vec<NaiveDateTime>,
) -> (PollLoop<Script, Inbox>, SnapshotStore) {
    let log = Arc::new(ActivityLog::open(&tmp.path().join("activity.jsonl")).quiet());
    let store = SnapshotStore::new(tmp.path().join("snapshot.json"), Arc::clone(&log));
    let mut times: VecDeque<NaiveDateTime> = times.into();
    let last = *times.back().expect("at least one time");
    let poll = PollLoop::new(
        Script(script.into()),
        Inbox::default(),
        store.clone(),
        start,
        LoopSettings {
            interval: Duration::from_millis(10),
            destination: "15551234567".into(),
        },
        log,
    )
    .with_clock(Box::new(move || times.pop_front().unwrap_or(last)));
    (poll, store)
}

#[test]
fn scenario_a_stop_raises_one_alert() {
    let tmp = TempDir::new().unwrap();
    let (mut poll, store) = harness(
        &tmp,
        vec![Ok(vec![])],
        snapshot(&[("x", ServiceStatus::Running)], 16),
        vec![at(16, 9)],
    );
    poll.tick();
    assert_eq!(poll.notifier().0, vec!["[ALERT] Service x has stopped."]);
    let stored = store.load_required().unwrap();
    assert_eq!(stored.status_of("x"), ServiceStatus::Stopped);
}

#[test]
fn scenario_b_return_raises_one_recovery() {
    let tmp = TempDir::new().unwrap();
    let (mut poll, store) = harness(
        &tmp,
        vec![Ok(vec!["x"])],
        snapshot(&[("x", ServiceStatus::Stopped)], 16),
        vec![at(16, 9)],
    );
    poll.tick();
    assert_eq!(poll.notifier().0, vec!["[RECOVERY] Service x is running again."]);
    assert_eq!(
        store.load_required().unwrap().status_of("x"),
        ServiceStatus::Running
    );
}

#[test]
fn scenario_c_new_day_heartbeat_without_transitions() {
    let tmp = TempDir::new().unwrap();
    let (mut poll, store) = harness(
        &tmp,
        vec![Ok(vec!["x"])],
        snapshot(&[("x", ServiceStatus::Running)], 15),
        vec![at(16, 0)],
    );
    let report = poll.tick();
    assert!(report.persisted);
    assert_eq!(poll.notifier().0.len(), 1);
    assert!(poll.notifier().0[0].starts_with("[HEARTBEAT] Monitoring active. 2026-10-16T00:00"));
    assert_eq!(
        store.load_required().unwrap().last_heartbeat,
        NaiveDate::from_ymd_opt(2026, 10, 16)
    );
}

#[test]
fn scenario_d_corrupt_record_reads_as_not_found() {
    let tmp = TempDir::new().unwrap();
    let store = SnapshotStore::new(
        tmp.path().join("snapshot.json"),
        Arc::new(ActivityLog::stderr_only()),
    );
    std::fs::write(store.path(), "last_status = running").unwrap();
    assert!(store.load().unwrap().into_snapshot().is_none());
    assert!(!store.path().exists());
    assert_eq!(store.load().unwrap(), LoadOutcome::NotFound);
}

#[test]
fn heartbeat_fires_once_across_a_day_of_ticks() {
    let tmp = TempDir::new().unwrap();
    let ticks = 24;
    let (mut poll, _store) = harness(
        &tmp,
        (0..ticks).map(|_| Ok(vec!["x"])).collect(),
        snapshot(&[("x", ServiceStatus::Running)], 15),
        (0..ticks).map(|hour| at(16, hour)).collect(),
    );
    for _ in 0..ticks {
        poll.tick();
    }
    let heartbeats = poll
        .notifier()
        .0
        .iter()
        .filter(|m| m.starts_with("[HEARTBEAT]"))
        .count();
    assert_eq!(heartbeats, 1);
}

#[test]
fn outage_then_recovery_then_enumeration_failure() {
    let tmp = TempDir::new().unwrap();
    let (mut poll, _store) = harness(
        &tmp,
        vec![
            Ok(vec!["a", "b"]),
            Ok(vec!["b"]),
            Ok(vec!["b"]),
            Err(SentinelError::Observation {
                details: "systemctl timed out".into(),
            }),
            Ok(vec!["a", "b"]),
        ],
        snapshot(&[("a", ServiceStatus::Running), ("b", ServiceStatus::Running)], 16),
        vec![at(16, 9)],
    );
    for _ in 0..5 {
        poll.tick();
    }
    assert_eq!(
        poll.notifier().0,
        vec![
            "[ALERT] Service a has stopped.",
            "[RECOVERY] Service a is running again.",
        ]
    );
    assert_eq!(poll.health().ticks_skipped, 1);
    assert_eq!(poll.health().ticks_completed, 4);
}

#[test]
fn restart_after_persisted_transition_does_not_repeat_it() {
    let tmp = TempDir::new().unwrap();
    let start = snapshot(&[("x", ServiceStatus::Running)], 16);
    let (mut first, store) = harness(&tmp, vec![Ok(vec![])], start, vec![at(16, 9)]);
    first.tick();
    assert_eq!(first.notifier().0.len(), 1);
    drop(first);

    let reloaded = store.load_required().unwrap();
    let (mut second, _) = harness(&tmp, vec![Ok(vec![])], reloaded, vec![at(16, 10)]);
    let report = second.tick();
    assert_eq!(report.events, 0);
    assert!(second.notifier().0.is_empty());
}

#[test]
fn first_sighting_of_unknown_services_is_silent() {
    let tmp = TempDir::new().unwrap();
    let start = Snapshot {
        services: vec!["new-a".into(), "new-b".into()],
        last_status: BTreeMap::new(),
        last_heartbeat: NaiveDate::from_ymd_opt(2026, 10, 16),
    };
    let (mut poll, store) = harness(&tmp, vec![Ok(vec!["new-a"])], start, vec![at(16, 9)]);
    let report = poll.tick();
    assert_eq!(report.events, 0);
    assert!(!report.persisted);
    assert!(!store.path().exists());
}

fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    let status = prop_oneof![
        Just(ServiceStatus::Running),
        Just(ServiceStatus::Stopped),
        Just(ServiceStatus::Unknown),
    ];
    (
        prop::collection::btree_map("[a-z][a-z0-9@._-]{0,20}", status, 1..8),
        prop::option::of(0u32..3650),
    )
        .prop_map(|(entries, offset)| Snapshot {
            services: entries.keys().cloned().collect(),
            last_status: entries,
            last_heartbeat: offset.map(|days| {
                NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Days::new(u64::from(days))
            }),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn save_load_save_round_trips(original in snapshot_strategy()) {
        let tmp = TempDir::new().unwrap();
        let store = SnapshotStore::new(
            tmp.path().join("snapshot.json"),
            Arc::new(ActivityLog::stderr_only()),
        );
        store.save(&original).unwrap();
        let loaded = store.load_required().unwrap();
        store.save(&loaded).unwrap();
        let reloaded = store.load_required().unwrap();
        prop_assert_eq!(&loaded, &original);
        prop_assert_eq!(reloaded, original);
    }
}
