//! Persisted monitoring state: the snapshot record and its durable store.

pub mod snapshot;
pub mod store;

pub use snapshot::{ServiceStatus, Snapshot};
pub use store::{LoadOutcome, SnapshotStore};
