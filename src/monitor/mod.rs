//! Service monitoring: observation sources and the reconciliation engine.

pub mod observe;
pub mod reconcile;

pub use observe::{ObservationSource, SystemctlSource};
pub use reconcile::{EventKind, NotificationEvent, Observation, Reconciliation, reconcile};
