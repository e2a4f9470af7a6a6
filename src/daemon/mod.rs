//! Daemon subsystem: the poll loop, signal handling, self-monitoring.

pub mod loop_main;
pub mod self_monitor;
#[cfg(feature = "daemon")]
pub mod signals;

pub use loop_main::{LoopPhase, LoopSettings, PollLoop, StopRequest, TickReport};
pub use self_monitor::DaemonHealth;
