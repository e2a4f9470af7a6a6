//! Service Sentinel: watches running system services and sends SMS alerts
//! when a monitored service stops or recovers, plus a daily heartbeat.
//!
//! The core is [`monitor::reconcile`], a pure function from the current
//! observation and the persisted [`state::Snapshot`] to notification events
//! and the next snapshot. [`daemon::PollLoop`] drives it on a fixed delay.

pub mod core;
pub mod daemon;
pub mod logger;
pub mod monitor;
pub mod notify;
pub mod state;

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod cli_app;
