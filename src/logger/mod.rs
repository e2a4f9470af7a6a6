//! Append-only JSONL activity logging with graceful degradation to stderr.

pub mod jsonl;

pub use jsonl::{ActivityLog, LogLevel};
