//! Outbound notification delivery.
//!
//! The poll loop only sees the [`Notifier`] trait. Delivery never fails the
//! caller: every problem (transport error, timeout, gateway rejection,
//! malformed response) comes back as an undelivered [`SendOutcome`].

#![allow(missing_docs)]

pub mod voipms;

use std::borrow::Cow;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::logger::ActivityLog;

pub use voipms::VoipMsNotifier;

/// Result of one delivery attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SendOutcome {
    pub delivered: bool,
    pub error_detail: Option<String>,
    /// The body was cut to the provider's length limit before sending.
    pub truncated: bool,
}

impl SendOutcome {
    #[must_use]
    pub const fn delivered(truncated: bool) -> Self {
        Self {
            delivered: true,
            error_detail: None,
            truncated,
        }
    }

    #[must_use]
    pub fn failed(detail: impl Into<String>, truncated: bool) -> Self {
        Self {
            delivered: false,
            error_detail: Some(detail.into()),
            truncated,
        }
    }
}

/// Something that can deliver a text message to a destination.
pub trait Notifier {
    fn send(&mut self, destination: &str, message: &str) -> SendOutcome;
}

impl<T: Notifier + ?Sized> Notifier for Box<T> {
    fn send(&mut self, destination: &str, message: &str) -> SendOutcome {
        (**self).send(destination, message)
    }
}

/// Cut `message` to at most `max_chars` characters on a char boundary.
#[must_use]
pub fn truncate_message(message: &str, max_chars: usize) -> (Cow<'_, str>, bool) {
    match message.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (Cow::Borrowed(&message[..byte_idx]), true),
        None => (Cow::Borrowed(message), false),
    }
}

/// Records messages in the activity log instead of sending them.
#[derive(Debug, Clone)]
pub struct DryRunNotifier {
    log: Arc<ActivityLog>,
    max_chars: usize,
}

impl DryRunNotifier {
    #[must_use]
    pub const fn new(log: Arc<ActivityLog>, max_chars: usize) -> Self {
        Self { log, max_chars }
    }
}

impl Notifier for DryRunNotifier {
    fn send(&mut self, destination: &str, message: &str) -> SendOutcome {
        let (body, truncated) = truncate_message(message, self.max_chars);
        self.log.info(
            "dry_run_message",
            json!({ "destination": destination, "message": body, "truncated": truncated }),
        );
        SendOutcome::delivered(truncated)
    }
}
