//! VoIP.ms `sendSMS` client over a blocking HTTP client with a bounded timeout.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use super::{Notifier, SendOutcome, truncate_message};
use crate::core::config::NotifierConfig;
use crate::core::errors::Result;

/// User agent sent with every gateway request.
pub const USER_AGENT: &str = concat!("service-sentinel/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

/// SMS delivery through the VoIP.ms REST API.
#[derive(Debug, Clone)]
pub struct VoipMsNotifier {
    client: Client,
    config: NotifierConfig,
}

impl VoipMsNotifier {
    /// Build a notifier with the configured endpoint, credentials, and timeout.
    pub fn from_config(config: &NotifierConfig) -> Result<Self> {
        let client = build_client(config.timeout())?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn deliver(&self, destination: &str, body: &str) -> std::result::Result<(), String> {
        let params = [
            ("api_username", self.config.api_username.as_str()),
            ("api_password", self.config.api_password.as_str()),
            ("format", "json"),
            ("method", "sendSMS"),
            ("did", self.config.did.as_str()),
            ("dst", destination),
            ("message", body),
        ];
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .map_err(describe_transport_error)?;

        let status = response.status();
        let text = response
            .text()
            .map_err(describe_transport_error)?;
        if !status.is_success() {
            return Err(format!("gateway returned HTTP {status}: {}", snippet(&text)));
        }
        parse_gateway_response(&text)
    }
}

impl Notifier for VoipMsNotifier {
    fn send(&mut self, destination: &str, message: &str) -> SendOutcome {
        let (body, truncated) = truncate_message(message, self.config.max_message_chars);
        match self.deliver(destination, &body) {
            Ok(()) => SendOutcome::delivered(truncated),
            Err(detail) => SendOutcome::failed(detail, truncated),
        }
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout)
        .build()?)
}

/// Interpret a gateway body. Anything other than `{"status": "success"}`,
/// including non-JSON, is a failure.
pub fn parse_gateway_response(body: &str) -> std::result::Result<(), String> {
    let parsed: GatewayResponse = serde_json::from_str(body)
        .map_err(|err| format!("unparseable gateway response ({err}): {}", snippet(body)))?;
    if parsed.status == "success" {
        Ok(())
    } else {
        Err(parsed.message.map_or_else(
            || format!("gateway status {}", parsed.status),
            |message| format!("gateway status {}: {message}", parsed.status),
        ))
    }
}

fn describe_transport_error(err: reqwest::Error) -> String {
    // Strip the URL: its query string carries the API password.
    let err = err.without_url();
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

fn snippet(body: &str) -> String {
    let (cut, truncated) = truncate_message(body.trim(), 120);
    if truncated {
        format!("{cut}…")
    } else {
        cut.into_owned()
    }
}
