//! TOML configuration: file paths, poll cadence, and SMS gateway settings.
//!
//! Every field has a default so a missing file is not an error; settings can
//! come entirely from `SENTINEL_*` environment variables. Validation happens
//! once at load time, never at point of use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SentinelError};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/sentinel/config.toml";
/// Environment variable that overrides the configuration path.
pub const CONFIG_PATH_ENV: &str = "SENTINEL_CONFIG";

/// Full daemon configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub poll: PollConfig,
    pub notifier: NotifierConfig,
}

/// On-disk locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Where this configuration was (or will be) read from.
    #[serde(skip)]
    pub config_file: PathBuf,
    /// Persisted snapshot of last-known service status.
    pub state_file: PathBuf,
    /// Append-only JSONL activity log.
    pub activity_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from(DEFAULT_CONFIG_PATH),
            state_file: PathBuf::from("/var/lib/sentinel/snapshot.json"),
            activity_log: PathBuf::from("/var/lib/sentinel/activity.jsonl"),
        }
    }
}

/// Poll loop cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Delay between the end of one tick and the start of the next.
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

impl PollConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// VoIP.ms SMS gateway settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub endpoint: String,
    pub api_username: String,
    pub api_password: String,
    /// SMS-enabled sender number.
    pub did: String,
    /// Number that receives alerts.
    pub destination: String,
    pub timeout_secs: u64,
    pub max_message_chars: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://voip.ms/api/v1/rest.php".to_string(),
            api_username: String::new(),
            api_password: String::new(),
            did: String::new(),
            destination: String::new(),
            timeout_secs: 10,
            max_message_chars: 160,
        }
    }
}

// Redacts the API password.
impl std::fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let password = if self.api_password.is_empty() {
            "<unset>"
        } else {
            "<redacted>"
        };
        f.debug_struct("NotifierConfig")
            .field("endpoint", &self.endpoint)
            .field("api_username", &self.api_username)
            .field("api_password", &password)
            .field("did", &self.did)
            .field("destination", &self.destination)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_message_chars", &self.max_message_chars)
            .finish()
    }
}

impl NotifierConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Names of the credential fields that are still blank.
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            ("api_username", &self.api_username),
            ("api_password", &self.api_password),
            ("did", &self.did),
            ("destination", &self.destination),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

impl Config {
    /// Resolve the config path: explicit argument, then `SENTINEL_CONFIG`,
    /// then [`DEFAULT_CONFIG_PATH`].
    #[must_use]
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        explicit.map_or_else(
            || {
                std::env::var_os(CONFIG_PATH_ENV)
                    .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
            },
            Path::to_path_buf,
        )
    }

    /// Load configuration from `path`, apply environment overrides, validate.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => return Err(SentinelError::io(path, err)),
        };
        config.paths.config_file = path.to_path_buf();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document. Unknown keys are rejected at this boundary.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let value: toml::Table = toml::from_str(raw)?;
        for key in value.keys() {
            if !matches!(key.as_str(), "paths" | "poll" | "notifier") {
                return Err(SentinelError::ConfigParse {
                    context: "toml",
                    details: format!("unknown section [{key}]"),
                });
            }
        }
        Ok(toml::from_str(raw)?)
    }

    /// Apply `SENTINEL_*` overrides through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string_overrides: [(&str, &mut String); 4] = [
            ("SENTINEL_API_USERNAME", &mut self.notifier.api_username),
            ("SENTINEL_API_PASSWORD", &mut self.notifier.api_password),
            ("SENTINEL_DID", &mut self.notifier.did),
            ("SENTINEL_DESTINATION", &mut self.notifier.destination),
        ];
        for (key, slot) in string_overrides {
            if let Some(value) = lookup(key) {
                *slot = value;
            }
        }
        if let Some(value) = lookup("SENTINEL_STATE_FILE") {
            self.paths.state_file = PathBuf::from(value);
        }
        if let Some(value) = lookup("SENTINEL_POLL_INTERVAL_SECS") {
            self.poll.interval_secs =
                value
                    .trim()
                    .parse()
                    .map_err(|err| SentinelError::InvalidConfig {
                        details: format!("SENTINEL_POLL_INTERVAL_SECS={value:?}: {err}"),
                    })?;
        }
        Ok(())
    }

    /// Structural validation that does not depend on the command being run.
    pub fn validate(&self) -> Result<()> {
        if self.poll.interval_secs == 0 {
            return Err(SentinelError::InvalidConfig {
                details: "poll.interval_secs must be at least 1".to_string(),
            });
        }
        if self.notifier.timeout_secs == 0 {
            return Err(SentinelError::InvalidConfig {
                details: "notifier.timeout_secs must be at least 1".to_string(),
            });
        }
        if self.notifier.max_message_chars == 0 {
            return Err(SentinelError::InvalidConfig {
                details: "notifier.max_message_chars must be at least 1".to_string(),
            });
        }
        if self.paths.state_file.as_os_str().is_empty() {
            return Err(SentinelError::InvalidConfig {
                details: "paths.state_file must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Validation for commands that actually send messages.
    pub fn validate_for_sending(&self) -> Result<()> {
        let missing = self.notifier.missing_credentials();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SentinelError::InvalidConfig {
                details: format!("notifier settings missing: {}", missing.join(", ")),
            })
        }
    }
}
