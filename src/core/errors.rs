//! SEN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, SentinelError>;

/// Top-level error type for Service Sentinel.
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("[SEN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[SEN-1002] no snapshot found at {path}; run `sentinel setup` first")]
    MissingSnapshot { path: PathBuf },

    #[error("[SEN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[SEN-1004] snapshot at {path} is corrupt: {details}")]
    CorruptSnapshot { path: PathBuf, details: String },

    #[error("[SEN-1005] no services selected for monitoring")]
    EmptySelection,

    #[error("[SEN-2001] service enumeration failed: {details}")]
    Observation { details: String },

    #[error("[SEN-2002] notification delivery failed: {details}")]
    Delivery { details: String },

    #[error("[SEN-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[SEN-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[SEN-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl SentinelError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "SEN-1001",
            Self::MissingSnapshot { .. } => "SEN-1002",
            Self::ConfigParse { .. } => "SEN-1003",
            Self::CorruptSnapshot { .. } => "SEN-1004",
            Self::EmptySelection => "SEN-1005",
            Self::Observation { .. } => "SEN-2001",
            Self::Delivery { .. } => "SEN-2002",
            Self::Serialization { .. } => "SEN-2101",
            Self::Io { .. } => "SEN-3002",
            Self::Runtime { .. } => "SEN-3900",
        }
    }

    /// Whether retrying on the next tick might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. }
                | Self::Observation { .. }
                | Self::Delivery { .. }
                | Self::Runtime { .. }
        )
    }

    /// Whether the error should send the operator back through `setup`.
    #[must_use]
    pub const fn needs_setup(&self) -> bool {
        matches!(
            self,
            Self::MissingSnapshot { .. } | Self::CorruptSnapshot { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for SentinelError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for SentinelError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

impl From<reqwest::Error> for SentinelError {
    fn from(value: reqwest::Error) -> Self {
        let details = if value.is_timeout() {
            format!("request timed out: {value}")
        } else {
            value.to_string()
        };
        Self::Delivery { details }
    }
}
