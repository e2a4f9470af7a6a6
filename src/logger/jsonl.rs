//! JSONL activity log: one JSON object per line, append-only.
//!
//! Opening or writing the log file never fails the caller. When the file is
//! unusable the logger flips to degraded mode and writes entries to stderr
//! instead. Warnings and errors are always mirrored to stderr so a foreground
//! operator (or journald) sees them.

#![allow(missing_docs)]

use std::fs::{File, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const fn mirrors_to_stderr(self) -> bool {
        matches!(self, Self::Warn | Self::Error)
    }
}

#[derive(Debug, Serialize)]
struct LogEntry<'a> {
    ts: String,
    level: LogLevel,
    event: &'a str,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// Shared activity log handle.
#[derive(Debug)]
pub struct ActivityLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
    degraded: AtomicBool,
    quiet: bool,
}

impl ActivityLog {
    /// Open (creating parents as needed) the log at `path` in append mode.
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let file = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(path));
        let (file, degraded) = match file {
            Ok(file) => (Some(file), false),
            Err(err) => {
                eprintln!(
                    "[SEN-3002] activity log {} unavailable ({err}); logging to stderr",
                    path.display()
                );
                (None, true)
            }
        };
        Self {
            path: Some(path.to_path_buf()),
            file: Mutex::new(file),
            degraded: AtomicBool::new(degraded),
            quiet: false,
        }
    }

    /// Logger with no file backing; every entry goes to stderr.
    #[must_use]
    pub fn stderr_only() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
            degraded: AtomicBool::new(false),
            quiet: false,
        }
    }

    /// Suppress the stderr mirror of warnings/errors (file entries still land).
    #[must_use]
    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether a file write has failed since the log was opened.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Record one entry. `fields` should be a JSON object; other values are
    /// stored under a `detail` key.
    pub fn record(&self, level: LogLevel, event: &str, fields: Value) {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("detail".to_string(), other);
                map
            }
        };
        let entry = LogEntry {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level,
            event,
            fields,
        };
        let Ok(line) = serde_json::to_string(&entry) else {
            eprintln!("[SEN-2101] could not serialize log entry for event {event}");
            return;
        };

        let wrote_file = self.append_line(&line);
        if !wrote_file || (level.mirrors_to_stderr() && !self.quiet) {
            eprintln!("{line}");
        }
    }

    pub fn info(&self, event: &str, fields: Value) {
        self.record(LogLevel::Info, event, fields);
    }

    pub fn warn(&self, event: &str, fields: Value) {
        self.record(LogLevel::Warn, event, fields);
    }

    pub fn error(&self, event: &str, fields: Value) {
        self.record(LogLevel::Error, event, fields);
    }

    fn append_line(&self, line: &str) -> bool {
        let mut guard = self.file.lock();
        let Some(file) = guard.as_mut() else {
            return false;
        };
        match writeln!(file, "{line}") {
            Ok(()) => true,
            Err(err) => {
                if !self.degraded.swap(true, Ordering::Relaxed) {
                    eprintln!("[SEN-3002] activity log write failed ({err}); logging to stderr");
                }
                *guard = None;
                false
            }
        }
    }
}
