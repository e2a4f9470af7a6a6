//! Observation sources: where the set of currently running services comes from.

#![allow(missing_docs)]

use std::ffi::OsString;
use std::process::Command;

use super::reconcile::Observation;
use crate::core::errors::{Result, SentinelError};

/// Supplies the ids of services currently running.
///
/// An empty set is a valid answer. Failing to enumerate must be an `Err`,
/// never an empty set, or every monitored service would look stopped.
pub trait ObservationSource {
    fn running_services(&mut self) -> Result<Observation>;
}

/// Enumerates running units through `systemctl list-units`.
#[derive(Debug, Clone)]
pub struct SystemctlSource {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for SystemctlSource {
    fn default() -> Self {
        Self {
            program: "systemctl".into(),
            args: [
                "list-units",
                "--type=service",
                "--state=running",
                "--no-legend",
                "--no-pager",
                "--plain",
            ]
            .into_iter()
            .map(OsString::from)
            .collect(),
        }
    }
}

impl SystemctlSource {
    /// Run an arbitrary command that prints systemctl-style unit lines.
    #[must_use]
    pub fn with_command<I, S>(program: impl Into<OsString>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Same as [`ObservationSource::running_services`] but ordered as listed,
    /// for presenting a selection menu during setup.
    pub fn list_running(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|err| SentinelError::Observation {
                details: format!("could not run {}: {err}", self.program.to_string_lossy()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SentinelError::Observation {
                details: format!(
                    "{} exited with {}: {}",
                    self.program.to_string_lossy(),
                    output.status,
                    stderr.trim()
                ),
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|err| SentinelError::Observation {
            details: format!("unit listing is not valid UTF-8: {err}"),
        })?;
        Ok(parse_unit_lines(&stdout))
    }
}

impl ObservationSource for SystemctlSource {
    fn running_services(&mut self) -> Result<Observation> {
        Ok(self.list_running()?.into_iter().collect())
    }
}

/// First column of each non-blank line, skipping the status glyph systemctl
/// prints in front of failed or changed units. Duplicates keep their first
/// position.
#[must_use]
pub fn parse_unit_lines(stdout: &str) -> Vec<String> {
    let mut units: Vec<String> = Vec::new();
    for line in stdout.lines() {
        let Some(unit) = line
            .split_whitespace()
            .find(|token| !matches!(*token, "●" | "*" | "○" | "×"))
        else {
            continue;
        };
        if !units.iter().any(|seen| seen == unit) {
            units.push(unit.to_string());
        }
    }
    units
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
cron.service                loaded active running Regular background program processing daemon
dbus.service                loaded active running D-Bus System Message Bus
\u{25cf} nginx.service        loaded active running A high performance web server

ssh.service                 loaded active running OpenBSD Secure Shell server
";

    #[test]
    fn parses_first_column_and_skips_glyphs() {
        assert_eq!(
            parse_unit_lines(LISTING),
            vec!["cron.service", "dbus.service", "nginx.service", "ssh.service"]
        );
    }

    #[test]
    fn empty_listing_is_an_empty_set() {
        assert!(parse_unit_lines("").is_empty());
        assert!(parse_unit_lines("\n  \n").is_empty());
    }

    #[test]
    fn duplicate_lines_collapse() {
        assert_eq!(
            parse_unit_lines("a.service x\na.service y\n"),
            vec!["a.service"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn command_output_becomes_observation() {
        let mut source = SystemctlSource::with_command(
            "sh",
            ["-c", "printf 'a.service loaded active running A\\nb.service loaded active running B\\n'"],
        );
        let observed = source.running_services().unwrap();
        assert_eq!(observed.len(), 2);
        assert!(observed.contains("a.service"));
        assert!(observed.contains("b.service"));
    }

    #[cfg(unix)]
    #[test]
    fn silent_success_means_nothing_running() {
        let mut source = SystemctlSource::with_command("true", Vec::<String>::new());
        assert!(source.running_services().unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_an_observation_error() {
        let mut source = SystemctlSource::with_command("sh", ["-c", "echo boom >&2; exit 3"]);
        let err = source.running_services().unwrap_err();
        assert_eq!(err.code(), "SEN-2001");
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn missing_binary_is_an_observation_error() {
        let mut source =
            SystemctlSource::with_command("/nonexistent/sentinel-systemctl", Vec::<String>::new());
        let err = source.running_services().unwrap_err();
        assert_eq!(err.code(), "SEN-2001");
        assert!(err.is_retryable());
    }
}
