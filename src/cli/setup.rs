//! Setup orchestration for `sentinel setup`.
//!
//! The only interactive phase: choose services, seed the snapshot, and send
//! one test message. The poll loop never prompts; it only consumes what this
//! phase produced.

use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;

use crate::core::errors::SentinelError;
use crate::notify::{Notifier, SendOutcome};
use crate::state::{Snapshot, SnapshotStore};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A single step in the setup sequence.
#[derive(Debug, Clone, Serialize)]
pub struct SetupStep {
    /// Human-readable description.
    pub description: String,
    /// Whether this step completed successfully.
    pub done: bool,
    /// Error message if the step failed.
    pub error: Option<String>,
}

/// Structured report from a setup run.
#[derive(Debug, Clone, Serialize)]
pub struct SetupReport {
    /// Ordered list of steps attempted.
    pub steps: Vec<SetupStep>,
    /// The snapshot was written; monitoring can start.
    pub success: bool,
    /// Services now under monitoring.
    pub services: Vec<String>,
    /// Where the snapshot was written.
    pub state_file: Option<PathBuf>,
    /// Outcome of the test message, if one was sent.
    pub test_message: Option<SendOutcome>,
}

impl SetupReport {
    fn new() -> Self {
        Self {
            steps: Vec::new(),
            success: false,
            services: Vec::new(),
            state_file: None,
            test_message: None,
        }
    }

    fn step_ok(&mut self, description: impl Into<String>) {
        self.steps.push(SetupStep {
            description: description.into(),
            done: true,
            error: None,
        });
    }

    fn step_fail(&mut self, description: impl Into<String>, error: impl Into<String>) {
        self.steps.push(SetupStep {
            description: description.into(),
            done: false,
            error: Some(error.into()),
        });
    }
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// Parsed operator choice from the numbered menu.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Chosen services, in the order first picked, without duplicates.
    pub chosen: Vec<String>,
    /// Entries that were not a valid menu index.
    pub rejected: Vec<String>,
}

/// Parse comma-separated menu indices (e.g. `0,2,5`) against `available`.
#[must_use]
pub fn parse_selection(input: &str, available: &[String]) -> Selection {
    let mut selection = Selection::default();
    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token.parse::<usize>().ok().and_then(|i| available.get(i)) {
            Some(service) => {
                if !selection.chosen.contains(service) {
                    selection.chosen.push(service.clone());
                }
            }
            None => selection.rejected.push(token.to_string()),
        }
    }
    selection
}

/// Normalize an explicit `--services` list: trim, drop blanks, dedupe.
#[must_use]
pub fn normalize_services(services: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(services.len());
    for service in services.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if !out.iter().any(|seen| seen == service) {
            out.push(service.to_string());
        }
    }
    out
}

/// Show a numbered menu of `available` on `output` and read one line of
/// indices from `input`.
pub fn prompt_selection<R: BufRead, W: Write>(
    available: &[String],
    input: &mut R,
    output: &mut W,
) -> std::io::Result<Selection> {
    writeln!(output, "Select services to monitor:")?;
    for (idx, service) in available.iter().enumerate() {
        writeln!(output, "[{idx}] {service}")?;
    }
    write!(output, "Enter comma-separated numbers (e.g. 0,2,5): ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let selection = parse_selection(&line, available);
    if !selection.rejected.is_empty() {
        writeln!(
            output,
            "Ignoring invalid entries: {}",
            selection.rejected.join(", ")
        )?;
    }
    Ok(selection)
}

// ---------------------------------------------------------------------------
// Setup orchestration
// ---------------------------------------------------------------------------

/// Options for the non-interactive part of setup.
#[derive(Debug, Clone)]
pub struct SetupOptions {
    /// Services to monitor, already chosen.
    pub services: Vec<String>,
    /// Date recorded as the last heartbeat.
    pub today: NaiveDate,
    /// Where the test message goes.
    pub destination: String,
}

/// Seed the snapshot and, when a notifier is given, send one test message.
///
/// Steps:
/// 1. Validate the selection.
/// 2. Write the seeded snapshot.
/// 3. Send the test message.
pub fn run_setup_sequence<N: Notifier + ?Sized>(
    opts: &SetupOptions,
    store: &SnapshotStore,
    notifier: Option<&mut N>,
) -> SetupReport {
    let mut report = SetupReport::new();

    // Step 1: Validate the selection.
    if opts.services.is_empty() {
        report.step_fail(
            "Select services to monitor",
            SentinelError::EmptySelection.to_string(),
        );
        return report;
    }
    report.step_ok(format!(
        "Selected {} service(s): {}",
        opts.services.len(),
        opts.services.join(", ")
    ));

    // Step 2: Write the seeded snapshot.
    let snapshot = Snapshot::seeded(opts.services.clone(), opts.today);
    match store.save(&snapshot) {
        Ok(()) => {
            report.step_ok(format!("Wrote snapshot: {}", store.path().display()));
            report.state_file = Some(store.path().to_path_buf());
            report.services.clone_from(&snapshot.services);
            report.success = true;
        }
        Err(err) => {
            report.step_fail(
                format!("Write snapshot: {}", store.path().display()),
                err.to_string(),
            );
            return report;
        }
    }

    // Step 3: Send the test message.
    if let Some(notifier) = notifier {
        let message = format!(
            "[SETUP] Service monitoring configured for {} service(s).",
            opts.services.len()
        );
        let outcome = notifier.send(&opts.destination, &message);
        if outcome.delivered {
            report.step_ok(format!("Sent test message to {}", opts.destination));
        } else {
            report.step_fail(
                format!("Send test message to {}", opts.destination),
                outcome
                    .error_detail
                    .clone()
                    .unwrap_or_else(|| "unknown delivery failure".to_string()),
            );
        }
        report.test_message = Some(outcome);
    }

    report
}

// ---------------------------------------------------------------------------
// Human formatting
// ---------------------------------------------------------------------------

/// Format a setup report for terminal output.
#[must_use]
pub fn format_setup_report(report: &SetupReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "sentinel setup report:\n");

    for step in &report.steps {
        let icon = if step.error.is_some() {
            "FAIL"
        } else if step.done {
            "DONE"
        } else {
            "PLAN"
        };
        let _ = writeln!(out, "  [{icon}] {}", step.description);
        if let Some(err) = &step.error {
            let _ = writeln!(out, "         error: {err}");
        }
    }

    if report.success {
        out.push('\n');
        if let Some(ref state) = report.state_file {
            let _ = writeln!(out, "  Snapshot: {}", state.display());
        }
        let _ = writeln!(out, "  Services: {}", report.services.len());
        let _ = writeln!(out, "\nRun `sentinel run` to begin monitoring.");
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
