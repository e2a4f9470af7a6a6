//! Top-level CLI definition and dispatch.

use std::io::{self, Write as _};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use serde_json::json;

use crate::cli::setup::{
    SetupOptions, format_setup_report, normalize_services, prompt_selection, run_setup_sequence,
};
use crate::core::config::Config;
use crate::core::errors::{Result, SentinelError};
use crate::daemon::{LoopSettings, PollLoop, signals};
use crate::logger::ActivityLog;
use crate::monitor::SystemctlSource;
use crate::notify::{DryRunNotifier, Notifier, VoipMsNotifier};
use crate::state::{LoadOutcome, ServiceStatus, Snapshot, SnapshotStore};

/// Service Sentinel: SMS alerts when system services stop or recover.
#[derive(Parser)]
#[command(name = "sentinel", version, about)]
pub struct Cli {
    /// Configuration file (defaults to $SENTINEL_CONFIG or /etc/sentinel/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Runs the monitor when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Choose services to monitor, write the initial snapshot, send a test message.
    Setup {
        /// Comma-separated services to monitor instead of the interactive menu.
        #[arg(long, value_delimiter = ',')]
        services: Option<Vec<String>>,
        /// Skip the test message.
        #[arg(long)]
        no_test_message: bool,
        /// Log the test message instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Send one ad-hoc message without touching the snapshot.
    Test {
        /// Message body.
        message: Option<String>,
        /// Log the message instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the monitor in the foreground (used by systemd).
    Run {
        /// Log notifications instead of sending them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the stored snapshot.
    Status {
        /// Print the snapshot as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Dispatch CLI commands.
///
/// # Errors
/// Returns an error if the subcommand fails. Snapshot problems come back as
/// errors for which [`SentinelError::needs_setup`] is true.
pub fn run(cli: &Cli) -> Result<()> {
    if let Some(Command::Completions { shell }) = &cli.command {
        let mut command = Cli::command();
        clap_complete::generate(*shell, &mut command, "sentinel", &mut io::stdout());
        return Ok(());
    }

    let config = Config::load(&Config::resolve_path(cli.config.as_deref()))?;
    let log = Arc::new(ActivityLog::open(&config.paths.activity_log));
    let store = SnapshotStore::new(config.paths.state_file.clone(), Arc::clone(&log));

    match &cli.command {
        Some(Command::Setup {
            services,
            no_test_message,
            dry_run,
        }) => cmd_setup(
            &config,
            &store,
            &log,
            services.as_deref(),
            !no_test_message,
            *dry_run,
        ),
        Some(Command::Test { message, dry_run }) => {
            cmd_test(&config, &log, message.as_deref(), *dry_run)
        }
        Some(Command::Run { dry_run }) => cmd_run(&config, &store, &log, *dry_run),
        None => cmd_run(&config, &store, &log, false),
        Some(Command::Status { json }) => cmd_status(&store, *json),
        Some(Command::Completions { .. }) => Ok(()),
    }
}

fn build_notifier(config: &Config, log: &Arc<ActivityLog>, dry_run: bool) -> Result<Box<dyn Notifier>> {
    if dry_run {
        return Ok(Box::new(DryRunNotifier::new(
            Arc::clone(log),
            config.notifier.max_message_chars,
        )));
    }
    config.validate_for_sending()?;
    Ok(Box::new(VoipMsNotifier::from_config(&config.notifier)?))
}

fn cmd_setup(
    config: &Config,
    store: &SnapshotStore,
    log: &Arc<ActivityLog>,
    services: Option<&[String]>,
    send_test: bool,
    dry_run: bool,
) -> Result<()> {
    let mut notifier = if send_test {
        Some(build_notifier(config, log, dry_run)?)
    } else {
        None
    };

    let chosen = if let Some(explicit) = services {
        normalize_services(explicit)
    } else {
        let available = SystemctlSource::default().list_running()?;
        if available.is_empty() {
            return Err(SentinelError::Observation {
                details: "no running services to choose from".to_string(),
            });
        }
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        prompt_selection(&available, &mut stdin.lock(), &mut stdout)
            .map_err(|err| SentinelError::io("<stdin>", err))?
            .chosen
    };
    if chosen.is_empty() {
        return Err(SentinelError::EmptySelection);
    }

    let options = SetupOptions {
        services: chosen,
        today: Local::now().date_naive(),
        destination: config.notifier.destination.clone(),
    };
    let report = run_setup_sequence(&options, store, notifier.as_deref_mut());
    print!("{}", format_setup_report(&report));
    log.info(
        "setup_completed",
        json!({ "success": report.success, "services": report.services }),
    );

    if report.success {
        Ok(())
    } else {
        Err(SentinelError::Runtime {
            details: "setup did not complete; no snapshot was written".to_string(),
        })
    }
}

fn cmd_test(
    config: &Config,
    log: &Arc<ActivityLog>,
    message: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let mut notifier = build_notifier(config, log, dry_run)?;
    let message = message.unwrap_or("[TEST] Service sentinel test message.");
    let outcome = notifier.send(&config.notifier.destination, message);
    log.info("test_message", json!(outcome));

    if outcome.truncated {
        println!(
            "{} message truncated to {} characters",
            "note:".yellow(),
            config.notifier.max_message_chars
        );
    }
    if outcome.delivered {
        println!("{} test message sent", "ok:".green().bold());
        Ok(())
    } else {
        Err(SentinelError::Delivery {
            details: outcome
                .error_detail
                .unwrap_or_else(|| "unknown delivery failure".to_string()),
        })
    }
}

fn cmd_run(
    config: &Config,
    store: &SnapshotStore,
    log: &Arc<ActivityLog>,
    dry_run: bool,
) -> Result<()> {
    let snapshot = store.load_required()?;
    let notifier = build_notifier(config, log, dry_run)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let _signal_thread = signals::spawn_forwarder(tx)?;

    let poll = PollLoop::new(
        SystemctlSource::default(),
        notifier,
        store.clone(),
        snapshot,
        LoopSettings {
            interval: config.poll.interval(),
            destination: config.notifier.destination.clone(),
        },
        Arc::clone(log),
    );
    let health = poll.run(&rx);

    if health.degraded {
        eprintln!(
            "{} last snapshot write failed ({}); transitions may be re-notified on restart",
            "warning:".yellow().bold(),
            health.last_error.as_deref().unwrap_or("unknown error")
        );
    }
    if health.log_degraded {
        eprintln!(
            "{} activity log {} was unwritable; entries went to stderr",
            "warning:".yellow().bold(),
            config.paths.activity_log.display()
        );
    }
    Ok(())
}

fn cmd_status(store: &SnapshotStore, as_json: bool) -> Result<()> {
    let snapshot = match store.load()? {
        LoadOutcome::Loaded(snapshot) => snapshot,
        LoadOutcome::NotFound | LoadOutcome::Discarded { .. } => {
            return Err(SentinelError::MissingSnapshot {
                path: store.path().to_path_buf(),
            });
        }
    };

    let mut stdout = io::stdout().lock();
    if as_json {
        let body = serde_json::to_string_pretty(&snapshot)?;
        writeln!(stdout, "{body}").map_err(|err| SentinelError::io("<stdout>", err))?;
    } else {
        write!(stdout, "{}", format_status(&snapshot))
            .map_err(|err| SentinelError::io("<stdout>", err))?;
    }
    Ok(())
}

/// Human-readable status table.
#[must_use]
pub fn format_status(snapshot: &Snapshot) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    let width = snapshot
        .services
        .iter()
        .map(String::len)
        .max()
        .unwrap_or(0);
    for service in &snapshot.services {
        let status = snapshot.status_of(service);
        let label = match status {
            ServiceStatus::Running => status.to_string().green(),
            ServiceStatus::Stopped => status.to_string().red().bold(),
            ServiceStatus::Unknown => status.to_string().yellow(),
        };
        let _ = writeln!(out, "  {service:<width$}  {label}");
    }
    let heartbeat = snapshot
        .last_heartbeat
        .map_or_else(|| "never".to_string(), |date| date.to_string());
    let _ = writeln!(out, "\n  Last heartbeat: {heartbeat}");
    out
}
