//! Shared helpers for CLI-level integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tempfile::TempDir;

/// Captured result of one CLI invocation.
pub struct CliResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    /// Transcript written for post-mortem debugging.
    pub log_path: PathBuf,
}

/// Isolated config + state directory for one test case.
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create sandbox dir");
        let config = format!(
            "[paths]\nstate_file = {:?}\nactivity_log = {:?}\n\n[poll]\ninterval_secs = 1\n\n[notifier]\ndestination = \"15551234567\"\n",
            dir.path().join("snapshot.json"),
            dir.path().join("activity.jsonl"),
        );
        std::fs::write(dir.path().join("config.toml"), config).expect("write sandbox config");
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.dir.path().join("snapshot.json")
    }

    pub fn activity_log(&self) -> PathBuf {
        self.dir.path().join("activity.jsonl")
    }

    /// Run `sentinel --config <sandbox config> <args>`.
    pub fn run(&self, case_name: &str, args: &[&str]) -> CliResult {
        let config = self.config_path();
        let mut full: Vec<&str> = vec!["--config", config.to_str().expect("utf-8 path")];
        full.extend_from_slice(args);
        run_in(case_name, &full, self.dir.path())
    }
}

/// Run the binary with `args` and no sandbox config.
pub fn run_cli_case(case_name: &str, args: &[&str]) -> CliResult {
    let scratch = std::env::temp_dir();
    run_in(case_name, args, &scratch)
}

fn run_in(case_name: &str, args: &[&str], log_dir: &Path) -> CliResult {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sentinel"));
    command.args(args).env("NO_COLOR", "1");
    for (key, _) in std::env::vars_os() {
        if key.to_string_lossy().starts_with("SENTINEL_") {
            command.env_remove(&key);
        }
    }
    let output = command.output().expect("spawn sentinel binary");
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    let log_path = log_dir.join(format!("sentinel-test-{case_name}.log"));
    let transcript = format!(
        "args: {args:?}\nstatus: {}\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}\n",
        output.status
    );
    let _ = std::fs::write(&log_path, transcript);

    CliResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}
