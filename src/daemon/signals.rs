//! OS signal handling: SIGINT/SIGTERM/SIGQUIT become stop requests.

use std::thread::{self, JoinHandle};

use crossbeam_channel::Sender;
use signal_hook::consts::{SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

use super::loop_main::StopRequest;
use crate::core::errors::{Result, SentinelError};

/// Signals that ask the daemon to finish its current tick and exit.
pub const SHUTDOWN_SIGNALS: [i32; 3] = [SIGINT, SIGTERM, SIGQUIT];

/// Register shutdown signals and forward each delivery to `tx` from a
/// dedicated thread. The thread exits once the receiver is dropped and
/// another signal arrives.
pub fn spawn_forwarder(tx: Sender<StopRequest>) -> Result<JoinHandle<()>> {
    let mut signals = Signals::new(SHUTDOWN_SIGNALS).map_err(|err| SentinelError::Runtime {
        details: format!("failed to register signal handlers: {err}"),
    })?;

    thread::Builder::new()
        .name("sentinel-signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                if tx.send(StopRequest::Signal(signal)).is_err() {
                    break;
                }
            }
        })
        .map_err(|err| SentinelError::Runtime {
            details: format!("failed to spawn signal thread: {err}"),
        })
}
