//! Durable snapshot file: validated load, atomic save.

#![allow(missing_docs)]

use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::json;

use super::snapshot::Snapshot;
use crate::core::errors::{Result, SentinelError};
use crate::logger::ActivityLog;

/// Result of reading the snapshot file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(Snapshot),
    NotFound,
    /// The file existed but was unreadable as a snapshot and has been removed.
    Discarded { details: String },
}

impl LoadOutcome {
    /// `Discarded` is handled exactly like `NotFound`.
    #[must_use]
    pub fn into_snapshot(self) -> Option<Snapshot> {
        match self {
            Self::Loaded(snapshot) => Some(snapshot),
            Self::NotFound | Self::Discarded { .. } => None,
        }
    }
}

/// Owned handle to the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
    log: Arc<ActivityLog>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, log: Arc<ActivityLog>) -> Self {
        Self {
            path: path.into(),
            log,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the snapshot.
    ///
    /// A record that does not parse or validate is deleted (and the deletion
    /// logged) so the caller can re-run setup. Read errors other than
    /// not-found are returned without touching the file.
    pub fn load(&self) -> Result<LoadOutcome> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LoadOutcome::NotFound);
            }
            Err(err) => return Err(SentinelError::io(&self.path, err)),
        };

        let parsed = serde_json::from_slice::<Snapshot>(&bytes)
            .map_err(|err| err.to_string())
            .and_then(|mut snapshot| {
                snapshot
                    .validate_and_prune()
                    .map(|pruned| (snapshot, pruned))
            });

        match parsed {
            Ok((snapshot, pruned)) => {
                for service in pruned {
                    self.log.warn(
                        "snapshot_status_pruned",
                        json!({ "service": service, "path": self.path }),
                    );
                }
                let untracked = snapshot.untracked();
                if !untracked.is_empty() {
                    self.log.warn(
                        "snapshot_status_missing",
                        json!({ "services": untracked, "path": self.path }),
                    );
                }
                Ok(LoadOutcome::Loaded(snapshot))
            }
            Err(details) => {
                self.discard(&details);
                Ok(LoadOutcome::Discarded { details })
            }
        }
    }

    /// Like [`load`](Self::load) but turns a missing or discarded snapshot
    /// into [`SentinelError::MissingSnapshot`].
    pub fn load_required(&self) -> Result<Snapshot> {
        self.load()?
            .into_snapshot()
            .ok_or_else(|| SentinelError::MissingSnapshot {
                path: self.path.clone(),
            })
    }

    /// Atomically replace the snapshot file: write a sibling temp file,
    /// fsync it, rename it over the target.
    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let mut body = serde_json::to_vec_pretty(snapshot)?;
        body.push(b'\n');

        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|err| SentinelError::io(parent, err))?;

        let tmp_path = self.temp_path();
        let write_result = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(&body)?;
            file.sync_all()
        });
        if let Err(err) = write_result {
            let _ = fs::remove_file(&tmp_path);
            return Err(SentinelError::io(&tmp_path, err));
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(SentinelError::io(&self.path, err));
        }

        // Persist the rename itself; not every platform lets a directory be fsynced.
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map_or_else(|| "snapshot".into(), |n| n.to_string_lossy().into_owned());
        self.path.with_file_name(format!(".{name}.tmp"))
    }

    fn discard(&self, details: &str) {
        let corrupt = SentinelError::CorruptSnapshot {
            path: self.path.clone(),
            details: details.to_string(),
        };
        match fs::remove_file(&self.path) {
            Ok(()) => self.log.warn(
                "snapshot_discarded",
                json!({ "code": corrupt.code(), "path": self.path, "reason": corrupt.to_string() }),
            ),
            Err(err) => self.log.error(
                "snapshot_discard_failed",
                json!({
                    "code": corrupt.code(),
                    "path": self.path,
                    "reason": corrupt.to_string(),
                    "error": err.to_string(),
                }),
            ),
        }
    }
}
