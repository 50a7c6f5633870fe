//! File-backed state store using JSON lines.
//!
//! Every committed batch is appended as a single line, so a batch is either
//! fully replayed on open or not at all. A torn final line left by a crash is
//! skipped with a warning and cut off before new batches are appended; a
//! malformed line anywhere else is an error.

use std::fs::{create_dir_all, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::{LedgerUpdate, StateStore, StoreSnapshot};
use crate::core::{
    ContainerFactory, ContainerHandle, LedgerError, PersistedAttemptInfo, RecoveryStore,
    ResourceField,
};
use crate::util::{AttemptId, ContainerId, ResourceAmount};

const LOG_FILE: &str = "ledger.jsonl";

/// Durable state store replayed from an append-only log.
pub struct JsonlStateStore {
    path: PathBuf,
    snapshot: RwLock<StoreSnapshot>,
    writer: Mutex<File>,
    factory: Arc<dyn ContainerFactory>,
}

impl JsonlStateStore {
    /// Open (or create) the log under `dir` and replay it.
    pub fn open(dir: impl AsRef<Path>, factory: Arc<dyn ContainerFactory>) -> Result<Self, LedgerError> {
        let dir = dir.as_ref();
        create_dir_all(dir)?;
        let path = dir.join(LOG_FILE);
        let replayed = replay(&path)?;
        if replayed.valid_len < replayed.total_len {
            OpenOptions::new()
                .write(true)
                .open(&path)?
                .set_len(replayed.valid_len as u64)?;
            warn!(
                path = %path.display(),
                kept = replayed.valid_len,
                dropped = replayed.total_len - replayed.valid_len,
                "truncated torn tail"
            );
        }
        let mut writer = OpenOptions::new().create(true).append(true).open(&path)?;
        if !replayed.terminated {
            writeln!(writer)?;
            writer.flush()?;
        }
        Ok(Self {
            path,
            snapshot: RwLock::new(replayed.snapshot),
            writer: Mutex::new(writer),
            factory,
        })
    }

    /// Location of the log file.
    pub fn log_path(&self) -> &Path {
        &self.path
    }
}

struct Replayed {
    snapshot: StoreSnapshot,
    /// Bytes up to the end of the last good batch.
    valid_len: usize,
    total_len: usize,
    /// Whether the kept prefix ends on a line boundary.
    terminated: bool,
}

fn replay(path: &Path) -> Result<Replayed, LedgerError> {
    let mut replayed = Replayed {
        snapshot: StoreSnapshot::default(),
        valid_len: 0,
        total_len: 0,
        terminated: true,
    };
    if !path.exists() {
        return Ok(replayed);
    }
    let content = std::fs::read_to_string(path)?;
    replayed.total_len = content.len();
    let mut batches = 0usize;
    let mut lines = content.split_inclusive('\n').enumerate().peekable();
    while let Some((index, raw)) = lines.next() {
        let line = raw.trim();
        if !line.is_empty() {
            match serde_json::from_str::<Vec<LedgerUpdate>>(line) {
                Ok(updates) => {
                    for update in updates {
                        replayed.snapshot.apply(update);
                    }
                    batches += 1;
                }
                Err(err) if lines.peek().is_none() => {
                    warn!(path = %path.display(), error = %err, "skipping torn final batch");
                    break;
                }
                Err(err) => {
                    return Err(LedgerError::Persistence(format!(
                        "{}:{}: {err}",
                        path.display(),
                        index + 1
                    )));
                }
            }
        }
        replayed.valid_len += raw.len();
    }
    replayed.terminated = content[..replayed.valid_len].is_empty()
        || content[..replayed.valid_len].ends_with('\n');
    debug!(path = %path.display(), batches, "replayed ledger log");
    Ok(replayed)
}

impl StateStore for JsonlStateStore {
    fn apply(&self, updates: Vec<LedgerUpdate>) -> Result<(), LedgerError> {
        let line = serde_json::to_string(&updates)?;
        {
            let mut writer = self.writer.lock();
            writeln!(writer, "{line}")?;
            writer.flush()?;
        }
        let mut snapshot = self.snapshot.write();
        for update in updates {
            snapshot.apply(update);
        }
        Ok(())
    }

    fn attempt_info(&self, attempt: &AttemptId) -> Result<Option<PersistedAttemptInfo>, LedgerError> {
        Ok(self.snapshot.read().attempt_info(attempt))
    }

    fn attempts(&self) -> Result<Vec<PersistedAttemptInfo>, LedgerError> {
        Ok(self.snapshot.read().attempts())
    }
}

impl RecoveryStore for JsonlStateStore {
    fn resource(
        &self,
        attempt: &AttemptId,
        field: ResourceField,
    ) -> Result<Option<ResourceAmount>, LedgerError> {
        Ok(self.snapshot.read().resource(attempt, field))
    }

    fn staged_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError> {
        Ok(self.snapshot.read().staged_container_ids(attempt))
    }

    fn live_container_ids(&self, attempt: &AttemptId) -> Result<Vec<ContainerId>, LedgerError> {
        Ok(self.snapshot.read().live_container_ids(attempt))
    }

    fn resolve_container(&self, container_id: &ContainerId) -> Result<ContainerHandle, LedgerError> {
        self.snapshot
            .read()
            .resolve_container(container_id, self.factory.as_ref())
    }
}
