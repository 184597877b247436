use std::fs;
use std::path::Path;

use rv_core::{GenerationState, Parameters, SnapshotStore, Step};

use crate::config::{BackendKind, Config};
use crate::error::{Result, StoreError};
use crate::files::DirectoryStore;
use crate::store::Store;
use crate::summary::SnapshotSummary;

/// Snapshot store selected by configuration.
///
/// Layout under the data directory:
/// ```text
/// <data_dir>/
/// ├── rv.toml          (optional)
/// ├── snapshots.db     (sqlite backend)
/// └── snapshots/       (files backend)
/// ```
pub enum Backend {
    Sqlite(Store),
    Files(DirectoryStore),
}

impl Backend {
    pub fn open(data_dir: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(data_dir).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", data_dir.display()))
        })?;
        match config.backend {
            BackendKind::Sqlite => {
                if config.ledger {
                    tracing::warn!("ledger is only kept by the files backend; ignoring");
                }
                Ok(Backend::Sqlite(Store::open(&data_dir.join("snapshots.db"))?))
            }
            BackendKind::Files => Ok(Backend::Files(
                DirectoryStore::open(&data_dir.join("snapshots"))?.with_ledger(config.ledger),
            )),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Sqlite(_) => BackendKind::Sqlite,
            Backend::Files(_) => BackendKind::Files,
        }
    }

    pub fn load_snapshot(&self, stream: &Parameters) -> Result<Option<GenerationState>> {
        match self {
            Backend::Sqlite(s) => s.load_snapshot(stream),
            Backend::Files(s) => s.load_snapshot(stream),
        }
    }

    pub fn delete_snapshot(&self, stream: &Parameters) -> Result<bool> {
        match self {
            Backend::Sqlite(s) => s.delete_snapshot(stream),
            Backend::Files(s) => s.delete_snapshot(stream),
        }
    }

    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        match self {
            Backend::Sqlite(s) => s.list(),
            Backend::Files(s) => s.list(),
        }
    }
}

impl SnapshotStore for Backend {
    type Error = StoreError;

    fn load(&self, stream: &Parameters) -> GenerationState {
        match self {
            Backend::Sqlite(s) => s.load(stream),
            Backend::Files(s) => s.load(stream),
        }
    }

    fn save(&self, stream: &Parameters, state: &GenerationState) -> Result<()> {
        match self {
            Backend::Sqlite(s) => s.save(stream, state),
            Backend::Files(s) => s.save(stream, state),
        }
    }

    fn record_step(&self, stream: &Parameters, step: &Step) -> Result<()> {
        match self {
            Backend::Sqlite(s) => s.record_step(stream, step),
            Backend::Files(s) => s.record_step(stream, step),
        }
    }
}
