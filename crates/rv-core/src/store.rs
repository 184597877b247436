use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;

use crate::params::Parameters;
use crate::snapshot::{decode_snapshot, encode_snapshot};
use crate::state::{GenerationState, Step};

/// Durable home for one snapshot per parameter stream.
///
/// `load` never fails: a missing snapshot is an empty state, and a snapshot
/// that cannot be decoded is logged and also treated as empty. `save` fully
/// overwrites whatever the key held before.
pub trait SnapshotStore {
    type Error: std::error::Error;

    fn load(&self, params: &Parameters) -> GenerationState;

    fn save(&self, params: &Parameters, state: &GenerationState) -> Result<(), Self::Error>;

    /// Optional per-step audit trail. Stores without one ignore it.
    fn record_step(&self, _params: &Parameters, _step: &Step) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Store that keeps encoded snapshots in memory, keyed like the disk stores.
///
/// Everything goes through the JSON wire format, so a state loaded from here
/// is exactly what a persistent store would hand back.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.borrow().is_empty()
    }

    pub fn contains(&self, params: &Parameters) -> bool {
        self.snapshots.borrow().contains_key(&params.storage_key())
    }

    /// Raw encoded snapshot for a stream, if one was saved.
    pub fn raw(&self, params: &Parameters) -> Option<String> {
        self.snapshots.borrow().get(&params.storage_key()).cloned()
    }

    /// Overwrite a stream's snapshot with arbitrary text.
    pub fn put_raw(&self, params: &Parameters, json: &str) {
        self.snapshots
            .borrow_mut()
            .insert(params.storage_key(), json.to_string());
    }
}

impl SnapshotStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, params: &Parameters) -> GenerationState {
        let Some(json) = self.raw(params) else {
            return GenerationState::new();
        };
        decode_snapshot(&json, params).unwrap_or_else(|e| {
            tracing::warn!("discarding snapshot {}: {e}", params.storage_key());
            GenerationState::new()
        })
    }

    fn save(&self, params: &Parameters, state: &GenerationState) -> Result<(), Infallible> {
        match encode_snapshot(state) {
            Ok(json) => self.put_raw(params, &json),
            Err(e) => tracing::error!("failed to encode snapshot {}: {e}", params.storage_key()),
        }
        Ok(())
    }
}
