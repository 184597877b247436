use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use rv_core::{GenerationState, Parameters, SnapshotStore, decode_snapshot, encode_snapshot};

use crate::error::{Result, StoreError};
use crate::schema;
use crate::summary::SnapshotSummary;

/// SQLite-backed snapshot store: one row per parameter stream, keyed by
/// the stream's storage key, holding the JSON snapshot as its payload.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    // --- Snapshots ---

    /// Upsert the full snapshot for a stream.
    pub fn save_snapshot(&self, stream: &Parameters, state: &GenerationState) -> Result<()> {
        let payload = encode_snapshot(state)?;
        let n = i64::try_from(state.n())
            .map_err(|_| StoreError::InvalidData(format!("n={} exceeds i64", state.n())))?;

        self.conn.execute(
            "INSERT INTO snapshots
                (key, direction, angle_denominator, alpha_re, alpha_im, n, window_boundary, payload, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET
                n = excluded.n,
                window_boundary = excluded.window_boundary,
                payload = excluded.payload,
                updated_at = excluded.updated_at",
            params![
                stream.storage_key(),
                stream.direction().as_str(),
                stream.angle_denominator(),
                stream.base().re,
                stream.base().im,
                n,
                state.window_boundary(),
                payload,
            ],
        )?;
        Ok(())
    }

    /// Strict load: `Ok(None)` when absent, an error when the payload does
    /// not decode to a valid state for `stream`.
    pub fn load_snapshot(&self, stream: &Parameters) -> Result<Option<GenerationState>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots WHERE key = ?1",
                [stream.storage_key()],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(decode_snapshot(&json, stream)?)),
            None => Ok(None),
        }
    }

    pub fn delete_snapshot(&self, stream: &Parameters) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM snapshots WHERE key = ?1",
            [stream.storage_key()],
        )?;
        Ok(rows > 0)
    }

    /// Every valid stored stream, ordered by key. Rows that fail to decode
    /// are logged and left out.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, payload FROM snapshots ORDER BY key")?;
        let rows: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (key, payload) in rows {
            let decoded = Parameters::from_storage_key(&key)
                .and_then(|p| decode_snapshot(&payload, &p).map(|s| (p, s)));
            match decoded {
                Ok((stream, state)) => summaries.push(SnapshotSummary::new(stream, &state)),
                Err(e) => tracing::warn!("skipping snapshot {key}: {e}"),
            }
        }
        Ok(summaries)
    }
}

impl SnapshotStore for Store {
    type Error = StoreError;

    fn load(&self, stream: &Parameters) -> GenerationState {
        match self.load_snapshot(stream) {
            Ok(Some(state)) => state,
            Ok(None) => {
                tracing::debug!("no snapshot for {}", stream.storage_key());
                GenerationState::new()
            }
            Err(e) => {
                tracing::warn!("unreadable snapshot {}, starting over: {e}", stream.storage_key());
                GenerationState::new()
            }
        }
    }

    fn save(&self, stream: &Parameters, state: &GenerationState) -> Result<()> {
        self.save_snapshot(stream, state)
    }
}
