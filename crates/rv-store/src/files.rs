use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rv_core::{GenerationState, Parameters, SnapshotStore, Step, decode_snapshot, encode_snapshot};

use crate::error::{Result, StoreError};
use crate::summary::SnapshotSummary;

const SNAPSHOT_FILE: &str = "coordinates.json";
const LEDGER_FILE: &str = "coordinates.txt";
const LEDGER_HEADER: &str = "n, binary, revolving, gaussian, color";

/// Snapshot store laid out as a directory tree:
///
/// ```text
/// <root>/
/// └── <direction>/
///     └── angle=piDividedBy<d>/
///         └── alpha=<re>+<im>i/
///             ├── coordinates.json   (snapshot, replaced on every save)
///             └── coordinates.txt    (optional per-branch ledger)
/// ```
pub struct DirectoryStore {
    root: PathBuf,
    ledger: bool,
}

impl DirectoryStore {
    pub fn open(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| {
            StoreError::InvalidData(format!("failed to create {}: {e}", root.display()))
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            ledger: false,
        })
    }

    /// Also append every generated branch to `coordinates.txt`.
    pub fn with_ledger(mut self, enabled: bool) -> Self {
        self.ledger = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stream_dir(&self, stream: &Parameters) -> PathBuf {
        stream
            .key_segments()
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    pub fn snapshot_path(&self, stream: &Parameters) -> PathBuf {
        self.stream_dir(stream).join(SNAPSHOT_FILE)
    }

    pub fn ledger_path(&self, stream: &Parameters) -> PathBuf {
        self.stream_dir(stream).join(LEDGER_FILE)
    }

    /// Replace the snapshot file. Written to a sibling temporary file and
    /// renamed over the old one, so readers only ever see a whole snapshot.
    pub fn save_snapshot(&self, stream: &Parameters, state: &GenerationState) -> Result<()> {
        let dir = self.stream_dir(stream);
        fs::create_dir_all(&dir)?;

        let json = encode_snapshot(state)?;
        let tmp = dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(json.as_bytes())?;
            f.sync_all()?;
        }
        fs::rename(&tmp, dir.join(SNAPSHOT_FILE))?;
        Ok(())
    }

    /// Strict load: `Ok(None)` when there is no snapshot file.
    pub fn load_snapshot(&self, stream: &Parameters) -> Result<Option<GenerationState>> {
        let json = match fs::read_to_string(self.snapshot_path(stream)) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(decode_snapshot(&json, stream)?))
    }

    /// Append one line per branch of `step` to the stream's ledger.
    pub fn append_ledger(&self, stream: &Parameters, step: &Step) -> Result<()> {
        let dir = self.stream_dir(stream);
        fs::create_dir_all(&dir)?;
        let path = dir.join(LEDGER_FILE);
        let fresh = !path.exists();

        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut out = String::new();
        if fresh {
            out.push_str(LEDGER_HEADER);
            out.push('\n');
        }
        for branch in &step.branches {
            let terms: Vec<String> = branch.terms.iter().map(|t| t.to_string()).collect();
            out.push_str(&format!(
                "{}, {}, [{}], {}, {}\n",
                step.n,
                step.digits,
                terms.join(", "),
                branch.value,
                branch.color_name()
            ));
        }
        f.write_all(out.as_bytes())?;
        Ok(())
    }

    /// Every valid snapshot under the root, ordered by storage key.
    pub fn list(&self) -> Result<Vec<SnapshotSummary>> {
        let mut summaries = Vec::new();
        for direction in read_subdirs(&self.root)? {
            for angle in read_subdirs(&direction)? {
                for alpha in read_subdirs(&angle)? {
                    let snapshot = alpha.join(SNAPSHOT_FILE);
                    if !snapshot.is_file() {
                        continue;
                    }
                    let Ok(relative) = alpha.strip_prefix(&self.root) else {
                        continue;
                    };
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    match Parameters::from_storage_key(&key) {
                        Ok(stream) => match self.load_snapshot(&stream) {
                            Ok(Some(state)) => {
                                summaries.push(SnapshotSummary::new(stream, &state))
                            }
                            Ok(None) => {}
                            Err(e) => tracing::warn!("skipping snapshot {key}: {e}"),
                        },
                        Err(e) => tracing::warn!("skipping {}: {e}", alpha.display()),
                    }
                }
            }
        }
        summaries.sort_by_key(|s| s.params.storage_key());
        Ok(summaries)
    }

    pub fn delete_snapshot(&self, stream: &Parameters) -> Result<bool> {
        match fs::remove_file(self.snapshot_path(stream)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

fn read_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

impl SnapshotStore for DirectoryStore {
    type Error = StoreError;

    fn load(&self, stream: &Parameters) -> GenerationState {
        match self.load_snapshot(stream) {
            Ok(Some(state)) => state,
            Ok(None) => {
                tracing::debug!("no data file at {}", self.snapshot_path(stream).display());
                GenerationState::new()
            }
            Err(e) => {
                tracing::warn!(
                    "unreadable snapshot {}, starting over: {e}",
                    self.snapshot_path(stream).display()
                );
                GenerationState::new()
            }
        }
    }

    fn save(&self, stream: &Parameters, state: &GenerationState) -> Result<()> {
        self.save_snapshot(stream, state)
    }

    fn record_step(&self, stream: &Parameters, step: &Step) -> Result<()> {
        if self.ledger {
            self.append_ledger(stream, step)?;
        }
        Ok(())
    }
}
