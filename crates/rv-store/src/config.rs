use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::{Deserialize, Serialize};

use rv_core::SweepConfig;

use crate::error::{Result, StoreError};

/// Name of the optional config file inside the data directory.
pub const CONFIG_FILE: &str = "rv.toml";

/// Default base directory for all rv storage.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".revolving-numbers")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// One SQLite database holding every snapshot.
    #[default]
    Sqlite,
    /// One JSON file per stream in a directory tree.
    Files,
}

/// Contents of `rv.toml`. Every field is optional.
///
/// ```toml
/// backend = "files"
/// ledger = true
///
/// [sweep]
/// denominator_min = -3
/// denominator_max = 3
/// save_every = 8
///
/// [sweep.grid]
/// step = 0.25
/// decimals = 2
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendKind,
    /// Keep a per-branch text ledger (directory backend only).
    pub ledger: bool,
    pub sweep: SweepConfig,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| StoreError::InvalidData(format!("invalid config: {e}")))
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml(&content)?;
                tracing::debug!("loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(StoreError::InvalidData(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// `<data_dir>/rv.toml`, or defaults when absent.
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        Self::load(&data_dir.join(CONFIG_FILE))
    }
}
