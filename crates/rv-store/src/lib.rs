//! Persistence for revolving-number generation state.
//!
//! Two stores implement [`rv_core::SnapshotStore`]: a SQLite database
//! ([`Store`]) and a directory tree of JSON files ([`DirectoryStore`]).
//! [`Backend`] picks one according to [`Config`].

pub mod backend;
pub mod config;
pub mod error;
pub mod files;
pub mod schema;
pub mod store;
pub mod summary;

pub use backend::Backend;
pub use config::{BackendKind, CONFIG_FILE, Config, default_base_dir};
pub use error::{Result, StoreError};
pub use files::DirectoryStore;
pub use store::Store;
pub use summary::SnapshotSummary;
