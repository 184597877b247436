//! Revolving-number generation engine.
//!
//! Each integer `n` is written in binary, its `1` digits are replaced by
//! rotations on the unit circle (one branch per starting rotation), and the
//! result is read as a positional number in a complex base. Streams of
//! these point sets grow one integer at a time and can be resumed from a
//! persisted snapshot.
//!
//! Zero I/O: persistence goes through the [`SnapshotStore`] trait.

pub mod branch;
pub mod cancel;
pub mod constants;
pub mod delta;
pub mod digits;
pub mod error;
pub mod generator;
pub mod params;
pub mod snapshot;
pub mod state;
pub mod store;
pub mod sweep;

pub use branch::{Branch, clamp_base, evaluate};
pub use cancel::{AtomicBoolChecker, CancellationChecker, NeverCancel};
pub use constants::{COLOR_PALETTE, DELTA_PRECISION, MIN_BASE, PALETTE_SIZE};
pub use delta::DeltaSet;
pub use digits::{DigitSequence, is_boundary, places, subsequent_places};
pub use error::{CoreError, Result};
pub use generator::{GenerationRequest, Generator, PersistPolicy, Stream, StreamStats, fulfil};
pub use params::{Direction, Parameters};
pub use snapshot::{Snapshot, decode_snapshot, encode_snapshot};
pub use state::{Coordinate, GenerationState, Step};
pub use store::{MemoryStore, SnapshotStore};
pub use sweep::{BaseGrid, ParameterSweep, SweepConfig, SweepReport};
