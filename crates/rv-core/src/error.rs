use std::fmt;

/// Failures raised by the generation engine itself.
///
/// Numerical degeneracy never shows up here: a near-zero base is clamped,
/// not reported.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Angle denominator of zero; no rotation set exists for it.
    ZeroDenominator,
    /// Base constant with an infinite or NaN part.
    InvalidBase(String),
    /// Direction string that is neither "contracting" nor "expanding".
    UnknownDirection(String),
    /// A persisted snapshot that does not describe a valid state.
    InvalidSnapshot(String),
    /// Storage key that does not name a parameter stream.
    InvalidKey(String),
    /// Sweep settings that describe an empty or malformed parameter space.
    InvalidConfig(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ZeroDenominator => write!(f, "angle denominator must be nonzero"),
            CoreError::InvalidBase(base) => {
                write!(f, "base constant must be finite, got {base}")
            }
            CoreError::UnknownDirection(s) => {
                write!(f, "unknown direction '{s}' (expected contracting or expanding)")
            }
            CoreError::InvalidSnapshot(msg) => write!(f, "invalid snapshot: {msg}"),
            CoreError::InvalidKey(key) => write!(f, "invalid storage key '{key}'"),
            CoreError::InvalidConfig(msg) => write!(f, "invalid sweep config: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type Result<T> = std::result::Result<T, CoreError>;
