use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Order in which an integer's binary digits are read.
///
/// Contracting reads least-significant-first against negative powers of the
/// base; Expanding reads most-significant-first against positive powers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Contracting,
    Expanding,
}

impl Direction {
    /// Sweep order: expanding streams are visited before contracting ones.
    pub const ALL: [Direction; 2] = [Direction::Expanding, Direction::Contracting];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Contracting => "contracting",
            Direction::Expanding => "expanding",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "contracting" => Ok(Direction::Contracting),
            "expanding" => Ok(Direction::Expanding),
            _ => Err(CoreError::UnknownDirection(s.to_string())),
        }
    }
}

/// Identity of one generation stream. Immutable once built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parameters {
    angle_denominator: i32,
    base: Complex64,
    direction: Direction,
}

impl Parameters {
    pub fn new(angle_denominator: i32, base: Complex64, direction: Direction) -> Result<Self> {
        if angle_denominator == 0 {
            return Err(CoreError::ZeroDenominator);
        }
        if !(base.re.is_finite() && base.im.is_finite()) {
            return Err(CoreError::InvalidBase(format!("{}+{}i", base.re, base.im)));
        }
        Ok(Self {
            angle_denominator,
            base,
            direction,
        })
    }

    pub fn angle_denominator(&self) -> i32 {
        self.angle_denominator
    }

    /// The base constant as requested, before the zero-floor clamp.
    pub fn base(&self) -> Complex64 {
        self.base
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Number of branches each integer produces: `2·|denominator|`.
    pub fn branch_count(&self) -> usize {
        2 * self.angle_denominator.unsigned_abs() as usize
    }

    /// Stable storage key: `<direction>/angle=piDividedBy<d>/alpha=<re>+<im>i`.
    ///
    /// Float parts use the shortest round-trip representation, so distinct
    /// grid points never share a key.
    pub fn storage_key(&self) -> String {
        format!(
            "{}/angle=piDividedBy{}/alpha={}+{}i",
            self.direction,
            self.angle_denominator,
            format_part(self.base.re),
            format_part(self.base.im),
        )
    }

    /// Inverse of [`storage_key`](Self::storage_key).
    pub fn from_storage_key(key: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidKey(key.to_string());
        let mut parts = key.split('/');
        let (Some(direction), Some(angle), Some(alpha), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        let direction: Direction = direction.parse().map_err(|_| invalid())?;
        let angle_denominator: i32 = angle
            .strip_prefix("angle=piDividedBy")
            .and_then(|d| d.parse().ok())
            .ok_or_else(invalid)?;
        let (re, im) = alpha
            .strip_prefix("alpha=")
            .and_then(|a| a.strip_suffix('i'))
            .and_then(|a| a.split_once('+'))
            .ok_or_else(invalid)?;
        let re: f64 = re.parse().map_err(|_| invalid())?;
        let im: f64 = im.parse().map_err(|_| invalid())?;

        Self::new(angle_denominator, Complex64::new(re, im), direction)
    }

    /// Key segments in directory order.
    pub fn key_segments(&self) -> [String; 3] {
        [
            self.direction.to_string(),
            format!("angle=piDividedBy{}", self.angle_denominator),
            format!(
                "alpha={}+{}i",
                format_part(self.base.re),
                format_part(self.base.im)
            ),
        ]
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} direction, angle pi/{}, base {}+{}i",
            self.direction,
            self.angle_denominator,
            format_part(self.base.re),
            format_part(self.base.im),
        )
    }
}

/// `{:?}` on f64 is shortest round-trip: `1.0`, `-0.5`, or `1e-30` once
/// the exponent form is shorter. Adding 0.0 folds -0.0 into 0.0.
fn format_part(v: f64) -> String {
    format!("{:?}", v + 0.0)
}
