use num_complex::Complex64;

use crate::constants::{COLOR_PALETTE, MIN_BASE, PALETTE_SIZE};
use crate::delta::DeltaSet;
use crate::digits::DigitSequence;
use crate::params::Direction;

/// One revolving-number coordinate for a fixed integer and starting offset.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub offset: usize,
    /// Digit sequence with each `1` replaced by its delta; `0` stays zero.
    pub terms: Vec<Complex64>,
    pub value: Complex64,
    pub color_index: usize,
}

impl Branch {
    pub fn color_name(&self) -> &'static str {
        COLOR_PALETTE[self.color_index]
    }
}

/// Replace a base whose modulus is below [`MIN_BASE`] with `MIN_BASE·(1 + i)`.
pub fn clamp_base(base: Complex64) -> Complex64 {
    if base.norm() < MIN_BASE {
        Complex64::new(MIN_BASE, MIN_BASE)
    } else {
        base
    }
}

/// Substitute deltas into the `1` digits, starting at `start_offset` and
/// advancing (with wrap) after every substitution.
pub fn substitute(digits: &DigitSequence, deltas: &DeltaSet, start_offset: usize) -> Vec<Complex64> {
    let mut idx = start_offset % deltas.len();
    digits
        .bits()
        .iter()
        .map(|&b| {
            if b == 1 {
                let d = deltas[idx];
                idx = (idx + 1) % deltas.len();
                d
            } else {
                Complex64::new(0.0, 0.0)
            }
        })
        .collect()
}

/// Positional sum of `terms` in the given base.
///
/// Contracting: `Σ term[k] · base^-(k+1)`.
/// Expanding:   `Σ term[k] · base^(len-1-k)`.
pub fn positional_value(terms: &[Complex64], base: Complex64, direction: Direction) -> Complex64 {
    let base = clamp_base(base);
    match direction {
        Direction::Contracting => {
            let inv = base.inv();
            let mut weight = inv;
            let mut sum = Complex64::new(0.0, 0.0);
            for t in terms {
                sum += t * weight;
                weight *= inv;
            }
            sum
        }
        // Horner: leading term carries the highest power.
        Direction::Expanding => terms
            .iter()
            .fold(Complex64::new(0.0, 0.0), |acc, t| acc * base + t),
    }
}

/// Evaluate one branch of `digits` for the given starting rotation offset.
pub fn evaluate(
    digits: &DigitSequence,
    deltas: &DeltaSet,
    start_offset: usize,
    base: Complex64,
    direction: Direction,
) -> Branch {
    let terms = substitute(digits, deltas, start_offset);
    let value = positional_value(&terms, base, direction);
    Branch {
        offset: start_offset,
        terms,
        value,
        color_index: start_offset % PALETTE_SIZE,
    }
}
