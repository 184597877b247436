use std::fmt;

use crate::params::Direction;

/// Number of binary digits in `n`. `places(0) == 0`.
pub fn places(n: u64) -> u32 {
    u64::BITS - n.leading_zeros()
}

/// Digit count of the integer after `n`.
pub fn subsequent_places(n: u64) -> u32 {
    places(n.saturating_add(1))
}

/// True when `n` is the last integer with its digit count,
/// i.e. `n + 1` is a power of two.
pub fn is_boundary(n: u64) -> bool {
    subsequent_places(n) > places(n)
}

/// Binary digits of an integer in direction order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigitSequence {
    bits: Vec<u8>,
}

impl DigitSequence {
    /// Encode `n ≥ 1`. Contracting yields least-significant-bit first,
    /// Expanding yields most-significant-bit first.
    pub fn encode(n: u64, direction: Direction) -> Self {
        let lsb_first = (0..places(n)).map(|i| ((n >> i) & 1) as u8);
        let bits = match direction {
            Direction::Contracting => lsb_first.collect(),
            Direction::Expanding => {
                let mut bits: Vec<u8> = lsb_first.collect();
                bits.reverse();
                bits
            }
        };
        Self { bits }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Count of `1` digits, which is also how many deltas a branch consumes.
    pub fn ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b == 1).count()
    }
}

impl fmt::Display for DigitSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, b) in self.bits.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{b}")?;
        }
        f.write_str("]")
    }
}
