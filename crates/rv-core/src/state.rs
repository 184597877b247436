use num_complex::Complex64;

use crate::branch::{Branch, evaluate};
use crate::delta::DeltaSet;
use crate::digits::{DigitSequence, places, subsequent_places};
use crate::params::Direction;

/// A generated point plus the palette slot of the branch that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub re: f64,
    pub im: f64,
    pub color_index: usize,
}

impl Coordinate {
    pub fn value(&self) -> Complex64 {
        Complex64::new(self.re, self.im)
    }
}

/// What one call to [`GenerationState::advance`] produced.
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub n: u64,
    pub digits: DigitSequence,
    pub branches: Vec<Branch>,
}

/// Resumable accumulator for one parameter stream.
///
/// `coordinates` is append-only and `window_boundary` never decreases.
/// [`advance`](Self::advance) is the only way to move the cursor forward.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenerationState {
    n: u64,
    places: u32,
    subsequent_places: u32,
    window_boundary: f64,
    coordinates: Vec<Coordinate>,
}

impl GenerationState {
    /// Fresh, empty state (cursor at zero).
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state from persisted parts. Digit counts are derived from `n`.
    pub(crate) fn from_parts(n: u64, window_boundary: f64, coordinates: Vec<Coordinate>) -> Self {
        let (places, subsequent_places) = if n == 0 {
            (0, 0)
        } else {
            (places(n), subsequent_places(n))
        };
        Self {
            n,
            places,
            subsequent_places,
            window_boundary,
            coordinates,
        }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn places(&self) -> u32 {
        self.places
    }

    pub fn subsequent_places(&self) -> u32 {
        self.subsequent_places
    }

    pub fn window_boundary(&self) -> f64 {
        self.window_boundary
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// True when the last generated integer was the final one with its
    /// digit count.
    pub fn at_boundary(&self) -> bool {
        self.n > 0 && self.subsequent_places > self.places
    }

    /// Coordinates belonging to integers with at most `max_places` digits:
    /// the first `(2^p − 1) · branches_per_n` entries, clamped to what exists.
    pub fn frame(&self, max_places: u32, branches_per_n: usize) -> &[Coordinate] {
        let integers = if max_places >= u64::BITS {
            u64::MAX
        } else {
            (1u64 << max_places) - 1
        };
        let end = usize::try_from(integers)
            .ok()
            .and_then(|i| i.checked_mul(branches_per_n))
            .map_or(self.coordinates.len(), |e| e.min(self.coordinates.len()));
        &self.coordinates[..end]
    }

    /// Generate every branch of the next integer and absorb it.
    ///
    /// Appends one coordinate per delta (offsets `0 … |deltas| − 1`) and
    /// widens the window boundary to cover each new component.
    pub fn advance(mut self, deltas: &DeltaSet, base: Complex64, direction: Direction) -> (Self, Step) {
        self.n += 1;
        self.places = places(self.n);
        self.subsequent_places = subsequent_places(self.n);

        let digits = DigitSequence::encode(self.n, direction);
        let branches: Vec<Branch> = (0..deltas.len())
            .map(|offset| evaluate(&digits, deltas, offset, base, direction))
            .collect();

        self.coordinates.reserve(branches.len());
        for b in &branches {
            self.window_boundary = self
                .window_boundary
                .max(b.value.re.abs())
                .max(b.value.im.abs());
            self.coordinates.push(Coordinate {
                re: b.value.re,
                im: b.value.im,
                color_index: b.color_index,
            });
        }

        let step = Step {
            n: self.n,
            digits,
            branches,
        };
        (self, step)
    }
}
