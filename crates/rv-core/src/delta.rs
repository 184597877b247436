use std::f64::consts::PI;
use std::ops::Index;

use num_complex::Complex64;

use crate::constants::DELTA_PRECISION;

/// Ordered rotation constants `e^{i·k·π/d}` for `k = 0 … 2|d| − 1`.
///
/// Each component is rounded to [`DELTA_PRECISION`] decimals so a set
/// rebuilt in a later run is bit-identical to the one that produced a
/// snapshot. Never mutated once built.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaSet {
    deltas: Vec<Complex64>,
}

impl DeltaSet {
    /// Build the set for a nonzero angle denominator. A negative denominator
    /// walks the circle clockwise.
    pub fn build(angle_denominator: i32) -> Self {
        let count = 2 * angle_denominator.unsigned_abs() as usize;
        let deltas = (0..count)
            .map(|k| {
                let theta = k as f64 * PI / angle_denominator as f64;
                let z = Complex64::from_polar(1.0, theta);
                Complex64::new(round_to(z.re), round_to(z.im))
            })
            .collect();
        let set = Self { deltas };
        tracing::debug!("angle pi/{angle_denominator} -> {:?}", set.deltas);
        set
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex64] {
        &self.deltas
    }

    pub fn iter(&self) -> impl Iterator<Item = &Complex64> {
        self.deltas.iter()
    }
}

impl Index<usize> for DeltaSet {
    type Output = Complex64;

    fn index(&self, i: usize) -> &Complex64 {
        &self.deltas[i]
    }
}

fn round_to(v: f64) -> f64 {
    let scale = 10f64.powi(DELTA_PRECISION);
    (v * scale).round() / scale
}
