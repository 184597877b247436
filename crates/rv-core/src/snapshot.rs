//! JSON wire format for persisted generation state.
//!
//! Field names match the existing archive layout: parallel `x_data`,
//! `y_data` and `colors` arrays (colours by palette name), the integer
//! cursor `n`, and `window_boundary`.
//!
//! JSON has no literal for infinities or NaN, which a base at the zero floor
//! produces once its powers overflow. Those values are written as the
//! strings `"inf"`, `"-inf"` and `"NaN"` so every state reloads as saved.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{COLOR_PALETTE, color_index};
use crate::error::{CoreError, Result};
use crate::params::Parameters;
use crate::state::{Coordinate, GenerationState};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    #[serde(with = "float_seq")]
    pub x_data: Vec<f64>,
    #[serde(with = "float_seq")]
    pub y_data: Vec<f64>,
    pub colors: Vec<String>,
    pub n: u64,
    #[serde(with = "float")]
    pub window_boundary: f64,
}

impl Snapshot {
    pub fn from_state(state: &GenerationState) -> Self {
        let coords = state.coordinates();
        Self {
            x_data: coords.iter().map(|c| c.re).collect(),
            y_data: coords.iter().map(|c| c.im).collect(),
            colors: coords
                .iter()
                .map(|c| COLOR_PALETTE[c.color_index].to_string())
                .collect(),
            n: state.n(),
            window_boundary: state.window_boundary(),
        }
    }

    /// Validate against the stream's parameters and rebuild the state.
    pub fn into_state(self, params: &Parameters) -> Result<GenerationState> {
        let len = self.x_data.len();
        if self.y_data.len() != len || self.colors.len() != len {
            return Err(CoreError::InvalidSnapshot(format!(
                "array lengths differ: x={}, y={}, colors={}",
                len,
                self.y_data.len(),
                self.colors.len()
            )));
        }

        let expected = usize::try_from(self.n)
            .ok()
            .and_then(|n| n.checked_mul(params.branch_count()));
        if expected != Some(len) {
            return Err(CoreError::InvalidSnapshot(format!(
                "n={} with {} branches per integer does not match {} coordinates",
                self.n,
                params.branch_count(),
                len
            )));
        }

        if self.window_boundary.is_nan() || self.window_boundary < 0.0 {
            return Err(CoreError::InvalidSnapshot(format!(
                "window boundary {} is not a non-negative number",
                self.window_boundary
            )));
        }

        let coordinates = self
            .x_data
            .into_iter()
            .zip(self.y_data)
            .zip(&self.colors)
            .map(|((re, im), name)| {
                let color_index = color_index(name).ok_or_else(|| {
                    CoreError::InvalidSnapshot(format!("unknown colour '{name}'"))
                })?;
                Ok(Coordinate { re, im, color_index })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(GenerationState::from_parts(
            self.n,
            self.window_boundary,
            coordinates,
        ))
    }
}

/// Serialize a state to its JSON snapshot form.
pub fn encode_snapshot(state: &GenerationState) -> serde_json::Result<String> {
    serde_json::to_string(&Snapshot::from_state(state))
}

/// Parse and validate a JSON snapshot for the given stream.
pub fn decode_snapshot(json: &str, params: &Parameters) -> Result<GenerationState> {
    let snapshot: Snapshot = serde_json::from_str(json)
        .map_err(|e| CoreError::InvalidSnapshot(format!("malformed JSON: {e}")))?;
    snapshot.into_state(params)
}

/// An `f64` that may be non-finite on the wire.
struct WireFloat(f64);

impl Serialize for WireFloat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let v = self.0;
        if v.is_finite() {
            serializer.serialize_f64(v)
        } else if v.is_nan() {
            serializer.serialize_str("NaN")
        } else if v > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }
}

impl<'de> Deserialize<'de> for WireFloat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(WireFloatVisitor)
    }
}

struct WireFloatVisitor;

impl Visitor<'_> for WireFloatVisitor {
    type Value = WireFloat;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number or one of \"inf\", \"-inf\", \"NaN\"")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<WireFloat, E> {
        Ok(WireFloat(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<WireFloat, E> {
        Ok(WireFloat(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<WireFloat, E> {
        Ok(WireFloat(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<WireFloat, E> {
        match v {
            "inf" => Ok(WireFloat(f64::INFINITY)),
            "-inf" => Ok(WireFloat(f64::NEG_INFINITY)),
            "NaN" => Ok(WireFloat(f64::NAN)),
            _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
        }
    }
}

mod float {
    use super::WireFloat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        WireFloat(*v).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        WireFloat::deserialize(deserializer).map(|w| w.0)
    }
}

mod float_seq {
    use super::WireFloat;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|&v| WireFloat(v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let wire = Vec::<WireFloat>::deserialize(deserializer)?;
        Ok(wire.into_iter().map(|w| w.0).collect())
    }
}
