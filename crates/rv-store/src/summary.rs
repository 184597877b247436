use rv_core::{GenerationState, Parameters};

/// One stored stream, as listed by `list()` on either store.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotSummary {
    pub params: Parameters,
    pub n: u64,
    pub places: u32,
    pub coordinates: usize,
    pub window_boundary: f64,
}

impl SnapshotSummary {
    pub fn new(params: Parameters, state: &GenerationState) -> Self {
        Self {
            params,
            n: state.n(),
            places: state.places(),
            coordinates: state.coordinates().len(),
            window_boundary: state.window_boundary(),
        }
    }
}
