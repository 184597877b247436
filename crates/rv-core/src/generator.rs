use crate::delta::DeltaSet;
use crate::params::Parameters;
use crate::state::{GenerationState, Step};
use crate::store::SnapshotStore;

/// Immutable generation context for one stream: its parameters and deltas.
#[derive(Clone, Debug)]
pub struct Generator {
    params: Parameters,
    deltas: DeltaSet,
}

impl Generator {
    pub fn new(params: Parameters) -> Self {
        let deltas = DeltaSet::build(params.angle_denominator());
        Self { params, deltas }
    }

    /// Reuse an already built delta set. `deltas` must belong to
    /// `params.angle_denominator()`.
    pub fn with_deltas(params: Parameters, deltas: DeltaSet) -> Self {
        debug_assert_eq!(deltas.len(), params.branch_count());
        Self { params, deltas }
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn deltas(&self) -> &DeltaSet {
        &self.deltas
    }

    pub fn advance(&self, state: GenerationState) -> (GenerationState, Step) {
        state.advance(&self.deltas, self.params.base(), self.params.direction())
    }
}

/// Persistence cadence for a running stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PersistPolicy {
    /// Save after this many advances. The end of a round always saves.
    pub save_every: u32,
    /// Extra attempts after a failed save before giving up on it.
    pub save_retries: u32,
}

impl Default for PersistPolicy {
    fn default() -> Self {
        Self {
            save_every: 1,
            save_retries: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub advances: u64,
    pub saves: u64,
    pub save_failures: u64,
}

/// A generation stream bound to its store: loads on open, persists as it
/// advances according to a [`PersistPolicy`].
pub struct Stream<'s, S: SnapshotStore> {
    store: &'s S,
    generator: Generator,
    state: GenerationState,
    policy: PersistPolicy,
    unsaved: u32,
    stats: StreamStats,
}

impl<'s, S: SnapshotStore> Stream<'s, S> {
    /// Resume from the store, or start empty when it has nothing usable.
    pub fn open(store: &'s S, generator: Generator, policy: PersistPolicy) -> Self {
        let state = store.load(generator.params());
        Self {
            store,
            generator,
            state,
            policy,
            unsaved: 0,
            stats: StreamStats::default(),
        }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn into_state(self) -> GenerationState {
        self.state
    }

    /// Advance by one integer, record the step and persist if due.
    pub fn step(&mut self) {
        let (state, step) = self.generator.advance(std::mem::take(&mut self.state));
        self.state = state;
        self.stats.advances += 1;
        self.unsaved += 1;

        if let Err(e) = self.store.record_step(self.generator.params(), &step) {
            tracing::warn!(
                "failed to record n={} for {}: {e}",
                step.n,
                self.generator.params()
            );
        }

        if self.unsaved >= self.policy.save_every.max(1) {
            self.persist();
        }
    }

    /// Advance until the current digit length is exhausted (`n + 1` is a
    /// power of two), then persist.
    pub fn run_round(&mut self) {
        loop {
            self.step();
            if self.state.at_boundary() {
                tracing::info!(
                    "for {}, {} is the last number with {} terms",
                    self.generator.params(),
                    self.state.n(),
                    self.state.places()
                );
                break;
            }
        }
        self.flush();
    }

    /// Run whole rounds until every integer with at most `target` digits
    /// has been generated. A stream resumed partway through a digit length
    /// first finishes that length. A target of zero does nothing.
    pub fn run_to_places(&mut self, target: u32) {
        while self.state.places() < target
            || (target > 0 && self.state.places() == target && !self.state.at_boundary())
        {
            self.run_round();
        }
    }

    /// Persist any advances not yet saved.
    pub fn flush(&mut self) {
        if self.unsaved > 0 {
            self.persist();
        }
    }

    fn persist(&mut self) {
        let params = *self.generator.params();
        let attempts = self.policy.save_retries + 1;
        for attempt in 1..=attempts {
            match self.store.save(&params, &self.state) {
                Ok(()) => {
                    self.stats.saves += 1;
                    self.unsaved = 0;
                    return;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!("save attempt {attempt}/{attempts} for {params} failed: {e}");
                }
                Err(e) => {
                    tracing::error!(
                        "giving up saving {params} at n={} ({} unsaved advances at risk): {e}",
                        self.state.n(),
                        self.unsaved
                    );
                }
            }
        }
        self.stats.save_failures += 1;
    }
}

/// Ask for one stream to be generated up to a digit length.
#[derive(Clone, Copy, Debug)]
pub struct GenerationRequest {
    pub params: Parameters,
    pub target_places: u32,
}

/// Resume the requested stream, extend it to the target digit length while
/// persisting, and return the resulting state.
pub fn fulfil<S: SnapshotStore>(
    store: &S,
    request: &GenerationRequest,
    policy: PersistPolicy,
) -> GenerationState {
    let mut stream = Stream::open(store, Generator::new(request.params), policy);
    stream.run_to_places(request.target_places);
    stream.flush();
    stream.into_state()
}
