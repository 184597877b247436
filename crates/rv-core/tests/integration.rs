//! End-to-end tests across the engine: generation requests, resumption
//! through the snapshot format, and the parameter sweep.

use std::cell::Cell;

use num_complex::Complex64;
use rv_core::{
    BaseGrid, CancellationChecker, DeltaSet, Direction, GenerationRequest, GenerationState,
    Generator, MemoryStore, NeverCancel, ParameterSweep, Parameters, PersistPolicy,
    SnapshotStore, Stream, SweepConfig, decode_snapshot, encode_snapshot, fulfil,
};

fn golden_params() -> Parameters {
    Parameters::new(2, Complex64::new(1.0, 1.0), Direction::Contracting).unwrap()
}

/// Two denominators, both directions, eight unit-grid bases.
fn small_config() -> SweepConfig {
    SweepConfig {
        denominator_min: 1,
        denominator_max: 2,
        grid: BaseGrid {
            min: -1.0,
            max: 1.0,
            step: 1.0,
            decimals: 0,
        },
        start_places: 1,
        max_rounds: Some(2),
        ..SweepConfig::default()
    }
}

/// Reports cancelled once it has been polled `allowed` times.
struct CancelAfter {
    allowed: Cell<u32>,
}

impl CancelAfter {
    fn new(allowed: u32) -> Self {
        Self {
            allowed: Cell::new(allowed),
        }
    }
}

impl CancellationChecker for CancelAfter {
    fn is_cancelled(&self) -> bool {
        let left = self.allowed.get();
        if left == 0 {
            return true;
        }
        self.allowed.set(left - 1);
        false
    }
}

/// Test 1: The documented golden scenario, via a generation request.
#[test]
fn golden_request() {
    let store = MemoryStore::new();
    let request = GenerationRequest {
        params: golden_params(),
        target_places: 1,
    };
    let state = fulfil(&store, &request, PersistPolicy::default());

    assert_eq!(state.n(), 1);
    let got: Vec<(f64, f64)> = state.coordinates().iter().map(|c| (c.re, c.im)).collect();
    let want = [(0.5, -0.5), (0.5, 0.5), (-0.5, 0.5), (-0.5, -0.5)];
    for ((re, im), (wr, wi)) in got.iter().zip(want) {
        assert!((re - wr).abs() < 1e-12 && (im - wi).abs() < 1e-12, "{re}+{im}i vs {wr}+{wi}i");
    }
    assert!((state.window_boundary() - 0.5).abs() < 1e-12);
    assert_eq!(store.load(&golden_params()), state);
}

/// Test 2: Resuming from a snapshot gives the same next step as never stopping.
#[test]
fn resume_matches_uninterrupted() {
    let params = Parameters::new(-3, Complex64::new(0.7, -0.4), Direction::Expanding).unwrap();
    let generator = Generator::new(params);

    let mut live = GenerationState::new();
    for _ in 0..20 {
        live = generator.advance(live).0;
    }
    let json = encode_snapshot(&live).unwrap();
    let restored = decode_snapshot(&json, &params).unwrap();
    assert_eq!(restored, live);

    let (next_live, step_live) = generator.advance(live);
    let (next_restored, step_restored) = generator.advance(restored);
    assert_eq!(next_live, next_restored);
    assert_eq!(step_live, step_restored);
}

/// Test 3: Contracting and expanding streams of the same base differ but
/// grow at the same rate.
#[test]
fn directions_share_shape() {
    let base = Complex64::new(0.5, 0.5);
    let store = MemoryStore::new();
    let mut sizes = Vec::new();
    for direction in Direction::ALL {
        let params = Parameters::new(3, base, direction).unwrap();
        let state = fulfil(
            &store,
            &GenerationRequest {
                params,
                target_places: 4,
            },
            PersistPolicy::default(),
        );
        sizes.push((state.n(), state.coordinates().len()));
    }
    assert_eq!(sizes, vec![(15, 90), (15, 90)]);
    assert_eq!(store.len(), 2);
}

/// Test 4: A bounded sweep visits every stream each pass and deepens by one
/// digit per pass.
#[test]
fn sweep_two_passes() {
    let store = MemoryStore::new();
    let config = small_config();
    let streams = (config.denominators().len() * 2 * config.grid.points().len()) as u64;
    assert_eq!(streams, 32);

    let report = ParameterSweep::new(&store, config.clone(), NeverCancel)
        .unwrap()
        .run();

    assert!(!report.halted);
    assert_eq!(report.rounds_completed, 2);
    assert_eq!(report.target_places, 2);
    assert_eq!(report.streams_visited, 2 * streams);
    assert_eq!(report.advances, 3 * streams);
    assert_eq!(report.save_failures, 0);
    assert_eq!(store.len() as u64, streams);

    for denominator in config.denominators() {
        for direction in Direction::ALL {
            for base in config.grid.points() {
                let params = Parameters::new(denominator, base, direction).unwrap();
                let state = store.load(&params);
                assert_eq!(state.n(), 3, "{params}");
                assert_eq!(state.coordinates().len(), 3 * params.branch_count());
            }
        }
    }
}

/// Test 5: A second sweep over already generated streams does no work.
#[test]
fn sweep_is_memoized() {
    let store = MemoryStore::new();
    let config = SweepConfig {
        max_rounds: Some(1),
        start_places: 3,
        ..small_config()
    };
    let first = ParameterSweep::new(&store, config.clone(), NeverCancel)
        .unwrap()
        .run();
    assert_eq!(first.advances, 7 * 32);

    let second = ParameterSweep::new(&store, config, NeverCancel).unwrap().run();
    assert_eq!(second.streams_visited, 32);
    assert_eq!(second.advances, 0);
    assert_eq!(second.saves, 0);
}

/// Test 6: Cancellation halts between streams and leaves saved work intact;
/// a later sweep picks up from there.
#[test]
fn sweep_cancel_and_resume() {
    let store = MemoryStore::new();
    let config = SweepConfig {
        max_rounds: Some(1),
        start_places: 2,
        ..small_config()
    };

    // Polls: denominator 1, base 1, base 2, then cancelled before base 3.
    let report = ParameterSweep::new(&store, config.clone(), CancelAfter::new(3))
        .unwrap()
        .run();
    assert!(report.halted);
    assert_eq!(report.rounds_completed, 0);
    assert_eq!(report.streams_visited, 2);
    assert_eq!(report.advances, 6);
    assert_eq!(store.len(), 2);

    let bases = config.grid.points();
    let first = Parameters::new(1, bases[0], Direction::Expanding).unwrap();
    let third = Parameters::new(1, bases[2], Direction::Expanding).unwrap();
    assert_eq!(store.load(&first).n(), 3);
    assert!(store.load(&third).is_empty());

    let resumed = ParameterSweep::new(&store, config, NeverCancel).unwrap().run();
    assert!(!resumed.halted);
    assert_eq!(resumed.advances, 3 * 30);
    assert_eq!(store.len(), 32);
}

/// Test 7: Cancelled before anything starts: nothing is generated.
#[test]
fn sweep_cancelled_immediately() {
    let store = MemoryStore::new();
    let report = ParameterSweep::new(&store, small_config(), CancelAfter::new(0))
        .unwrap()
        .run();
    assert!(report.halted);
    assert_eq!(report.streams_visited, 0);
    assert!(store.is_empty());
}

/// Test 8: A corrupt snapshot restarts its stream from empty without
/// disturbing the sweep.
#[test]
fn corrupt_snapshot_restarts_stream() {
    let store = MemoryStore::new();
    let params = golden_params();
    store.put_raw(&params, r#"{"x_data": [1.0], "y_data": [], "colors": [], "n": 1, "window_boundary": 1.0}"#);

    let mut stream = Stream::open(&store, Generator::new(params), PersistPolicy::default());
    assert!(stream.state().is_empty());
    stream.run_to_places(2);
    assert_eq!(store.load(&params).n(), 3);
}

/// Test 9: Streams in the same sweep share deltas but not state.
#[test]
fn generators_share_deltas() {
    let deltas = DeltaSet::build(4);
    let a = Parameters::new(4, Complex64::new(0.3, 0.9), Direction::Contracting).unwrap();
    let b = Parameters::new(4, Complex64::new(-0.3, 0.9), Direction::Contracting).unwrap();
    let ga = Generator::with_deltas(a, deltas.clone());
    let gb = Generator::with_deltas(b, deltas);

    let (sa, _) = ga.advance(GenerationState::new());
    let (sb, _) = gb.advance(GenerationState::new());
    assert_eq!(sa.coordinates().len(), sb.coordinates().len());
    assert_ne!(sa, sb);
}

fn same_float(a: f64, b: f64) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

/// A base at the zero floor overflows to non-finite coordinates, and the
/// stream must still resume from its snapshot.
#[test]
fn zero_floor_stream_resumes() {
    let store = MemoryStore::new();
    let request = GenerationRequest {
        params: Parameters::new(2, Complex64::new(0.0, 0.0), Direction::Contracting).unwrap(),
        target_places: 11,
    };
    let state = fulfil(&store, &request, PersistPolicy::default());
    assert_eq!(state.n(), 2047);
    assert!(
        state
            .coordinates()
            .iter()
            .any(|c| !c.re.is_finite() || !c.im.is_finite())
    );

    let loaded = store.load(&request.params);
    assert_eq!(loaded.n(), state.n());
    assert!(same_float(loaded.window_boundary(), state.window_boundary()));
    assert_eq!(loaded.coordinates().len(), state.coordinates().len());
    for (a, b) in loaded.coordinates().iter().zip(state.coordinates()) {
        assert!(same_float(a.re, b.re) && same_float(a.im, b.im), "{a:?} vs {b:?}");
        assert_eq!(a.color_index, b.color_index);
    }

    // Nothing is regenerated for the same target.
    let mut stream = Stream::open(&store, Generator::new(request.params), PersistPolicy::default());
    stream.run_to_places(11);
    assert_eq!(stream.stats().advances, 0);
}
