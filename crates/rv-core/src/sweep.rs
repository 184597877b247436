use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::cancel::CancellationChecker;
use crate::delta::DeltaSet;
use crate::error::{CoreError, Result};
use crate::generator::{Generator, PersistPolicy, Stream, StreamStats};
use crate::params::{Direction, Parameters};
use crate::store::SnapshotStore;

/// Square grid of base constants, identical on both axes. The origin is
/// always skipped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseGrid {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Decimals each grid value is rounded to, so accumulated float error
    /// never leaks into storage keys.
    pub decimals: u32,
}

impl Default for BaseGrid {
    fn default() -> Self {
        Self {
            min: -1.0,
            max: 1.0,
            step: 0.1,
            decimals: 1,
        }
    }
}

impl BaseGrid {
    pub fn axis(&self) -> Vec<f64> {
        let count = ((self.max - self.min) / self.step + 1e-9).floor() as i64 + 1;
        let scale = 10f64.powi(self.decimals as i32);
        (0..count.max(0))
            .map(|k| ((self.min + k as f64 * self.step) * scale).round() / scale)
            .collect()
    }

    /// Base constants in sweep order: real part outer, imaginary part inner.
    pub fn points(&self) -> Vec<Complex64> {
        let axis = self.axis();
        axis.iter()
            .flat_map(|&re| axis.iter().map(move |&im| Complex64::new(re, im)))
            .filter(|z| !(z.re == 0.0 && z.im == 0.0))
            .collect()
    }
}

/// Shape of the parameter space and how deep each pass goes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub denominator_min: i32,
    pub denominator_max: i32,
    pub grid: BaseGrid,
    /// Digit length targeted by the first pass; each later pass adds one.
    pub start_places: u32,
    /// Stop after this many passes. `None` sweeps until cancelled.
    pub max_rounds: Option<u32>,
    pub save_every: u32,
    pub save_retries: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let policy = PersistPolicy::default();
        Self {
            denominator_min: -5,
            denominator_max: 5,
            grid: BaseGrid::default(),
            start_places: 1,
            max_rounds: None,
            save_every: policy.save_every,
            save_retries: policy.save_retries,
        }
    }
}

impl SweepConfig {
    /// Denominators in sweep order, zero excluded.
    pub fn denominators(&self) -> Vec<i32> {
        (self.denominator_min..=self.denominator_max)
            .filter(|&d| d != 0)
            .collect()
    }

    pub fn persist_policy(&self) -> PersistPolicy {
        PersistPolicy {
            save_every: self.save_every.max(1),
            save_retries: self.save_retries,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.denominators().is_empty() {
            return Err(CoreError::InvalidConfig(format!(
                "no nonzero denominators in {}..={}",
                self.denominator_min, self.denominator_max
            )));
        }
        let g = &self.grid;
        if !(g.step.is_finite() && g.step > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "grid step must be positive, got {}",
                g.step
            )));
        }
        if !(g.min.is_finite() && g.max.is_finite()) || g.min > g.max {
            return Err(CoreError::InvalidConfig(format!(
                "grid range {}..={} is empty",
                g.min, g.max
            )));
        }
        if g.points().is_empty() {
            return Err(CoreError::InvalidConfig(
                "grid contains no base constant besides the origin".to_string(),
            ));
        }
        if self.start_places > u64::BITS {
            return Err(CoreError::InvalidConfig(format!(
                "start_places {} exceeds {}",
                self.start_places,
                u64::BITS
            )));
        }
        Ok(())
    }
}

/// Totals for a sweep run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rounds_completed: u32,
    /// Digit length targeted by the last pass that started.
    pub target_places: u32,
    pub streams_visited: u64,
    pub advances: u64,
    pub saves: u64,
    pub save_failures: u64,
    /// True when the sweep stopped on the cancel signal.
    pub halted: bool,
}

impl SweepReport {
    fn absorb(&mut self, stats: StreamStats) {
        self.streams_visited += 1;
        self.advances += stats.advances;
        self.saves += stats.saves;
        self.save_failures += stats.save_failures;
    }
}

/// Drives every (denominator, direction, base) stream to an ever-deeper
/// digit length.
///
/// Each pass walks denominators, then directions, then base constants, and
/// brings every stream up to the pass's target digit length before the next
/// pass raises the target by one. The cancel signal is polled before each
/// denominator and before each base constant; a stream already running
/// finishes its digit length first, so snapshots always end on a boundary.
pub struct ParameterSweep<'s, S: SnapshotStore, C: CancellationChecker> {
    store: &'s S,
    config: SweepConfig,
    cancel: C,
}

impl<'s, S: SnapshotStore, C: CancellationChecker> ParameterSweep<'s, S, C> {
    pub fn new(store: &'s S, config: SweepConfig, cancel: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            config,
            cancel,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn run(&self) -> SweepReport {
        let denominators = self.config.denominators();
        let bases = self.config.grid.points();
        let policy = self.config.persist_policy();

        let mut report = SweepReport::default();
        let mut target = self.config.start_places.max(1);

        loop {
            if let Some(max) = self.config.max_rounds
                && report.rounds_completed >= max
            {
                return report;
            }
            report.target_places = target;
            tracing::info!(
                "sweep pass {} targeting {target} terms",
                report.rounds_completed + 1
            );

            for &denominator in &denominators {
                if self.halt(&mut report) {
                    return report;
                }
                let deltas = DeltaSet::build(denominator);

                for direction in Direction::ALL {
                    for &base in &bases {
                        if self.halt(&mut report) {
                            return report;
                        }
                        let params = match Parameters::new(denominator, base, direction) {
                            Ok(p) => p,
                            Err(e) => {
                                tracing::warn!("skipping denominator {denominator}: {e}");
                                continue;
                            }
                        };
                        let generator = Generator::with_deltas(params, deltas.clone());
                        let mut stream = Stream::open(self.store, generator, policy);
                        stream.run_to_places(target);
                        report.absorb(stream.stats());
                    }
                }
            }

            report.rounds_completed += 1;
            tracing::info!(
                "sweep pass {} complete: {} streams, {} advances so far",
                report.rounds_completed,
                report.streams_visited,
                report.advances
            );
            target = target.saturating_add(1).min(u64::BITS);
        }
    }

    fn halt(&self, report: &mut SweepReport) -> bool {
        if self.cancel.is_cancelled() {
            tracing::info!(
                "sweep cancelled after {} passes, {} streams visited",
                report.rounds_completed,
                report.streams_visited
            );
            report.halted = true;
            return true;
        }
        false
    }
}
