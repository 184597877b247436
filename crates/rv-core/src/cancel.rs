use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// External cancel signal polled by the sweep at stream boundaries.
pub trait CancellationChecker {
    /// Returns true once the sweep should halt.
    fn is_cancelled(&self) -> bool;
}

/// Never cancels.
#[derive(Clone, Copy, Default)]
pub struct NeverCancel;

impl CancellationChecker for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Reads a shared flag, typically set by a signal handler.
#[derive(Clone)]
pub struct AtomicBoolChecker {
    flag: Arc<AtomicBool>,
}

impl AtomicBoolChecker {
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }
}

impl CancellationChecker for AtomicBoolChecker {
    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl<C: CancellationChecker + ?Sized> CancellationChecker for &C {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}
