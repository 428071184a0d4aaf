//! Advisory backpressure: high-water mark over a sink's unflushed volume

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Outcome of [`FlowGauge::reserve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Below the high-water mark
    Accepted,
    /// At or above the mark; the writer reports the drain
    Backpressured,
    /// At or above the mark, but the writer emptied the queue before the
    /// episode was armed; the caller reports the drain
    Drained,
}

impl Reservation {
    /// The advisory flow signal handed back to the producer
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// Byte gauge shared by a producer-side sink handle and its writer task.
///
/// The producer [`reserve`](FlowGauge::reserve)s before queueing a chunk; the
/// writer [`release`](FlowGauge::release)s after the chunk reaches the file.
/// Nothing is ever rejected: a non-accepted reservation only asks the
/// producer to pause until the next drain. Every armed episode ends in
/// exactly one drain, reported by whichever side clears the flag.
#[derive(Debug)]
pub struct FlowGauge {
    pending: AtomicUsize,
    high_water_mark: usize,
    needs_drain: AtomicBool,
}

impl FlowGauge {
    pub fn new(high_water_mark: usize) -> Self {
        Self {
            pending: AtomicUsize::new(0),
            high_water_mark,
            needs_drain: AtomicBool::new(false),
        }
    }

    /// Account for `n` queued bytes
    pub fn reserve(&self, n: usize) -> Reservation {
        let pending = self.pending.fetch_add(n, Ordering::AcqRel) + n;
        if pending < self.high_water_mark {
            return Reservation::Accepted;
        }
        self.needs_drain.store(true, Ordering::SeqCst);
        // a release that emptied the queue before the store saw no flag
        if self.pending.load(Ordering::SeqCst) == 0
            && self.needs_drain.swap(false, Ordering::SeqCst)
        {
            return Reservation::Drained;
        }
        Reservation::Backpressured
    }

    /// Account for `n` bytes handed to the file. Returns `true` once per
    /// backpressure episode, when the queue empties.
    pub fn release(&self, n: usize) -> bool {
        let pending = self.pending.fetch_sub(n, Ordering::SeqCst) - n;
        pending == 0 && self.needs_drain.swap(false, Ordering::SeqCst)
    }

    /// Queued bytes not yet written
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Whether a backpressured reservation is still waiting for its drain
    pub fn is_backpressured(&self) -> bool {
        self.needs_drain.load(Ordering::Acquire)
    }
}
