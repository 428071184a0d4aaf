//! Completion accounting across segments and the index

/// Counts finalized resources and decides when the session is done.
///
/// The expected total is only known once injection closes; until then
/// finalizations are counted but never compared.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompletionTracker {
    written: usize,
    expected: Option<usize>,
    done_fired: bool,
}

/// `segments + 1`: every segment plus the index. A closed session with no
/// records still produces one (empty) segment.
pub fn expected_total(injected: u64, limit: u64) -> usize {
    segment_count(injected, limit) as usize + 1
}

/// Segments a session of `injected` records produces
pub fn segment_count(injected: u64, limit: u64) -> u64 {
    injected.div_ceil(limit).max(1)
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the expected total once the final injected count is known
    pub fn expect(&mut self, total: usize) {
        self.expected = Some(total);
    }

    /// Count one finalized resource. Returns `Some(count)` exactly once,
    /// on the finalization that completes the session.
    pub fn record_finalized(&mut self) -> Option<usize> {
        if self.done_fired {
            log::warn!("Finalization after session completed; ignored");
            return None;
        }
        if self.expected.is_some_and(|expected| self.written >= expected) {
            log::warn!("Finalization beyond expected total; ignored");
            return None;
        }

        self.written += 1;
        if self.expected == Some(self.written) {
            self.done_fired = true;
            return Some(self.written);
        }
        None
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn expected(&self) -> Option<usize> {
        self.expected
    }

    pub fn is_done(&self) -> bool {
        self.done_fired
    }
}
