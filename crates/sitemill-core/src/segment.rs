//! Segment writer: owns the open segment, decides rotation, keeps the ledger

use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::format::{render_entry, urlset_header, URLSET_TRAILER};
use crate::naming::Resource;
use crate::record::Record;
use crate::sink::{Pipeline, ResourceSink};

/// Lifecycle of a segment (and, structurally, of the index document)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentState {
    Open,
    Closed,
    Compressing,
    Finalized,
}

impl SegmentState {
    /// Forward-only: `Open -> Closed -> (Compressing ->)? Finalized`
    pub fn can_advance_to(self, next: Self) -> bool {
        use SegmentState::*;
        matches!(
            (self, next),
            (Open, Closed) | (Closed, Compressing) | (Closed, Finalized) | (Compressing, Finalized)
        )
    }
}

/// State plus final location of one tracked resource
#[derive(Debug, Clone, PartialEq)]
pub struct Lifecycle {
    state: SegmentState,
    location: Option<PathBuf>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: SegmentState::Open,
            location: None,
        }
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    /// Final location, once finalized
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Move to `next`; refuses (and returns false) on any non-forward step
    pub(crate) fn advance(&mut self, next: SegmentState) -> bool {
        if !self.state.can_advance_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    pub(crate) fn finalize(&mut self, location: PathBuf) -> bool {
        if !self.advance(SegmentState::Finalized) {
            return false;
        }
        self.location = Some(location);
        true
    }
}

/// Ledger entry for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub ordinal: u64,
    pub entry_count: u64,
    pub lifecycle: Lifecycle,
}

/// Whether the record following `injected` earlier ones starts a new segment
pub fn rotation_due(injected: u64, limit: u64) -> bool {
    injected == 0 || injected % limit == 0
}

/// Ordinal of the segment receiving the record after `injected` earlier ones
pub fn ordinal_for(injected: u64, limit: u64) -> u64 {
    injected / limit + 1
}

struct OpenSegment {
    ordinal: u64,
    entries: u64,
    sink: ResourceSink,
}

pub(crate) struct SegmentWriter {
    pipeline: Pipeline,
    output_dir: PathBuf,
    header: String,
    mobile: bool,
    timestamp: String,
    limit: u64,
    open: Option<OpenSegment>,
    segments: Vec<Segment>,
}

impl SegmentWriter {
    pub fn new(pipeline: Pipeline, settings: &Settings) -> Self {
        Self {
            pipeline,
            output_dir: settings.output_dir.clone(),
            header: urlset_header(settings.mobile),
            mobile: settings.mobile,
            timestamp: settings.timestamp.clone(),
            limit: settings.limit,
            open: None,
            segments: Vec::new(),
        }
    }

    /// Append `record`, rotating first if `injected` sits on a boundary.
    /// Returns the sink's advisory flow signal.
    pub fn write_entry(&mut self, injected: u64, record: &Record) -> bool {
        let mut open = match self.open.take() {
            Some(open) if !rotation_due(injected, self.limit) => open,
            previous => {
                if let Some(previous) = previous {
                    self.seal(previous);
                }
                self.start(ordinal_for(injected, self.limit))
            }
        };

        let accepted = open
            .sink
            .write(render_entry(record, &self.timestamp, self.mobile));
        open.entries += 1;
        if let Some(segment) = self.segments.last_mut() {
            segment.entry_count = open.entries;
        }
        self.open = Some(open);
        accepted
    }

    /// Start segment `ordinal`, closing the open one first
    pub fn open(&mut self, ordinal: u64) {
        if let Some(previous) = self.open.take() {
            self.seal(previous);
        }
        let open = self.start(ordinal);
        self.open = Some(open);
    }

    /// Write the trailer of the open segment and let it finalize.
    /// Returns the closed ordinal.
    pub fn close(&mut self) -> Option<u64> {
        let open = self.open.take()?;
        let ordinal = open.ordinal;
        self.seal(open);
        Some(ordinal)
    }

    fn start(&mut self, ordinal: u64) -> OpenSegment {
        let resource = Resource::Segment(ordinal);
        let mut sink = ResourceSink::spawn(&self.pipeline, resource, resource.raw_path(&self.output_dir));
        sink.write(self.header.as_str());
        log::debug!("Opened {resource}");

        self.segments.push(Segment {
            ordinal,
            entry_count: 0,
            lifecycle: Lifecycle::new(),
        });
        OpenSegment {
            ordinal,
            entries: 0,
            sink,
        }
    }

    fn seal(&mut self, mut open: OpenSegment) {
        open.sink.write(URLSET_TRAILER);
        open.sink.close();
        if let Some(segment) = self.segment_mut(open.ordinal) {
            segment.lifecycle.advance(SegmentState::Closed);
        }
        log::debug!("Closed segment {} with {} entries", open.ordinal, open.entries);
    }

    pub fn segment_mut(&mut self, ordinal: u64) -> Option<&mut Segment> {
        let idx = usize::try_from(ordinal.checked_sub(1)?).ok()?;
        self.segments.get_mut(idx)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_backpressured(&self) -> bool {
        self.open.as_ref().is_some_and(|o| o.sink.is_backpressured())
    }

    /// Forget the ledger and restamp for a fresh session
    pub fn reset(&mut self, timestamp: &str) {
        if let Some(open) = self.open.take() {
            self.seal(open);
        }
        self.segments.clear();
        self.timestamp = timestamp.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_boundaries() {
        assert!(rotation_due(0, 20));
        assert!(!rotation_due(1, 20));
        assert!(!rotation_due(19, 20));
        assert!(rotation_due(20, 20));
        assert!(rotation_due(40, 20));
        // limit 1 rotates on every record
        assert!((0..5).all(|n| rotation_due(n, 1)));
    }

    #[test]
    fn ordinal_assignment() {
        // k-th record (1-indexed) lands in floor((k-1)/L)+1
        for k in 1..=45u64 {
            assert_eq!(ordinal_for(k - 1, 20), (k - 1) / 20 + 1);
        }
        assert_eq!(ordinal_for(19, 20), 1);
        assert_eq!(ordinal_for(20, 20), 2);
    }

    #[test]
    fn forward_only_transitions() {
        use SegmentState::*;
        assert!(Open.can_advance_to(Closed));
        assert!(Closed.can_advance_to(Compressing));
        assert!(Closed.can_advance_to(Finalized));
        assert!(Compressing.can_advance_to(Finalized));

        assert!(!Open.can_advance_to(Finalized));
        assert!(!Closed.can_advance_to(Open));
        assert!(!Compressing.can_advance_to(Closed));
        for s in [Open, Closed, Compressing, Finalized] {
            assert!(!Finalized.can_advance_to(s));
        }
    }

    #[test]
    fn lifecycle_finalize_once() {
        let mut lc = Lifecycle::new();
        assert!(!lc.finalize(PathBuf::from("early")));
        assert!(lc.advance(SegmentState::Closed));
        assert!(lc.advance(SegmentState::Compressing));
        assert!(lc.finalize(PathBuf::from("sitemap-1.xml.gz")));
        assert!(!lc.finalize(PathBuf::from("again")));
        assert_eq!(lc.location(), Some(Path::new("sitemap-1.xml.gz")));
        assert_eq!(lc.state(), SegmentState::Finalized);
    }
}
