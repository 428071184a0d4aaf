//! `SitemapStream`: one producer-driven session of segments plus an index.
//!
//! The producer thread owns every counter. Resource tasks run on the shared
//! runtime and report back over a channel; the session drains that channel
//! (in `inject`, `dispatch_pending`, `wait_for_drain` and `wait`) and
//! dispatches events to handlers on the producer thread.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};

use crate::compression::Compression;
use crate::config::{Config, Settings};
use crate::error::{ResourceError, StreamError};
use crate::events::{Event, Handlers, Signal};
use crate::index::IndexDocument;
use crate::naming::Resource;
use crate::record::Entry;
use crate::runtime::io_handle;
use crate::segment::{Lifecycle, Segment, SegmentState, SegmentWriter};
use crate::sink::Pipeline;
use crate::tracker::{segment_count, CompletionTracker};

/// Finalized segment as reported at the end of a session
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSummary {
    pub ordinal: u64,
    pub entries: u64,
    pub location: PathBuf,
}

/// Final counts of a completed session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub injected: u64,
    pub segments: Vec<SegmentSummary>,
    pub index: PathBuf,
    pub finalized: usize,
    pub timestamp: String,
}

pub struct SitemapStream {
    settings: Settings,
    injected: u64,
    injection_closed: bool,
    tracker: CompletionTracker,
    writer: SegmentWriter,
    index: Option<Lifecycle>,
    pipeline: Pipeline,
    signals: Receiver<Signal>,
    handlers: Handlers,
    failure: Option<ResourceError>,
}

impl std::fmt::Debug for SitemapStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SitemapStream")
            .field("injected", &self.injected)
            .field("injection_closed", &self.injection_closed)
            .field("tracker", &self.tracker)
            .field("segments", &self.writer.segments().len())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}

impl SitemapStream {
    /// Validate `config` and start a session. Nothing touches the disk until
    /// the first injection.
    pub fn new(config: &Config) -> Result<Self, StreamError> {
        let settings = config.validate()?;
        let (tx, signals) = channel();
        let pipeline = Pipeline {
            handle: io_handle(),
            signals: tx,
            compression: Compression::new(settings.compress, settings.gzip_level),
            high_water_mark: settings.high_water_mark,
        };
        let writer = SegmentWriter::new(pipeline.clone(), &settings);

        log::debug!(
            "Session: limit={} mobile={} compress={} output={}",
            settings.limit,
            settings.mobile,
            settings.compress,
            settings.output_dir.display()
        );

        Ok(Self {
            settings,
            injected: 0,
            injection_closed: false,
            tracker: CompletionTracker::new(),
            writer,
            index: None,
            pipeline,
            signals,
            handlers: Handlers::default(),
            failure: None,
        })
    }

    pub fn on_segment_created(&mut self, f: impl FnMut(&Path) + 'static) {
        self.handlers.on_segment_created(f);
    }

    pub fn on_index_created(&mut self, f: impl FnMut(&Path) + 'static) {
        self.handlers.on_index_created(f);
    }

    pub fn on_done(&mut self, f: impl FnMut(usize) + 'static) {
        self.handlers.on_done(f);
    }

    pub fn on_error(&mut self, f: impl FnMut(&ResourceError) + 'static) {
        self.handlers.on_error(f);
    }

    pub fn on_drain(&mut self, f: impl FnMut(u64) + 'static) {
        self.handlers.on_drain(f);
    }

    /// Validate and append one entry, rotating segments on limit boundaries.
    ///
    /// Returns the advisory flow signal: on `false` the producer should call
    /// [`wait_for_drain`](Self::wait_for_drain) (or wait for a drain event)
    /// before injecting more. Ignoring it loses nothing.
    pub fn inject(&mut self, entry: impl Into<Entry>) -> Result<bool, StreamError> {
        if self.injection_closed {
            return Err(StreamError::InjectionClosed);
        }
        let record = entry.into().normalize()?;

        self.dispatch_pending();
        let accepted = self.writer.write_entry(self.injected, &record);
        self.injected += 1;
        Ok(accepted)
    }

    /// Close injection: seal the last segment and write the index.
    ///
    /// The expected total (`segments + 1`) is fixed here from the final
    /// injected count. Completion is reported asynchronously.
    pub fn finish(&mut self) -> Result<(), StreamError> {
        if self.injection_closed {
            return Err(StreamError::InjectionClosed);
        }
        self.injection_closed = true;

        if self.writer.segments().is_empty() {
            self.writer.open(1);
        }
        self.writer.close();

        let segments = segment_count(self.injected, self.settings.limit);
        self.tracker.expect(segments as usize + 1);

        let document = IndexDocument::build(
            segments,
            &self.settings.index_base_url,
            self.settings.compress,
            &self.settings.timestamp,
        );
        let mut index = Lifecycle::new();
        document.write(&self.pipeline, &self.settings.output_dir);
        index.advance(SegmentState::Closed);
        self.index = Some(index);

        log::info!(
            "Injection closed: {} entries in {segments} segments",
            self.injected
        );
        self.dispatch_pending();
        Ok(())
    }

    /// Handle every signal already received, without blocking.
    /// Returns how many were handled.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(signal) = self.signals.try_recv() {
            self.handle(signal);
            handled += 1;
        }
        handled
    }

    /// Block until the open segment's sink is below its high-water mark.
    /// Returns at once if it is not backpressured.
    pub fn wait_for_drain(&mut self) -> Result<(), StreamError> {
        self.dispatch_pending();
        while self.writer.is_backpressured() {
            self.check_failure()?;
            let signal = self.signals.recv().map_err(|_| StreamError::Disconnected)?;
            self.handle(signal);
        }
        self.check_failure()
    }

    /// Block until every resource is finalized.
    ///
    /// Returns the first asynchronous failure instead, since a failed resource
    /// never finalizes and the session can no longer complete.
    pub fn wait(&mut self) -> Result<SessionReport, StreamError> {
        if !self.injection_closed {
            return Err(StreamError::InjectionOpen);
        }
        self.dispatch_pending();
        loop {
            self.check_failure()?;
            if self.tracker.is_done() {
                return Ok(self.report());
            }
            let signal = self.signals.recv().map_err(|_| StreamError::Disconnected)?;
            self.handle(signal);
        }
    }

    /// Start a fresh round of segments and index.
    ///
    /// Only allowed once the current session is done: the final counts it
    /// needs are captured in the returned report before being cleared.
    pub fn next_session(&mut self) -> Result<SessionReport, StreamError> {
        self.dispatch_pending();
        if !self.tracker.is_done() {
            return Err(StreamError::SessionInFlight {
                finalized: self.tracker.written(),
                expected: self.tracker.expected(),
            });
        }
        let report = self.report();

        self.settings.restamp();
        self.writer.reset(&self.settings.timestamp);
        self.injected = 0;
        self.injection_closed = false;
        self.tracker = CompletionTracker::new();
        self.index = None;

        log::debug!("Next session started after {} entries", report.injected);
        Ok(report)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn injected(&self) -> u64 {
        self.injected
    }

    pub fn segments(&self) -> &[Segment] {
        self.writer.segments()
    }

    pub fn index(&self) -> Option<&Lifecycle> {
        self.index.as_ref()
    }

    pub fn finalized(&self) -> usize {
        self.tracker.written()
    }

    pub fn is_done(&self) -> bool {
        self.tracker.is_done()
    }

    pub fn failure(&self) -> Option<&ResourceError> {
        self.failure.as_ref()
    }

    fn check_failure(&self) -> Result<(), StreamError> {
        match &self.failure {
            Some(e) => Err(StreamError::Resource(e.clone())),
            None => Ok(()),
        }
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Drain => self.handlers.emit(&Event::Drain(self.injected)),
            Signal::Flushed(resource) => {
                if self.settings.compress {
                    self.advance(resource, SegmentState::Compressing);
                }
            }
            Signal::Finalized { resource, location } => self.finalize(resource, location),
            Signal::Failed(err) => {
                log::error!("{err}");
                if self.failure.is_none() {
                    self.failure = Some(err.clone());
                }
                self.handlers.emit(&Event::Error(err));
            }
        }
    }

    fn finalize(&mut self, resource: Resource, location: PathBuf) {
        let accepted = self
            .lifecycle_mut(resource)
            .is_some_and(|lc| lc.finalize(location.clone()));
        if !accepted {
            log::warn!("Spurious finalization of {resource} ignored");
            return;
        }
        log::info!("Finalized {resource}: {}", location.display());

        let event = match resource {
            Resource::Segment(_) => Event::SegmentCreated(location),
            Resource::Index => Event::IndexCreated(location),
        };
        self.handlers.emit(&event);

        if let Some(count) = self.tracker.record_finalized() {
            log::info!("Session done: {count} resources finalized");
            self.handlers.emit(&Event::SessionDone(count));
        }
    }

    fn advance(&mut self, resource: Resource, next: SegmentState) {
        let moved = self.lifecycle_mut(resource).is_some_and(|lc| lc.advance(next));
        if !moved {
            log::warn!("{resource}: ignored transition to {next:?}");
        }
    }

    fn lifecycle_mut(&mut self, resource: Resource) -> Option<&mut Lifecycle> {
        match resource {
            Resource::Segment(ordinal) => self.writer.segment_mut(ordinal).map(|s| &mut s.lifecycle),
            Resource::Index => self.index.as_mut(),
        }
    }

    fn report(&self) -> SessionReport {
        let segments = self
            .writer
            .segments()
            .iter()
            .map(|s| SegmentSummary {
                ordinal: s.ordinal,
                entries: s.entry_count,
                location: s.lifecycle.location().map(Path::to_path_buf).unwrap_or_default(),
            })
            .collect();
        let index = self
            .index
            .as_ref()
            .and_then(|lc| lc.location())
            .map(Path::to_path_buf)
            .unwrap_or_default();

        SessionReport {
            injected: self.injected,
            segments,
            index,
            finalized: self.tracker.written(),
            timestamp: self.settings.timestamp.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use tempfile::TempDir;

    use crate::record::RecordError;

    fn config(dir: &TempDir, limit: u64, compress: bool) -> Config {
        Config {
            output_dir: dir.path().to_path_buf(),
            limit,
            compress,
            timestamp: Some("2024-01-01T00:00:00.000Z".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_config_fails_at_construction() {
        let err = SitemapStream::new(&Config {
            limit: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn malformed_record_leaves_count() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 10, false)).unwrap();
        stream.inject("/a").unwrap();

        let raw: Entry = serde_json::from_str(r#"{"changeFreq": "daily"}"#).unwrap();
        let err = stream.inject(raw).unwrap_err();

        assert!(matches!(err, StreamError::Record(RecordError::MissingUrl)));
        assert_eq!(stream.injected(), 1);
    }

    #[test]
    fn inject_after_finish_rejected() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 10, false)).unwrap();
        stream.inject("/a").unwrap();
        stream.finish().unwrap();

        assert!(matches!(stream.inject("/b"), Err(StreamError::InjectionClosed)));
        assert!(matches!(stream.finish(), Err(StreamError::InjectionClosed)));
        assert_eq!(stream.injected(), 1);
        stream.wait().unwrap();
    }

    #[test]
    fn wait_before_finish_rejected() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 10, false)).unwrap();
        assert!(matches!(stream.wait(), Err(StreamError::InjectionOpen)));
    }

    #[test]
    fn ledger_tracks_rotation() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 3, false)).unwrap();
        for i in 0..7 {
            stream.inject(format!("/p{i}")).unwrap();
        }

        let counts: Vec<_> = stream.segments().iter().map(|s| s.entry_count).collect();
        assert_eq!(counts, vec![3, 3, 1]);
        assert_eq!(stream.segments()[2].lifecycle.state(), SegmentState::Open);
        assert_ne!(stream.segments()[0].lifecycle.state(), SegmentState::Open);

        stream.finish().unwrap();
        let report = stream.wait().unwrap();
        assert_eq!(report.finalized, 4);
        assert!(stream
            .segments()
            .iter()
            .all(|s| s.lifecycle.state() == SegmentState::Finalized));
        assert_eq!(
            stream.index().map(|lc| lc.state()),
            Some(SegmentState::Finalized)
        );
    }

    #[test]
    fn done_fires_once() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 10, true)).unwrap();
        let done = Rc::new(RefCell::new(Vec::new()));
        let d = done.clone();
        stream.on_done(move |n| d.borrow_mut().push(n));

        for i in 0..9 {
            stream.inject(format!("/{i}")).unwrap();
        }
        stream.finish().unwrap();
        stream.wait().unwrap();
        stream.dispatch_pending();

        assert_eq!(*done.borrow(), vec![2]);
    }

    #[test]
    fn next_session_requires_completion() {
        let dir = TempDir::new().unwrap();
        let mut stream = SitemapStream::new(&config(&dir, 10, false)).unwrap();
        stream.inject("/a").unwrap();

        assert!(matches!(
            stream.next_session(),
            Err(StreamError::SessionInFlight { expected: None, .. })
        ));

        stream.finish().unwrap();
        stream.wait().unwrap();
        let report = stream.next_session().unwrap();

        assert_eq!(report.injected, 1);
        assert_eq!(report.finalized, 2);
        assert_eq!(stream.injected(), 0);
        assert!(stream.segments().is_empty());
        assert!(stream.index().is_none());
        assert!(!stream.is_done());

        stream.inject("/b").unwrap();
        stream.finish().unwrap();
        assert_eq!(stream.wait().unwrap().injected, 1);
    }
}
