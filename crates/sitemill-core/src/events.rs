//! Signals: task → control loop messages, and the public event registry

use std::path::{Path, PathBuf};

use crate::error::ResourceError;
use crate::naming::Resource;

/// Completion message sent by a resource task to the session's control loop
#[derive(Debug)]
pub(crate) enum Signal {
    /// A backpressured sink emptied its queue
    Drain,
    /// Raw file fully written and synced
    Flushed(Resource),
    /// Resource reached its permanent location
    Finalized { resource: Resource, location: PathBuf },
    Failed(ResourceError),
}

/// Event dispatched to registered handlers
#[derive(Debug, Clone)]
pub enum Event {
    /// A segment was finalized at this location
    SegmentCreated(PathBuf),
    /// The index document was finalized at this location
    IndexCreated(PathBuf),
    /// Every resource of the session is finalized; carries the count
    SessionDone(usize),
    Error(ResourceError),
    /// A backpressured sink drained; carries the injected count so far
    Drain(u64),
}

type PathHandler = Box<dyn FnMut(&Path)>;

/// Callback registry, one list per event kind. Handlers run synchronously on
/// the thread that drives the session, in registration order.
#[derive(Default)]
pub struct Handlers {
    segment_created: Vec<PathHandler>,
    index_created: Vec<PathHandler>,
    done: Vec<Box<dyn FnMut(usize)>>,
    error: Vec<Box<dyn FnMut(&ResourceError)>>,
    drain: Vec<Box<dyn FnMut(u64)>>,
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("segment_created", &self.segment_created.len())
            .field("index_created", &self.index_created.len())
            .field("done", &self.done.len())
            .field("error", &self.error.len())
            .field("drain", &self.drain.len())
            .finish()
    }
}

impl Handlers {
    pub fn on_segment_created(&mut self, f: impl FnMut(&Path) + 'static) {
        self.segment_created.push(Box::new(f));
    }

    pub fn on_index_created(&mut self, f: impl FnMut(&Path) + 'static) {
        self.index_created.push(Box::new(f));
    }

    pub fn on_done(&mut self, f: impl FnMut(usize) + 'static) {
        self.done.push(Box::new(f));
    }

    pub fn on_error(&mut self, f: impl FnMut(&ResourceError) + 'static) {
        self.error.push(Box::new(f));
    }

    pub fn on_drain(&mut self, f: impl FnMut(u64) + 'static) {
        self.drain.push(Box::new(f));
    }

    /// Deliver `event` to every handler registered for its kind
    pub fn emit(&mut self, event: &Event) {
        match event {
            Event::SegmentCreated(path) => self.segment_created.iter_mut().for_each(|h| h(path)),
            Event::IndexCreated(path) => self.index_created.iter_mut().for_each(|h| h(path)),
            Event::SessionDone(n) => self.done.iter_mut().for_each(|h| h(*n)),
            Event::Error(e) => self.error.iter_mut().for_each(|h| h(e)),
            Event::Drain(n) => self.drain.iter_mut().for_each(|h| h(*n)),
        }
    }
}
