//! Error types: synchronous call errors and asynchronous resource failures

use std::io;
use std::sync::Arc;

use crate::config::ConfigError;
use crate::naming::Resource;
use crate::record::RecordError;

/// Which step of a resource's pipeline failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Creating, writing or flushing the raw file
    Write,
    /// Producing the gzipped derivative
    Compress,
    /// Removing the raw file after compression
    Remove,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Compress => write!(f, "compress"),
            Self::Remove => write!(f, "remove"),
        }
    }
}

/// Asynchronous failure of a sink or of the compression pipeline.
///
/// The affected resource never finalizes, so the session can no longer
/// complete; treat it as session-fatal.
#[derive(Debug, Clone)]
pub struct ResourceError {
    pub resource: Resource,
    pub stage: Stage,
    pub source: Arc<io::Error>,
}

impl ResourceError {
    pub fn new(resource: Resource, stage: Stage, source: io::Error) -> Self {
        Self {
            resource,
            stage,
            source: Arc::new(source),
        }
    }
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} failed: {}", self.resource, self.stage, self.source)
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Error returned by a [`SitemapStream`](crate::SitemapStream) call
#[derive(Debug, Clone)]
pub enum StreamError {
    /// Invalid configuration at construction
    Config(ConfigError),
    /// Malformed injected entry; the session is unaffected
    Record(RecordError),
    /// `inject` or `finish` after injection was closed
    InjectionClosed,
    /// Waiting for completion before `finish`
    InjectionOpen,
    /// `next_session` while resources are still in flight
    SessionInFlight { finalized: usize, expected: Option<usize> },
    /// A resource failed asynchronously; the session cannot complete
    Resource(ResourceError),
    /// All signal senders vanished (runtime shut down)
    Disconnected,
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "Invalid parameters: {e}"),
            Self::Record(e) => write!(f, "{e}"),
            Self::InjectionClosed => write!(f, "injection already closed"),
            Self::InjectionOpen => write!(f, "injection still open; call finish() first"),
            Self::SessionInFlight {
                finalized,
                expected: Some(expected),
            } => write!(f, "session in flight: {finalized}/{expected} resources finalized"),
            Self::SessionInFlight {
                finalized,
                expected: None,
            } => write!(f, "session in flight: {finalized} resources finalized, injection open"),
            Self::Resource(e) => write!(f, "{e}"),
            Self::Disconnected => write!(f, "resource signal channel closed"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Record(e) => Some(e),
            Self::Resource(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for StreamError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<RecordError> for StreamError {
    fn from(e: RecordError) -> Self {
        Self::Record(e)
    }
}

impl From<ResourceError> for StreamError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}
