//! Sitemill Core - size-capped sitemap segments with an index
//!
//! Streams an open-ended sequence of URL entries into sitemap segments of at
//! most `limit` entries, optionally gzips each finished segment, and ends
//! with a sitemap index referencing every segment.
//!
//! # Example
//!
//! ```no_run
//! use sitemill_core::{Config, SitemapStream};
//!
//! let config = Config {
//!     index_base_url: "https://www.example.com".into(),
//!     limit: 10_000,
//!     ..Default::default()
//! };
//! let mut stream = SitemapStream::new(&config)?;
//! stream.on_segment_created(|path| println!("wrote {}", path.display()));
//!
//! for path in ["/", "/about", "/contact"] {
//!     if !stream.inject(path)? {
//!         stream.wait_for_drain()?;
//!     }
//! }
//! stream.finish()?;
//! let report = stream.wait()?;
//! println!("{} resources finalized", report.finalized);
//! # Ok::<(), sitemill_core::StreamError>(())
//! ```

pub mod compression;
pub mod config;
pub mod error;
pub mod events;
pub mod flow;
pub mod format;
pub mod index;
pub mod inspect;
pub mod logging;
pub mod naming;
pub mod progress;
pub mod record;
pub mod runtime;
pub mod segment;
pub mod session;
pub mod shutdown;
mod sink;
pub mod tracker;

// Re-exports for convenience
pub use compression::Compression;
pub use config::{Config, ConfigError, Settings};
pub use error::{ResourceError, Stage, StreamError};
pub use events::{Event, Handlers};
pub use index::{IndexDocument, IndexEntry};
pub use inspect::{DocumentKind, DocumentSummary, read_resource, summarize};
pub use logging::{ProgressLogger, init_logging};
pub use naming::Resource;
pub use progress::{ProgressContext, SharedProgress};
pub use record::{Entry, RawRecord, Record, RecordError};
pub use segment::{Lifecycle, Segment, SegmentState};
pub use session::{SegmentSummary, SessionReport, SitemapStream};
pub use shutdown::{is_shutdown_requested, request_shutdown, shutdown_flag};
pub use tracker::CompletionTracker;
