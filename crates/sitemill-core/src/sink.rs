//! Resource sink: non-blocking producer handle over an async file writer task

use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::compression::{self, Compression};
use crate::error::{ResourceError, Stage};
use crate::events::Signal;
use crate::flow::{FlowGauge, Reservation};
use crate::naming::Resource;

/// Everything a sink task needs besides its own resource: where to run,
/// where to report, how to finalize.
#[derive(Debug, Clone)]
pub(crate) struct Pipeline {
    pub handle: Handle,
    pub signals: Sender<Signal>,
    pub compression: Compression,
    pub high_water_mark: usize,
}

/// Producer-side handle of one resource being written.
///
/// Chunks are queued to a writer task; `write` never blocks. Dropping or
/// [`close`](ResourceSink::close)-ing the handle lets the task flush, sync
/// and run the compression pipeline.
pub(crate) struct ResourceSink {
    resource: Resource,
    tx: UnboundedSender<Vec<u8>>,
    gauge: Arc<FlowGauge>,
    signals: Sender<Signal>,
    bytes_queued: u64,
}

impl std::fmt::Debug for ResourceSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSink")
            .field("resource", &self.resource)
            .field("bytes_queued", &self.bytes_queued)
            .field("pending", &self.gauge.pending())
            .finish_non_exhaustive()
    }
}

impl ResourceSink {
    /// Start the writer task for `resource` at `path`
    pub fn spawn(pipeline: &Pipeline, resource: Resource, path: PathBuf) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let gauge = Arc::new(FlowGauge::new(pipeline.high_water_mark));

        let task = pipeline.handle.spawn(run_sink(
            resource,
            path,
            rx,
            gauge.clone(),
            pipeline.signals.clone(),
            pipeline.compression,
        ));
        pipeline
            .handle
            .spawn(supervise(resource, task, pipeline.signals.clone()));

        Self {
            resource,
            tx,
            gauge,
            signals: pipeline.signals.clone(),
            bytes_queued: 0,
        }
    }

    /// Queue a chunk. Returns the advisory flow signal: `false` means the
    /// unflushed volume reached the high-water mark.
    pub fn write(&mut self, chunk: impl Into<Vec<u8>>) -> bool {
        let chunk = chunk.into();
        let n = chunk.len();
        let reservation = self.gauge.reserve(n);
        if reservation == Reservation::Drained {
            let _ = self.signals.send(Signal::Drain);
        }
        if self.tx.send(chunk).is_err() {
            // writer task already failed and reported it
            if self.gauge.release(n) {
                let _ = self.signals.send(Signal::Drain);
            }
            log::debug!("{}: dropped {n} bytes after sink failure", self.resource);
            return reservation.is_accepted();
        }
        self.bytes_queued += n as u64;
        reservation.is_accepted()
    }

    pub fn is_backpressured(&self) -> bool {
        self.gauge.is_backpressured()
    }

    /// Stop accepting chunks; the task finalizes asynchronously
    pub fn close(self) {
        log::debug!("{}: closing after {} bytes", self.resource, self.bytes_queued);
    }
}

async fn run_sink(
    resource: Resource,
    path: PathBuf,
    mut rx: UnboundedReceiver<Vec<u8>>,
    gauge: Arc<FlowGauge>,
    signals: Sender<Signal>,
    compression: Compression,
) {
    if let Err(e) = write_raw(&path, &mut rx, &gauge, &signals).await {
        let _ = signals.send(Signal::Failed(ResourceError::new(resource, Stage::Write, e)));
        return;
    }
    let _ = signals.send(Signal::Flushed(resource));

    let signal = match compression::finalize(path, compression).await {
        Ok(location) => Signal::Finalized { resource, location },
        Err((stage, e)) => Signal::Failed(ResourceError::new(resource, stage, e)),
    };
    let _ = signals.send(signal);
}

/// Report a sink task that died without sending its own outcome
async fn supervise(resource: Resource, task: JoinHandle<()>, signals: Sender<Signal>) {
    let Err(e) = task.await else {
        return;
    };
    if e.is_panic() {
        log::error!("{resource}: sink task panicked");
        let source = io::Error::other(format!("sink task panicked: {e}"));
        let _ = signals.send(Signal::Failed(ResourceError::new(resource, Stage::Write, source)));
    }
}

/// Drain the chunk queue into the raw file until the producer closes it
async fn write_raw(
    path: &Path,
    rx: &mut UnboundedReceiver<Vec<u8>>,
    gauge: &FlowGauge,
    signals: &Sender<Signal>,
) -> io::Result<u64> {
    let file = tokio::fs::File::create(path).await?;
    let mut out = BufWriter::new(file);
    let mut total = 0u64;

    while let Some(chunk) = rx.recv().await {
        out.write_all(&chunk).await?;
        total += chunk.len() as u64;
        if gauge.release(chunk.len()) {
            let _ = signals.send(Signal::Drain);
        }
    }

    out.flush().await?;
    out.get_ref().sync_all().await?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::{channel, Receiver};
    use std::time::Duration;

    use tempfile::TempDir;

    use crate::runtime::io_handle;

    fn pipeline(compression: Compression, high_water_mark: usize) -> (Pipeline, Receiver<Signal>) {
        let (signals, rx) = channel();
        let pipeline = Pipeline {
            handle: io_handle(),
            signals,
            compression,
            high_water_mark,
        };
        (pipeline, rx)
    }

    fn next(rx: &Receiver<Signal>) -> Signal {
        rx.recv_timeout(Duration::from_secs(10)).expect("signal")
    }

    #[test]
    fn writes_then_finalizes_raw() {
        let dir = TempDir::new().unwrap();
        let (pipeline, rx) = pipeline(Compression::None, usize::MAX);
        let path = dir.path().join("sitemap-1.xml");

        let mut sink = ResourceSink::spawn(&pipeline, Resource::Segment(1), path.clone());
        assert!(sink.write("<urlset>"));
        assert!(sink.write("</urlset>"));
        sink.close();

        assert!(matches!(next(&rx), Signal::Flushed(Resource::Segment(1))));
        match next(&rx) {
            Signal::Finalized { resource, location } => {
                assert_eq!(resource, Resource::Segment(1));
                assert_eq!(location, path);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<urlset></urlset>");
    }

    #[test]
    fn backpressure_then_drain() {
        let dir = TempDir::new().unwrap();
        let (pipeline, rx) = pipeline(Compression::None, 0);

        let mut sink =
            ResourceSink::spawn(&pipeline, Resource::Index, dir.path().join("sitemapindex.xml"));
        assert!(!sink.write("abc"));

        assert!(matches!(next(&rx), Signal::Drain));
        assert!(!sink.is_backpressured());
        sink.close();
        assert!(matches!(next(&rx), Signal::Flushed(Resource::Index)));
    }

    #[test]
    fn unwritable_location_fails() {
        let dir = TempDir::new().unwrap();
        let (pipeline, rx) = pipeline(Compression::Gzip { level: 6 }, usize::MAX);
        let path = dir.path().join("missing").join("sitemap-1.xml");

        let sink = ResourceSink::spawn(&pipeline, Resource::Segment(1), path);
        sink.close();

        match next(&rx) {
            Signal::Failed(e) => {
                assert_eq!(e.resource, Resource::Segment(1));
                assert_eq!(e.stage, Stage::Write);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn panicked_task_reported_as_failure() {
        let (signals, rx) = channel();
        let handle = io_handle();
        let task = handle.spawn(async { panic!("writer crashed") });
        handle.spawn(supervise(Resource::Segment(4), task, signals));

        match next(&rx) {
            Signal::Failed(e) => {
                assert_eq!(e.resource, Resource::Segment(4));
                assert!(e.to_string().contains("panicked"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
