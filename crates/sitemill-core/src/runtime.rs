//! Shared tokio runtime hosting sink and compression tasks.
//!
//! The public API is synchronous; only the file I/O and gzip work run as
//! tasks, and their completions come back to the producer over a channel.

use std::sync::LazyLock;

/// Shared tokio runtime for resource I/O.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("sitemill-io")
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Handle for spawning onto [`SHARED_RUNTIME`]
pub fn io_handle() -> tokio::runtime::Handle {
    SHARED_RUNTIME.handle().clone()
}
