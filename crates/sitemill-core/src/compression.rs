//! Compression pipeline: turn a finished raw resource into its final location

use std::io;
use std::path::{Path, PathBuf};

use async_compression::tokio::write::GzipEncoder;
use async_compression::Level;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};

use crate::error::Stage;
use crate::naming::compressed_path;

/// Read buffer for streaming the raw file into the encoder (64KB)
const COPY_BUF_SIZE: usize = 64 * 1024;

/// Session-wide compression mode: every resource or none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip { level: u32 },
}

impl Compression {
    pub fn new(enabled: bool, level: u32) -> Self {
        if enabled {
            Self::Gzip { level }
        } else {
            Self::None
        }
    }

    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Gzip { .. })
    }
}

/// Decide the final location of a flushed resource.
///
/// Uncompressed sessions finalize the raw file as is. Otherwise the raw file
/// is gzipped into its `.gz` sibling and removed; only then is the sibling
/// final. On error the resource stays unfinalized.
pub async fn finalize(raw: PathBuf, mode: Compression) -> Result<PathBuf, (Stage, io::Error)> {
    let Compression::Gzip { level } = mode else {
        return Ok(raw);
    };

    let dest = compressed_path(&raw);
    if let Err(e) = gzip_file(&raw, &dest, level).await {
        if tokio::fs::remove_file(&dest).await.is_ok() {
            log::debug!("Removed partial {}", dest.display());
        }
        return Err((Stage::Compress, e));
    }
    remove_raw(&raw).await?;
    Ok(dest)
}

/// Drop the raw file once its compressed sibling is complete
async fn remove_raw(raw: &Path) -> Result<(), (Stage, io::Error)> {
    tokio::fs::remove_file(raw)
        .await
        .map_err(|e| (Stage::Remove, e))
}

/// Stream `src` through a gzip encoder into `dest`. Returns raw bytes read.
async fn gzip_file(src: &Path, dest: &Path, level: u32) -> io::Result<u64> {
    let input = tokio::fs::File::open(src).await?;
    let mut reader = BufReader::with_capacity(COPY_BUF_SIZE, input);
    let output = tokio::fs::File::create(dest).await?;
    let mut encoder =
        GzipEncoder::with_quality(BufWriter::new(output), Level::Precise(level as i32));

    let n = tokio::io::copy_buf(&mut reader, &mut encoder).await?;
    // writes the gzip trailer and flushes the file
    encoder.shutdown().await?;
    Ok(n)
}
