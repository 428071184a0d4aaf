//! Generate subcommand - stream entries from a file or stdin into sitemaps

use std::cell::Cell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::ProgressBar;

use sitemill_core::progress::{UPDATE_INTERVAL, fmt_num};
use sitemill_core::{Entry, SharedProgress, SitemapStream, StreamError, is_shutdown_requested};

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    /// Entry file, one URL or JSON record per line (default: stdin)
    pub input: Option<PathBuf>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Maximum entries per segment
    #[arg(short = 'l', long)]
    pub limit: Option<u64>,

    /// Absolute URL segment references are resolved against
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// ISO-8601 lastmod for every entry (default: now)
    #[arg(short, long)]
    pub timestamp: Option<String>,

    /// Mark every entry as mobile content
    #[arg(long)]
    pub mobile: bool,

    /// Leave segments and index uncompressed
    #[arg(long)]
    pub no_compress: bool,

    /// Gzip level (0-9)
    #[arg(short, long)]
    pub gzip_level: Option<u32>,

    /// Abort on a malformed line instead of skipping it
    #[arg(long)]
    pub strict: bool,
}

impl GenerateArgs {
    /// Session configuration: CLI flags over file values
    fn session(&self, config: &Config) -> sitemill_core::Config {
        let mut session = config.session();
        if let Some(dir) = &self.output {
            session.output_dir = dir.clone();
        }
        if let Some(limit) = self.limit {
            session.limit = limit;
        }
        if let Some(url) = &self.base_url {
            session.index_base_url = url.clone();
        }
        if let Some(level) = self.gzip_level {
            session.gzip_level = level;
        }
        session.timestamp = self.timestamp.clone();
        session.mobile |= self.mobile;
        session.compress &= !self.no_compress;
        session
    }
}

/// Counts from feeding the input into a session
#[derive(Debug, Default, PartialEq)]
struct FeedStats {
    lines: u64,
    skipped: u64,
    interrupted: bool,
}

pub fn run(args: GenerateArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let session = args.session(config);
    std::fs::create_dir_all(&session.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            session.output_dir.display()
        )
    })?;

    let mut stream = SitemapStream::new(&session)?;
    let segments = Rc::new(Cell::new(0usize));
    let counter = segments.clone();
    stream.on_segment_created(move |path| {
        counter.set(counter.get() + 1);
        log::debug!("Segment written: {}", path.display());
    });

    log::info!("Generating sitemaps");
    log::info!("  Output: {}", session.output_dir.display());
    log::info!("  Limit: {}", fmt_num(session.limit));

    let started = Instant::now();
    let pb = progress.session_line("sitemap");
    let stats = match &args.input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input: {}", path.display()))?;
            feed(&mut stream, BufReader::new(file), args.strict, &pb)?
        }
        None => feed(&mut stream, std::io::stdin().lock(), args.strict, &pb)?,
    };

    stream.finish()?;
    pb.set_message("waiting for finalization");
    let report = stream.wait()?;
    pb.finish_and_clear();

    print_summary(
        "Sitemaps",
        &[
            (
                "Entries",
                format!(
                    "{} from {} lines ({} skipped)",
                    fmt_num(report.injected),
                    fmt_num(stats.lines),
                    stats.skipped
                ),
            ),
            ("Segments", format!("{} written", segments.get())),
            ("Index", report.index.display().to_string()),
            ("Resources", format!("{} finalized", report.finalized)),
            ("Lastmod", report.timestamp.clone()),
            ("Time", format!("{:.1}s", started.elapsed().as_secs_f64())),
        ],
    );

    if stats.interrupted {
        anyhow::bail!(
            "Interrupted: index covers the first {} entries",
            report.injected
        );
    }
    Ok(())
}

/// Inject every entry line of `reader`, pausing whenever the session
/// reports backpressure. Stops early when a shutdown was requested.
fn feed(
    stream: &mut SitemapStream,
    reader: impl BufRead,
    strict: bool,
    pb: &ProgressBar,
) -> Result<FeedStats> {
    let mut stats = FeedStats::default();

    for (n, line) in reader.lines().enumerate() {
        if is_shutdown_requested() {
            log::warn!("Shutdown requested, closing session early");
            stats.interrupted = true;
            break;
        }
        let line = line.context("Failed to read input")?;
        stats.lines += 1;

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let accepted = match inject_line(stream, line) {
            Ok(accepted) => accepted,
            Err(StreamError::Record(e)) if !strict => {
                log::warn!("line {}: {e}, skipped", n + 1);
                stats.skipped += 1;
                continue;
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("line {}", n + 1))),
        };
        if !accepted {
            stream.wait_for_drain()?;
        }

        if stream.injected() % UPDATE_INTERVAL == 0 {
            pb.set_message(format!(
                "{} entries, {} segments",
                fmt_num(stream.injected()),
                stream.segments().len()
            ));
        }
    }
    Ok(stats)
}

fn inject_line(stream: &mut SitemapStream, line: &str) -> Result<bool, StreamError> {
    let entry = Entry::parse_line(line)?;
    stream.inject(entry)
}
