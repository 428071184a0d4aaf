//! Logging setup: env_logger behind an indicatif-aware bridge

use indicatif::MultiProgress;

const RESET: &str = "\x1b[0m";

/// (ANSI color, padded label, reset) for a log level; empty codes without color
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let (label, ansi) = match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    };
    if color {
        (ansi, label, RESET)
    } else {
        ("", label, "")
    }
}

/// Log bridge that suspends the progress display while a line is printed.
pub struct ProgressLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        let (pre, label, post) = level_style(record.level(), true);
        let line = format!("[{pre}{label}{post}] {}", record.args());
        self.multi.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Default filter for the given verbosity flags (`RUST_LOG` still wins)
pub fn default_level(quiet: bool, debug: bool) -> &'static str {
    if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}

/// Initialize logging. With a `MultiProgress` (TTY) lines are colored and
/// routed around the spinner; otherwise plain `[LEVEL] msg` lines.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    use std::io::Write;

    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));

    let Some(multi) = multi else {
        env_logger::Builder::from_env(env)
            .format(|buf, record| {
                let (_, label, _) = level_style(record.level(), false);
                writeln!(buf, "[{label}] {}", record.args())
            })
            .init();
        return;
    };

    let logger = env_logger::Builder::from_env(env).build();
    let max_level = logger.filter();
    if log::set_boxed_logger(Box::new(ProgressLogger::new(logger, multi.clone()))).is_ok() {
        log::set_max_level(max_level);
    }
}
