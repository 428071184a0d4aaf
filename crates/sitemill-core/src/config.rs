//! Session configuration and validation

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Deserialize;

/// Entries per segment when none is configured (sitemaps.org maximum)
pub const DEFAULT_LIMIT: u64 = 50_000;

/// Unflushed sink volume (bytes) above which `inject` reports backpressure
pub const DEFAULT_HIGH_WATER_MARK: usize = 16 * 1024;

/// Gzip level used when compressing finished resources
pub const DEFAULT_GZIP_LEVEL: u32 = 6;

/// User-facing session configuration. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Absolute URL the index resolves segment references against
    pub index_base_url: String,
    /// ISO-8601 stamp written on every entry and index reference
    pub timestamp: Option<String>,
    /// Maximum entries per segment
    pub limit: u64,
    /// Declare the mobile namespace and mark every entry as mobile
    pub mobile: bool,
    /// Directory segments and the index are written into
    pub output_dir: PathBuf,
    /// Gzip every finished resource
    pub compress: bool,
    /// Advisory backpressure threshold in bytes
    pub high_water_mark: usize,
    /// Gzip level (0-9)
    pub gzip_level: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_base_url: String::new(),
            timestamp: None,
            limit: DEFAULT_LIMIT,
            mobile: false,
            output_dir: PathBuf::from("./"),
            compress: true,
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
            gzip_level: DEFAULT_GZIP_LEVEL,
        }
    }
}

/// Rejected configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroLimit,
    InvalidBaseUrl { url: String, reason: String },
    InvalidTimestamp(String),
    GzipLevel(u32),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroLimit => write!(f, "limit must be at least 1"),
            Self::InvalidBaseUrl { url, reason } => {
                write!(f, "invalid index base URL {url:?}: {reason}")
            }
            Self::InvalidTimestamp(ts) => write!(f, "timestamp {ts:?} is not ISO-8601"),
            Self::GzipLevel(level) => write!(f, "gzip level {level} is outside 0-9"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Validated, per-session view of a [`Config`]
#[derive(Debug, Clone)]
pub struct Settings {
    pub index_base_url: String,
    pub timestamp: String,
    /// Whether `timestamp` came from the config (kept across sessions)
    pub timestamp_pinned: bool,
    pub limit: u64,
    pub mobile: bool,
    pub output_dir: PathBuf,
    pub compress: bool,
    pub high_water_mark: usize,
    pub gzip_level: u32,
}

impl Config {
    /// Check every field and resolve defaults that depend on the clock
    pub fn validate(&self) -> Result<Settings, ConfigError> {
        if self.limit < 1 {
            return Err(ConfigError::ZeroLimit);
        }
        if self.gzip_level > 9 {
            return Err(ConfigError::GzipLevel(self.gzip_level));
        }
        if !self.index_base_url.is_empty() {
            check_base_url(&self.index_base_url)?;
        }

        let (timestamp, timestamp_pinned) = match &self.timestamp {
            Some(ts) if is_iso8601(ts) => (ts.clone(), true),
            Some(ts) => return Err(ConfigError::InvalidTimestamp(ts.clone())),
            None => (now_timestamp(), false),
        };

        Ok(Settings {
            index_base_url: self.index_base_url.clone(),
            timestamp,
            timestamp_pinned,
            limit: self.limit,
            mobile: self.mobile,
            output_dir: self.output_dir.clone(),
            compress: self.compress,
            high_water_mark: self.high_water_mark,
            gzip_level: self.gzip_level,
        })
    }
}

impl Settings {
    /// Take a fresh clock reading unless the timestamp was configured
    pub fn restamp(&mut self) {
        if !self.timestamp_pinned {
            self.timestamp = now_timestamp();
        }
    }
}

/// Current UTC time, millisecond precision, `Z` suffix
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn is_iso8601(s: &str) -> bool {
    DateTime::parse_from_rfc3339(s).is_ok() || NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn check_base_url(raw: &str) -> Result<(), ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };
    let parsed = url::Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
    }
    if parsed.cannot_be_a_base() || parsed.host().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(())
}
