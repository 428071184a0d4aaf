//! Configuration loading from TOML files

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for sitemill
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub sitemap: SitemapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub compress: bool,
    pub gzip_level: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./"),
            compress: true,
            gzip_level: sitemill_core::config::DEFAULT_GZIP_LEVEL,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    #[serde(deserialize_with = "deserialize_env_var")]
    pub base_url: Option<String>,
    pub limit: u64,
    pub mobile: bool,
    pub high_water_mark: usize,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            limit: sitemill_core::config::DEFAULT_LIMIT,
            mobile: false,
            high_water_mark: sitemill_core::config::DEFAULT_HIGH_WATER_MARK,
        }
    }
}

/// Deserialize a string that may be an environment variable reference like ${VAR}
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| expand_env_var(&s)))
}

/// Expand ${VAR} to the variable's value; literals pass through
fn expand_env_var(s: &str) -> Option<String> {
    match s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) {
        Some(var_name) => std::env::var(var_name).ok(),
        None => Some(s.to_string()),
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./sitemill.toml (current directory)
    /// 2. ~/.config/sitemill/config.toml
    ///
    /// If no config file is found, returns the defaults.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("sitemill.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "sitemill") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Session configuration from file values alone
    pub fn session(&self) -> sitemill_core::Config {
        sitemill_core::Config {
            index_base_url: self.sitemap.base_url.clone().unwrap_or_default(),
            timestamp: None,
            limit: self.sitemap.limit,
            mobile: self.sitemap.mobile,
            output_dir: self.output.dir.clone(),
            compress: self.output.compress,
            high_water_mark: self.sitemap.high_water_mark,
            gzip_level: self.output.gzip_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.dir, PathBuf::from("./"));
        assert!(config.output.compress);
        assert_eq!(config.sitemap.limit, 50_000);
        assert!(config.sitemap.base_url.is_none());
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("SITEMILL_TEST_BASE", "https://example.org");
        assert_eq!(
            expand_env_var("${SITEMILL_TEST_BASE}"),
            Some("https://example.org".to_string())
        );
        std::env::remove_var("SITEMILL_TEST_BASE");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
dir = "/srv/www/maps"
compress = false

[sitemap]
base_url = "https://www.example.com/maps/"
limit = 1000
mobile = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.dir, PathBuf::from("/srv/www/maps"));
        assert!(!config.output.compress);
        assert_eq!(config.output.gzip_level, 6);
        assert_eq!(config.sitemap.limit, 1000);

        let session = config.session();
        assert_eq!(session.index_base_url, "https://www.example.com/maps/");
        assert!(session.mobile);
        assert!(session.validate().is_ok());
    }

    #[test]
    fn from_file_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sitemill.toml");
        std::fs::write(&path, "[sitemap]\nlimit = \"many\"\n").unwrap();

        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err}").contains("sitemill.toml"));
    }
}
