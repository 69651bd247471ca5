//! Configuration loading for judgesync.
//!
//! Configuration is loaded from a TOML file (default: `judgesync.toml`).

use judge_core::{Backoff, RetryPolicy};
use judge_engine::{FetcherSettings, ScraperOptions};
use judge_store::StatsWindow;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration for judgesync.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Retry tuning shared by every source.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Platforms to sync.
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Statistics export.
    #[serde(default)]
    pub stats: StatsConfig,
}

/// Retry tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Consecutive shape errors tolerated during a backlog crawl (default: 10).
    #[serde(default = "default_max_shape_failures")]
    pub max_shape_failures: u32,
    /// Store failures tolerated per page during catch-up (default: 3).
    #[serde(default = "default_max_store_retries")]
    pub max_store_retries: u32,
    /// Backlog pages without progress before the crawl fails, 0 retries
    /// until shutdown (default: 0).
    #[serde(default = "default_max_stalled_pages")]
    pub max_stalled_pages: u32,
    /// First retry delay in milliseconds (default: 500).
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Retry delay cap in milliseconds (default: 30000).
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// Random extra delay in milliseconds (default: 500).
    #[serde(default = "default_backoff_jitter_ms")]
    pub backoff_jitter_ms: u64,
}

/// Platform implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `csacademy.com` evaluation jobs.
    CsAcademy,
}

/// One platform.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Platform name, used in logs and statistics.
    pub name: String,
    /// Which fetcher to use.
    pub kind: SourceKind,
    /// Path to the platform's SQLite database.
    pub database: PathBuf,
    /// Scheme and host of the platform.
    pub base_url: String,
    /// Submissions per page (default: 100).
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// HTTP request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User-Agent header (default: `judgesync/<version>`).
    pub user_agent: Option<String>,
    /// Skip this source when false (default: true).
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// Statistics export.
#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    /// Daily buckets (default: 180).
    #[serde(default = "default_days")]
    pub days: u32,
    /// Calendar month buckets (default: 12).
    #[serde(default = "default_months")]
    pub months: u32,
    /// Days per rolling bucket (default: 30).
    #[serde(default = "default_rolling_interval_days")]
    pub rolling_interval_days: u32,
    /// Rolling buckets (default: 6).
    #[serde(default = "default_rolling_months")]
    pub rolling_months: u32,
    /// JSON output file (default: stats.json).
    #[serde(default = "default_stats_output")]
    pub output: PathBuf,
}

// Default value functions
fn default_max_shape_failures() -> u32 {
    10
}

fn default_max_store_retries() -> u32 {
    3
}

fn default_max_stalled_pages() -> u32 {
    0
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    30_000
}

fn default_backoff_jitter_ms() -> u64 {
    500
}

fn default_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_enabled() -> bool {
    true
}

fn default_days() -> u32 {
    180
}

fn default_months() -> u32 {
    12
}

fn default_rolling_interval_days() -> u32 {
    30
}

fn default_rolling_months() -> u32 {
    6
}

fn default_stats_output() -> PathBuf {
    PathBuf::from("stats.json")
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_shape_failures: default_max_shape_failures(),
            max_store_retries: default_max_store_retries(),
            max_stalled_pages: default_max_stalled_pages(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            backoff_jitter_ms: default_backoff_jitter_ms(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
            months: default_months(),
            rolling_interval_days: default_rolling_interval_days(),
            rolling_months: default_rolling_months(),
            output: default_stats_output(),
        }
    }
}

impl EngineConfig {
    /// Scraper tuning described by this section.
    pub fn scraper_options(&self) -> ScraperOptions {
        ScraperOptions {
            policy: RetryPolicy {
                max_shape_failures: self.max_shape_failures,
                max_store_retries: self.max_store_retries,
                max_stalled_pages: self.max_stalled_pages,
            },
            backoff: Backoff {
                base: Duration::from_millis(self.backoff_base_ms),
                max: Duration::from_millis(self.backoff_max_ms),
                jitter: Duration::from_millis(self.backoff_jitter_ms),
            },
        }
    }
}

impl SourceConfig {
    /// Fetcher settings described by this source.
    pub fn fetcher_settings(&self) -> FetcherSettings {
        let mut settings = FetcherSettings::new(self.base_url.as_str());
        settings.page_size = self.page_size;
        settings.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(agent) = &self.user_agent {
            settings.user_agent = agent.clone();
        }
        settings
    }
}

impl StatsConfig {
    /// Bucket counts described by this section.
    pub fn window(&self) -> StatsWindow {
        StatsWindow {
            days: self.days,
            months: self.months,
            rolling_interval_days: self.rolling_interval_days,
            rolling_months: self.rolling_months,
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Check constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        let mut databases = HashSet::new();
        for source in &self.sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source name must not be empty".into()));
            }
            if !names.insert(source.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate source name {:?}",
                    source.name
                )));
            }
            if !databases.insert(source.database.as_path()) {
                return Err(ConfigError::Invalid(format!(
                    "source {:?}: database {} is used by another source",
                    source.name,
                    source.database.display()
                )));
            }
            if source.page_size == 0 {
                return Err(ConfigError::Invalid(format!(
                    "source {:?}: page_size must be positive",
                    source.name
                )));
            }
        }
        if self.stats.rolling_interval_days == 0 {
            return Err(ConfigError::Invalid(
                "stats.rolling_interval_days must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Enabled sources, narrowed to `only` when given.
    pub fn selected_sources<'a>(
        &'a self,
        only: &[String],
    ) -> Result<Vec<&'a SourceConfig>, ConfigError> {
        if let Some(unknown) = only
            .iter()
            .find(|name| !self.sources.iter().any(|s| &s.name == *name))
        {
            return Err(ConfigError::Invalid(format!("unknown source {unknown:?}")));
        }

        Ok(self
            .sources
            .iter()
            .filter(|s| s.enabled)
            .filter(|s| only.is_empty() || only.contains(&s.name))
            .collect())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// The file parsed but describes an unusable setup.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
[engine]
max_shape_failures = 5
backoff_base_ms = 100

[[sources]]
name = "CSAcademy"
kind = "csacademy"
database = "/data/csacademy.db"
base_url = "https://csacademy.com/"
page_size = 50

[[sources]]
name = "Mirror"
kind = "csacademy"
database = "mirror.db"
base_url = "http://localhost:8000"
enabled = false

[stats]
days = 30
output = "/srv/stats.json"
"#;

    #[test]
    fn config_from_toml_string() {
        let config: Config = toml::from_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.engine.max_shape_failures, 5);
        assert_eq!(config.engine.max_store_retries, 3);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, SourceKind::CsAcademy);
        assert_eq!(config.sources[0].page_size, 50);
        assert_eq!(config.sources[0].database, PathBuf::from("/data/csacademy.db"));
        assert!(!config.sources[1].enabled);
        assert_eq!(config.stats.days, 30);
        assert_eq!(config.stats.months, 12);
        assert_eq!(config.stats.output, PathBuf::from("/srv/stats.json"));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.sources.is_empty());
        assert_eq!(config.engine.backoff_max_ms, 30_000);
        assert_eq!(config.stats.window(), StatsWindow::default());
    }

    #[test]
    fn engine_section_maps_to_scraper_options() {
        let options = EngineConfig::default().scraper_options();
        assert_eq!(options, ScraperOptions::default());
    }

    #[test]
    fn source_maps_to_fetcher_settings() {
        let config: Config = toml::from_str(FULL).unwrap();
        let settings = config.sources[0].fetcher_settings();

        assert_eq!(settings.base_url, "https://csacademy.com");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert!(settings.user_agent.starts_with("judgesync/"));
    }

    #[test]
    fn selected_sources_skip_disabled() {
        let config: Config = toml::from_str(FULL).unwrap();

        let all = config.selected_sources(&[]).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "CSAcademy");

        let none = config.selected_sources(&["Mirror".to_string()]).unwrap();
        assert!(none.is_empty());

        assert!(config.selected_sources(&["Kattis".to_string()]).is_err());
    }

    #[test]
    fn duplicate_source_names_rejected() {
        let toml = r#"
[[sources]]
name = "CSAcademy"
kind = "csacademy"
database = "a.db"
base_url = "https://csacademy.com"

[[sources]]
name = "CSAcademy"
kind = "csacademy"
database = "b.db"
base_url = "https://csacademy.com"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn duplicate_database_paths_rejected() {
        let toml = r#"
[[sources]]
name = "CSAcademy"
kind = "csacademy"
database = "data/shared.db"
base_url = "https://csacademy.com"

[[sources]]
name = "CSAcademy mirror"
kind = "csacademy"
database = "data/shared.db"
base_url = "https://mirror.csacademy.com"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        match config.validate() {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("data/shared.db")),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[sources]]\nname = \"X\"\nkind = \"codeforces\"\ndatabase = \"x.db\"\nbase_url = \"http://x\""
        )
        .unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.sources.len(), 2);
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
