use crate::models::Show;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_PATH_ENV: &str = "SHOWFEED_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub scheduler: SchedulerConfig,

    pub feeds: FeedsConfig,

    pub filters: FilterConfig,

    pub downloads: DownloadConfig,

    pub qbittorrent: QBittorrentConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Watched shows. Removed shows live in the database.
    #[serde(default)]
    pub shows: Vec<Show>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    /// Port for the Prometheus scrape endpoint. No listener when unset.
    pub metrics_port: Option<u16>,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "showfeed".to_string());

        Self {
            metrics_enabled: false,
            metrics_port: None,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Emit logs as JSON lines instead of the human formatter.
    pub log_json: bool,

    #[serde(default)]
    pub suppress_connection_errors: bool,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    pub max_db_connections: u32,

    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/showfeed.db".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            suppress_connection_errors: false,
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,

    pub poll_interval_minutes: u32,

    /// Six-field cron expression; replaces the fixed interval when set.
    pub cron_expression: Option<String>,

    /// When false, a cycle must finish before the next one starts.
    pub allow_overlap: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_minutes: 15,
            cron_expression: None,
            allow_overlap: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedsConfig {
    pub urls: Vec<String>,

    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u32,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            urls: vec![],
            request_timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Required resolution, matched exactly (`1080p`).
    pub resolution: String,

    /// Required source, matched case-insensitively. Empty accepts any.
    pub source: String,

    pub skip_foreign: bool,

    pub skip_packs: bool,

    /// Re-download an episode already on disk when a proper/repack shows up.
    pub allow_proper_repack_redownload: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            resolution: "1080p".to_string(),
            source: String::new(),
            skip_foreign: true,
            skip_packs: true,
            allow_proper_repack_redownload: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LocalFileOrder {
    /// Most recently modified file first.
    #[default]
    Modified,

    /// Highest parsed season/episode first.
    Episode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownloadClientKind {
    /// Fetch the link and store the `.torrent` in the save path.
    #[default]
    TorrentFile,

    /// Hand the link to qBittorrent with the save path.
    Qbittorrent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub save_root: String,

    /// Save each show into `save_root/<show title>`.
    pub sort_into_subdirectories: bool,

    /// Strip trailing periods and spaces from save directories.
    pub strip_trailing_periods: bool,

    pub local_file_order: LocalFileOrder,

    pub client: DownloadClientKind,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            save_root: "./downloads".to_string(),
            sort_into_subdirectories: true,
            strip_trailing_periods: cfg!(windows),
            local_file_order: LocalFileOrder::default(),
            client: DownloadClientKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QBittorrentConfig {
    pub enabled: bool,

    pub url: String,

    pub username: String,

    pub password: String,

    pub category: String,

    /// Poll completed torrents and copy them to show destinations.
    pub watch_completed: bool,

    pub completion_poll_seconds: u64,
}

impl Default for QBittorrentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://localhost:8080".to_string(),
            username: "change-me".to_string(),
            password: "change-me".to_string(),
            category: "tv".to_string(),
            watch_completed: false,
            completion_poll_seconds: crate::constants::intervals::COMPLETION_POLL.as_secs(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            scheduler: SchedulerConfig::default(),
            feeds: FeedsConfig::default(),
            filters: FilterConfig::default(),
            downloads: DownloadConfig::default(),
            qbittorrent: QBittorrentConfig::default(),
            observability: ObservabilityConfig::default(),
            shows: vec![],
        }
    }
}

impl Config {
    /// Loads the first config file found, or defaults.
    ///
    /// Returns the path the config should be saved back to alongside it.
    pub fn load() -> Result<(Self, PathBuf)> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let config = Self::load_from_path(path)?;
                return Ok((config, path.clone()));
            }
        }

        info!("No config file found, using defaults");
        Ok((Self::default(), Self::default_config_path()))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.shows = config.shows.into_iter().map(Show::normalized).collect();

        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        if let Ok(explicit) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(explicit));
        }

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("showfeed").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".showfeed").join("config.toml"));
        }

        paths
    }

    #[must_use]
    pub fn default_config_path() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV).map_or_else(|_| PathBuf::from("config.toml"), PathBuf::from)
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.qbittorrent.enabled && self.qbittorrent.url.is_empty() {
            anyhow::bail!("qBittorrent URL cannot be empty when enabled");
        }

        if self.downloads.client == DownloadClientKind::Qbittorrent && !self.qbittorrent.enabled {
            anyhow::bail!("downloads.client = \"qbittorrent\" requires [qbittorrent] enabled = true");
        }

        if self.scheduler.enabled
            && self.scheduler.poll_interval_minutes == 0
            && self.scheduler.cron_expression.is_none()
        {
            anyhow::bail!("Scheduler interval must be > 0 or cron expression must be set");
        }

        if self.downloads.save_root.trim().is_empty() {
            anyhow::bail!("downloads.save_root cannot be empty");
        }

        let mut seen = HashSet::new();
        for show in &self.shows {
            if show.name.is_empty() {
                anyhow::bail!("Show names cannot be empty");
            }
            if !seen.insert(show.name.as_str()) {
                anyhow::bail!("Show '{}' is listed more than once", show.name);
            }
        }

        Ok(())
    }
}
