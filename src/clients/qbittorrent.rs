use anyhow::{Context, Result, bail};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct QBitConfig {
    pub base_url: String,

    pub username: String,

    pub password: String,
}

impl From<&crate::config::QBittorrentConfig> for QBitConfig {
    fn from(config: &crate::config::QBittorrentConfig) -> Self {
        Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

/// Torrent states as reported by the Web API. Unlisted states map to `Unknown`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TorrentState {
    Error,
    MissingFiles,
    Uploading,
    #[serde(rename = "pausedUP")]
    PausedUP,
    #[serde(rename = "queuedUP")]
    QueuedUP,
    #[serde(rename = "stalledUP")]
    StalledUP,
    #[serde(rename = "checkingUP")]
    CheckingUP,
    #[serde(rename = "forcedUP")]
    ForcedUP,
    #[serde(rename = "stoppedUP")]
    StoppedUP,
    #[serde(rename = "stoppedDL")]
    StoppedDL,
    Downloading,
    #[serde(rename = "metaDL")]
    MetaDL,
    #[serde(rename = "stalledDL")]
    StalledDL,
    Moving,
    #[serde(other)]
    Unknown,
}

impl TorrentState {
    /// Whether the payload is fully on disk.
    #[must_use]
    pub const fn is_completed(&self) -> bool {
        matches!(
            self,
            Self::Uploading
                | Self::PausedUP
                | Self::QueuedUP
                | Self::StalledUP
                | Self::ForcedUP
                | Self::StoppedUP
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TorrentInfo {
    pub hash: String,

    pub name: String,

    pub state: TorrentState,

    pub save_path: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub content_path: String,
}

#[derive(Debug, Clone)]
pub struct QBitClient {
    client: Client,
    config: QBitConfig,
}

impl QBitClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: QBitConfig) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("showfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v2/{path}", self.config.base_url)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.endpoint(path))
            .header("Referer", &self.config.base_url)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .header("Referer", &self.config.base_url)
    }

    pub async fn login(&self) -> Result<()> {
        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .post("auth/login")
            .form(&params)
            .send()
            .await
            .context("Failed to connect to qBittorrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && body.contains("Ok") {
            debug!("Authenticated with qBittorrent");
            Ok(())
        } else if body.contains("Fails") {
            bail!("qBittorrent authentication failed: invalid credentials")
        } else {
            bail!("qBittorrent authentication failed: status={status}, body={body}")
        }
    }

    async fn ensure_auth(&self) -> Result<()> {
        let response = self.get("app/version").send().await?;

        if response.status() == StatusCode::FORBIDDEN {
            debug!(reason = "session_expired", "Logging in...");
            self.login().await?;
        }

        Ok(())
    }

    pub async fn version(&self) -> Result<String> {
        self.ensure_auth().await?;
        Ok(self.get("app/version").send().await?.text().await?)
    }

    /// Queues a torrent by URL into `save_path`.
    pub async fn add_torrent_url(
        &self,
        url: &str,
        save_path: &Path,
        category: Option<&str>,
    ) -> Result<()> {
        self.ensure_auth().await?;

        let mut form = vec![
            ("urls", url.to_string()),
            ("savepath", save_path.to_string_lossy().into_owned()),
        ];
        if let Some(category) = category.filter(|c| !c.is_empty()) {
            form.push(("category", category.to_string()));
        }

        let response = self
            .post("torrents/add")
            .form(&form)
            .send()
            .await
            .context("Failed to add torrent")?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK && !body.contains("Fails") {
            debug!(save_path = %save_path.display(), "Torrent added");
            Ok(())
        } else if status == StatusCode::UNSUPPORTED_MEDIA_TYPE {
            bail!("Torrent file is not valid")
        } else {
            bail!("Failed to add torrent: status={status}, body={body}")
        }
    }

    /// Torrents in `category`, or all torrents when `None`.
    pub async fn torrents(&self, category: Option<&str>) -> Result<Vec<TorrentInfo>> {
        self.ensure_auth().await?;

        let mut url = Url::parse(&self.endpoint("torrents/info"))?;
        if let Some(category) = category {
            url.query_pairs_mut().append_pair("category", category);
        }

        let text = self
            .client
            .get(url)
            .header("Referer", &self.config.base_url)
            .send()
            .await?
            .text()
            .await?;

        serde_json::from_str(&text).map_err(|e| {
            let truncated: String = text.chars().take(1000).collect();
            debug!(error = %e, response = %truncated, "Failed to parse qBittorrent response");
            anyhow::anyhow!("Failed to parse response: {e}")
        })
    }

    pub async fn create_category(&self, category: &str) -> Result<()> {
        self.ensure_auth().await?;

        let response = self
            .post("torrents/createCategory")
            .form(&[("category", category)])
            .send()
            .await?;

        // 409 means the category already exists.
        if response.status().is_success() || response.status() == StatusCode::CONFLICT {
            info!(category = %category, "qBittorrent category ready");
            Ok(())
        } else {
            bail!("Failed to create category: status={}", response.status())
        }
    }

    pub async fn is_available(&self) -> bool {
        match self.version().await {
            Ok(version) => {
                debug!(version = %version.trim(), "qBittorrent reachable");
                true
            }
            Err(e) => {
                warn!(error = %e, "qBittorrent not available");
                false
            }
        }
    }
}
