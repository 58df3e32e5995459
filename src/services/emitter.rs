use crate::clients::qbittorrent::QBitClient;
use crate::models::Release;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("failed to fetch {link}: {source}")]
    Fetch {
        link: String,
        source: reqwest::Error,
    },

    #[error("fetching {link} returned HTTP {status}")]
    Status { link: String, status: StatusCode },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("download client rejected {title}: {message}")]
    Client { title: String, message: String },
}

/// Hands a release over to whatever performs the transfer.
#[async_trait]
pub trait DownloadEmitter: Send + Sync {
    async fn emit(&self, release: &Release) -> Result<(), EmitError>;
}

/// Downloads the `.torrent` behind the link into the release's save path.
#[derive(Clone)]
pub struct TorrentFileEmitter {
    client: Client,
}

impl TorrentFileEmitter {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("showfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl DownloadEmitter for TorrentFileEmitter {
    async fn emit(&self, release: &Release) -> Result<(), EmitError> {
        let link = &release.source_link;
        let fetch_err = |source| EmitError::Fetch {
            link: link.clone(),
            source,
        };

        let response = self.client.get(link).send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(EmitError::Status {
                link: link.clone(),
                status,
            });
        }
        let bytes = response.bytes().await.map_err(fetch_err)?;

        let target = release.target_path();
        let write_err = |source| EmitError::Write {
            path: target.clone(),
            source,
        };
        tokio::fs::create_dir_all(&release.save_path)
            .await
            .map_err(write_err)?;
        tokio::fs::write(&target, &bytes).await.map_err(write_err)?;

        debug!(path = %target.display(), bytes = bytes.len(), "Torrent file written");
        Ok(())
    }
}

/// Adds the release link to qBittorrent with the release's save path.
pub struct QBitEmitter {
    client: Arc<QBitClient>,
    category: Option<String>,
}

impl QBitEmitter {
    #[must_use]
    pub fn new(client: Arc<QBitClient>, category: &str) -> Self {
        Self {
            client,
            category: Some(category.trim().to_string()).filter(|c| !c.is_empty()),
        }
    }
}

#[async_trait]
impl DownloadEmitter for QBitEmitter {
    async fn emit(&self, release: &Release) -> Result<(), EmitError> {
        self.client
            .add_torrent_url(
                &release.source_link,
                &release.save_path,
                self.category.as_deref(),
            )
            .await
            .map_err(|e| EmitError::Client {
                title: release.raw_title.clone(),
                message: e.to_string(),
            })
    }
}
