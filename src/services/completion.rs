//! Copying finished transfers into their show's destination.

use crate::clients::qbittorrent::QBitClient;
use crate::domain::events::NotificationEvent;
use crate::parser::{MetadataExtractor, normalize_title};
use crate::services::notify::NotificationSink;
use crate::services::watchlist::WatchlistManager;
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// A transfer the download client reports as finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferComplete {
    pub release_name: String,

    /// Directory the content was saved into, or the content path itself.
    pub download_directory: PathBuf,
}

impl TransferComplete {
    /// Path of the downloaded file or directory.
    #[must_use]
    pub fn content_path(&self) -> PathBuf {
        if self
            .download_directory
            .file_name()
            .is_some_and(|name| name == self.release_name.as_str())
        {
            self.download_directory.clone()
        } else {
            self.download_directory.join(&self.release_name)
        }
    }
}

#[derive(Debug, Error)]
pub enum CopyError {
    #[error("completed content not found at {0}")]
    Missing(PathBuf),

    #[error("failed to copy {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to walk {0}")]
    Walk(#[from] walkdir::Error),

    #[error("copy interrupted: {0}")]
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOutcome {
    pub show: String,
    pub destination: PathBuf,
    pub files: usize,
}

/// Yields transfers that finished since the previous poll.
#[async_trait]
pub trait CompletionHookSource: Send + Sync {
    async fn poll_completed(&self) -> anyhow::Result<Vec<TransferComplete>>;
}

pub struct CompletionService {
    extractor: Arc<dyn MetadataExtractor>,
    watchlist: Arc<WatchlistManager>,
    notifier: Arc<dyn NotificationSink>,
}

impl CompletionService {
    #[must_use]
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        watchlist: Arc<WatchlistManager>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            extractor,
            watchlist,
            notifier,
        }
    }

    /// Copies a finished transfer to its show's destination.
    ///
    /// Returns `Ok(None)` when the release belongs to no watched show or the
    /// show has no copy destination.
    ///
    /// # Errors
    /// Fails when the content is missing or the copy fails. Nothing is retried.
    pub async fn on_transfer_complete(
        &self,
        transfer: &TransferComplete,
    ) -> Result<Option<CopyOutcome>, CopyError> {
        let Some(parsed) = self.extractor.parse(&transfer.release_name) else {
            debug!(release = %transfer.release_name, "Completed transfer has no usable title");
            return Ok(None);
        };

        let Some(show) = self.watchlist.find_watched(&normalize_title(&parsed.title)).await else {
            debug!(release = %transfer.release_name, "Completed transfer matches no watched show");
            return Ok(None);
        };

        let Some(destination) = show.copy_destination.clone() else {
            debug!(show = %show.name, "Show has no copy destination");
            return Ok(None);
        };

        let source = transfer.content_path();
        let target_dir = destination.clone();
        let result = tokio::task::spawn_blocking(move || copy_content(&source, &target_dir))
            .await
            .map_err(|e| CopyError::Interrupted(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(files) => {
                info!(
                    event = "transfer_copied",
                    show = %show.name,
                    release = %transfer.release_name,
                    destination = %destination.display(),
                    files,
                    "Copied completed transfer"
                );
                self.notifier.notify(NotificationEvent::TransferCopied {
                    show: show.name.clone(),
                    release: transfer.release_name.clone(),
                    destination: destination.display().to_string(),
                });
                Ok(Some(CopyOutcome {
                    show: show.name,
                    destination,
                    files,
                }))
            }
            Err(e) => {
                warn!(event = "transfer_copy_failed", release = %transfer.release_name, error = %e, "Copy failed");
                self.notifier.notify(NotificationEvent::TransferCopyFailed {
                    release: transfer.release_name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Polls `source` until the task is dropped.
    pub async fn watch(&self, source: &dyn CompletionHookSource, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match source.poll_completed().await {
                Ok(transfers) => {
                    for transfer in transfers {
                        // Errors are logged inside; a failed copy is not retried.
                        let _ = self.on_transfer_complete(&transfer).await;
                    }
                }
                Err(e) => warn!(event = "completion_poll_failed", error = %e, "Failed to poll completed transfers"),
            }
        }
    }
}

/// Copies a file or a directory tree into `destination`, keeping its name.
fn copy_content(source: &Path, destination: &Path) -> Result<usize, CopyError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| CopyError::Io { path, source }
    };

    if !source.exists() {
        return Err(CopyError::Missing(source.to_path_buf()));
    }
    let Some(name) = source.file_name() else {
        return Err(CopyError::Missing(source.to_path_buf()));
    };

    std::fs::create_dir_all(destination).map_err(io_err(destination))?;

    if source.is_file() {
        let target = destination.join(name);
        std::fs::copy(source, &target).map_err(io_err(&target))?;
        return Ok(1);
    }

    let root = destination.join(name);
    let mut files = 0;
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let target = root.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io_err(&target))?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            std::fs::copy(entry.path(), &target).map_err(io_err(&target))?;
            files += 1;
        }
    }

    Ok(files)
}

/// Reports torrents in a qBittorrent category as they reach a seeding state.
///
/// Torrents already complete on the first poll are remembered, not reported.
pub struct QBitCompletionSource {
    client: Arc<QBitClient>,
    category: Option<String>,
    seen: Mutex<Option<HashSet<String>>>,
}

impl QBitCompletionSource {
    #[must_use]
    pub fn new(client: Arc<QBitClient>, category: &str) -> Self {
        Self {
            client,
            category: Some(category.trim().to_string()).filter(|c| !c.is_empty()),
            seen: Mutex::new(None),
        }
    }
}

#[async_trait]
impl CompletionHookSource for QBitCompletionSource {
    async fn poll_completed(&self) -> anyhow::Result<Vec<TransferComplete>> {
        let torrents = self.client.torrents(self.category.as_deref()).await?;
        let mut seen = self.seen.lock().await;

        let completed = torrents.into_iter().filter(|t| t.state.is_completed());

        if seen.is_none() {
            *seen = Some(completed.map(|t| t.hash).collect());
            return Ok(Vec::new());
        }
        let known = seen.get_or_insert_with(HashSet::new);

        Ok(completed
            .filter(|t| known.insert(t.hash.clone()))
            .map(|t| TransferComplete {
                release_name: t.name,
                download_directory: PathBuf::from(t.save_path),
            })
            .collect())
    }
}
